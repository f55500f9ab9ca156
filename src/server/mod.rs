//! HTTP API consumed by the dashboard frontend.

pub mod error;
pub mod ledger;
pub mod routes;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};

use crate::config::{Config, ServerConfig};
use crate::pipeline::Engine;

pub use error::{ApiError, ErrorBody};
pub use ledger::{DebtLedger, DebtSummary, LedgerEntry};
pub use routes::{AnalyzeContentRequest, ApiResponse, AppState};

/// Register every route and the JSON error handler.
///
/// Fixed routes come before the catch-all path route.
pub fn configure(max_body: usize) -> impl Fn(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(
            web::JsonConfig::default()
                .limit(max_body)
                .error_handler(error::json_error_handler),
        )
        .service(routes::health)
        .service(routes::extensions)
        .service(routes::technical_debt)
        .service(routes::analyze_file)
        .service(routes::analyze_content)
        .service(routes::analyze_path);
    }
}

fn cors(config: &ServerConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(3600);
    for origin in &config.cors_origins {
        cors = if origin == "*" {
            cors.allow_any_origin()
        } else {
            cors.allowed_origin(origin)
        };
    }
    cors
}

/// Serve the API until the process is stopped.
///
/// The engine (and any configured model) is built before the runtime starts.
pub fn run(config: Config) -> std::io::Result<()> {
    let engine = Engine::from_config(&config);
    let state = web::Data::new(AppState::new(engine, &config));
    let server = config.server.clone();
    let bind = (server.host.clone(), server.port);

    tracing::info!(
        "Starting DevEase API on {}:{} (storage: {})",
        bind.0,
        bind.1,
        server.storage_dir.display()
    );

    actix_web::rt::System::new().block_on(async move {
        let max_body = server.max_upload_bytes;
        let workers = server.workers;
        let mut http = HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .wrap(cors(&server))
                .app_data(state.clone())
                .configure(configure(max_body))
        });
        if let Some(workers) = workers {
            http = http.workers(workers);
        }
        http.bind(bind)?.run().await
    })
}
