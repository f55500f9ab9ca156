//! HTTP handlers for the analysis API.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::ledger::DebtLedger;
use crate::config::{Config, LimitsConfig, ServerConfig};
use crate::core::{supported_extensions, Error, Language};
use crate::pipeline::{AnalysisResult, Engine};

const SUCCESS_MESSAGE: &str = "Analysis completed successfully";

/// Storage folder for uploads made without a project.
pub const DEFAULT_PROJECT: &str = "default";

/// Shared application state for handlers.
pub struct AppState {
    /// Analysis engine, shared with blocking workers.
    pub engine: Arc<Engine>,
    /// Per-project debt history.
    pub ledger: DebtLedger,
    /// Server settings (storage directory, upload limit).
    pub server: ServerConfig,
    /// Request budgets.
    pub limits: LimitsConfig,
}

impl AppState {
    pub fn new(engine: Engine, config: &Config) -> Self {
        Self {
            engine: Arc::new(engine),
            ledger: DebtLedger::new(config.debt.levels.clone(), config.debt.ledger_max_entries),
            server: config.server.clone(),
            limits: config.limits.clone(),
        }
    }

    fn io_budget(&self) -> Duration {
        Duration::from_millis(self.limits.io_timeout_ms)
    }
}

/// Body of every successful request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
    /// Where an upload was stored, relative to the storage directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, message: &str) -> Self {
        Self {
            success: true,
            data,
            message: message.to_string(),
            file_path: None,
        }
    }

    fn stored_at(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }
}

/// Project the analysis is recorded under.
#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub project_id: Option<String>,
}

/// Request payload for content analysis.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnalyzeContentRequest {
    /// Source text to analyze.
    pub content: Option<String>,
    /// Path of a stored file, relative to the storage directory.
    pub file_path: Option<String>,
    pub project_id: Option<String>,
    /// Name used for language detection when `content` is given.
    pub filename: Option<String>,
}

/// Response payload for the health check.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Response payload for supported extensions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtensionsResponse {
    pub supported_extensions: Vec<String>,
    pub languages: BTreeMap<String, String>,
}

/// Resolve `relative` inside `root`, refusing anything that could escape it.
pub fn resolve_stored(root: &Path, relative: &str) -> Result<PathBuf, Error> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty() {
        return Err(Error::InvalidArgument("empty file path".to_string()));
    }
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(Error::InvalidArgument(format!(
            "file path must stay inside the storage directory: {}",
            relative.display()
        )));
    }
    Ok(root.join(relative))
}

/// Reduce an upload name to its final component.
fn upload_name(raw: &str) -> Result<String, Error> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidArgument(format!("invalid file name: {raw:?}")));
    }
    Ok(name.to_string())
}

/// Storage folder for a project: one path component of `[A-Za-z0-9._-]`.
pub fn project_dir(project_id: Option<&str>) -> Result<&str, Error> {
    let id = match project_id.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_PROJECT),
        Some(id) => id,
    };
    let valid = id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(Error::InvalidArgument(format!("invalid project id: {id:?}")));
    }
    Ok(id)
}

/// Run an analysis on the blocking pool under the analysis budget.
async fn run_analysis(
    state: &AppState,
    path: Option<PathBuf>,
    content: String,
) -> Result<AnalysisResult, ApiError> {
    let engine = Arc::clone(&state.engine);
    let budget = Duration::from_millis(state.limits.analysis_timeout_ms);
    let task = tokio::task::spawn_blocking(move || engine.analyze(path.as_deref(), &content));

    match tokio::time::timeout(budget, task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(err)) => Err(Error::internal(format!("analysis task failed: {err}")).into()),
        Err(_) => {
            tracing::warn!("Analysis exceeded {}ms budget", budget.as_millis());
            Err(Error::timeout("analysis", budget).into())
        }
    }
}

/// Read a stored file under the I/O budget.
async fn read_stored(state: &AppState, path: &Path) -> Result<String, ApiError> {
    let budget = state.io_budget();
    let bytes = match tokio::time::timeout(budget, tokio::fs::read(path)).await {
        Err(_) => return Err(Error::timeout("file read", budget).into()),
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            }
            .into())
        }
        Ok(Err(err)) => return Err(Error::Io(err).into()),
        Ok(Ok(bytes)) => bytes,
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn analyze_stored(
    state: &AppState,
    relative: &str,
) -> Result<(String, AnalysisResult), ApiError> {
    let path = resolve_stored(&state.server.storage_dir, relative)?;
    let content = read_stored(state, &path).await?;
    let result = run_analysis(state, Some(path), content).await?;
    Ok((relative.to_string(), result))
}

fn record(state: &AppState, project_id: Option<&str>, file: &str, result: &AnalysisResult) {
    if let Some(project_id) = project_id.filter(|id| !id.is_empty()) {
        state.ledger.record(project_id, file, result);
    }
}

#[post("/api/analyze/file")]
/// Analyze an uploaded file (multipart field `file`).
pub async fn analyze_file(
    state: web::Data<AppState>,
    query: web::Query<ProjectQuery>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let max = state.server.max_upload_bytes;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| Error::InvalidArgument(e.to_string()))?;
        let Some(disposition) = field.content_disposition() else {
            continue;
        };
        if disposition.get_name() != Some("file") {
            continue;
        }
        let name = upload_name(disposition.get_filename().unwrap_or_default())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| Error::InvalidArgument(e.to_string()))?;
            if bytes.len() + chunk.len() > max {
                return Err(Error::PayloadTooLarge {
                    size: bytes.len() + chunk.len(),
                    max,
                }
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some((name, bytes));
        break;
    }

    let Some((name, bytes)) = upload else {
        return Err(Error::InvalidArgument("multipart field 'file' is required".to_string()).into());
    };
    if Language::detect(Path::new(&name)).is_none() {
        return Err(Error::unsupported(name).into());
    }
    let project = project_dir(query.project_id.as_deref())?;
    let stored = format!("{project}/{name}");
    tracing::info!("Received upload {} ({} bytes)", stored, bytes.len());

    let path = resolve_stored(&state.server.storage_dir, &stored)?;
    let budget = state.io_budget();
    let write = async {
        tokio::fs::create_dir_all(state.server.storage_dir.join(project)).await?;
        tokio::fs::write(&path, &bytes).await
    };
    match tokio::time::timeout(budget, write).await {
        Err(_) => return Err(Error::timeout("file write", budget).into()),
        Ok(Err(err)) => return Err(Error::Io(err).into()),
        Ok(Ok(())) => {}
    }

    let content = String::from_utf8_lossy(&bytes).into_owned();
    let result = run_analysis(&state, Some(PathBuf::from(&name)), content).await?;
    record(&state, query.project_id.as_deref(), &name, &result);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(result, SUCCESS_MESSAGE).stored_at(stored)))
}

#[post("/api/analyze/content")]
/// Analyze content sent in the request body, or a stored file by path.
pub async fn analyze_content(
    state: web::Data<AppState>,
    query: web::Query<ProjectQuery>,
    payload: web::Json<AnalyzeContentRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let project_id = request.project_id.as_deref().or(query.project_id.as_deref());

    let (file, result) = match (request.content, request.file_path.as_deref()) {
        (Some(content), _) => {
            let name = request.filename.as_deref().map(upload_name).transpose()?;
            let result = run_analysis(&state, name.as_ref().map(PathBuf::from), content).await?;
            (name.unwrap_or_else(|| "<content>".to_string()), result)
        }
        (None, Some(file_path)) => analyze_stored(&state, file_path).await?,
        (None, None) => {
            return Err(Error::InvalidArgument(
                "either content or file_path must be provided".to_string(),
            )
            .into())
        }
    };

    record(&state, project_id, &file, &result);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(result, SUCCESS_MESSAGE)))
}

#[get("/api/analyze/{file_path:.*}")]
/// Analyze a previously stored file.
pub async fn analyze_path(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ProjectQuery>,
) -> Result<HttpResponse, ApiError> {
    let relative = path.into_inner();
    let (file, result) = analyze_stored(&state, &relative).await?;
    record(&state, query.project_id.as_deref(), &file, &result);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(result, SUCCESS_MESSAGE)))
}

#[get("/api/supported-extensions")]
/// List supported file extensions.
pub async fn extensions() -> HttpResponse {
    let pairs = supported_extensions();
    HttpResponse::Ok().json(ExtensionsResponse {
        supported_extensions: pairs.iter().map(|(ext, _)| ext.clone()).collect(),
        languages: pairs
            .into_iter()
            .map(|(ext, name)| (ext, name.to_string()))
            .collect(),
    })
}

#[get("/api/health")]
/// Liveness probe.
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "DevEase API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[get("/api/analysis/technical-debt")]
/// Aggregated technical debt for a project, or for every project.
pub async fn technical_debt(
    state: web::Data<AppState>,
    query: web::Query<ProjectQuery>,
) -> HttpResponse {
    let summary = state.ledger.summary(query.project_id.as_deref());
    HttpResponse::Ok().json(ApiResponse::ok(summary, "Technical debt summary"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_stored_rejects_traversal() {
        let root = Path::new("/srv/files");
        assert_eq!(
            resolve_stored(root, "src/app.py").unwrap(),
            PathBuf::from("/srv/files/src/app.py")
        );
        assert!(resolve_stored(root, "../etc/passwd").is_err());
        assert!(resolve_stored(root, "src/../../x.py").is_err());
        assert!(resolve_stored(root, "/etc/passwd").is_err());
        assert!(resolve_stored(root, "").is_err());
    }

    #[test]
    fn test_upload_name() {
        assert_eq!(upload_name("app.py").unwrap(), "app.py");
        assert_eq!(upload_name("../../evil.py").unwrap(), "evil.py");
        assert_eq!(upload_name("C:\\tmp\\x.java").unwrap(), "x.java");
        assert!(upload_name("..").is_err());
        assert!(upload_name("dir/").is_err());
    }

    #[test]
    fn test_project_dir() {
        assert_eq!(project_dir(None).unwrap(), DEFAULT_PROJECT);
        assert_eq!(project_dir(Some("")).unwrap(), DEFAULT_PROJECT);
        assert_eq!(project_dir(Some("shop-2")).unwrap(), "shop-2");
        assert!(project_dir(Some("..")).is_err());
        assert!(project_dir(Some("a/b")).is_err());
        assert!(project_dir(Some("a\\b")).is_err());
    }
}
