//! DevEase CLI - code quality, smells and technical debt analysis.

use std::io::{stdout, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use devease::cli::{analyze_directory, AnalyzeArgs, Cli, Command, ServeArgs};
use devease::config::Config;
use devease::core::{supported_extensions, FileSet, ProgressTracker};
use devease::output::Format;
use devease::pipeline::Engine;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("devease=debug,actix_web=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load_default(".").context("loading configuration")?,
    };

    if cli.no_color || !config.output.color {
        colored::control::set_override(false);
    }
    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("configuring worker pool")?;
    }

    let format = cli
        .format
        .map(Format::from)
        .unwrap_or_else(|| config.output.format.into());

    match cli.command {
        Command::Analyze(args) => analyze(&args, &config, format),
        Command::Serve(args) => serve(args, config),
        Command::Config(args) => {
            let text = if args.default {
                Config::default_toml().to_string()
            } else {
                config.to_toml()?
            };
            let mut out = stdout();
            out.write_all(text.as_bytes())?;
            Ok(())
        }
        Command::Languages => {
            #[derive(Serialize)]
            struct Row {
                extension: String,
                language: &'static str,
            }
            let rows: Vec<Row> = supported_extensions()
                .into_iter()
                .map(|(extension, language)| Row {
                    extension,
                    language,
                })
                .collect();
            format.format(&rows, &mut stdout())?;
            Ok(())
        }
    }
}

fn analyze(args: &AnalyzeArgs, config: &Config, format: Format) -> anyhow::Result<()> {
    let engine = Engine::from_config(config);
    let path = args.path.as_path();

    if path.is_dir() {
        let mut exclude = config.exclude_patterns.clone();
        exclude.extend(args.exclude.iter().cloned());
        let files = FileSet::from_path(path, &exclude)
            .with_context(|| format!("collecting files under {}", path.display()))?;
        let progress = ProgressTracker::new(files.len(), "Analyzing");
        let report = analyze_directory(&engine, &files, &progress);
        progress.finish_and_clear();
        format.write_directory(&report, &mut stdout())?;
        return Ok(());
    }

    let result = engine
        .analyze_path(path)
        .with_context(|| format!("analyzing {}", path.display()))?;
    format.write_analysis(&display(path), &result, &mut stdout())?;
    Ok(())
}

fn serve(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.storage_dir {
        config.server.storage_dir = dir;
    }
    let bind = format!("{}:{}", config.server.host, config.server.port);
    devease::server::run(config).with_context(|| format!("serving on {bind}"))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
