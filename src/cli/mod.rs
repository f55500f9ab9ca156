//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::core::{FileSet, ProgressTracker};
use crate::output::{DirectoryReport, FileFailure, FileSummary, Format};
use crate::pipeline::Engine;

/// DevEase - static analysis for code quality, smells and technical debt.
#[derive(Parser)]
#[command(name = "devease")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short = 'j', long, global = true)]
    pub jobs: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze a source file, or every supported file under a directory
    #[command(alias = "a")]
    Analyze(AnalyzeArgs),

    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Print the effective configuration
    Config(ConfigArgs),

    /// List supported languages and extensions
    #[command(alias = "langs")]
    Languages,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// File or directory to analyze
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Exclude files matching glob pattern (directory mode, repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory for uploaded files (overrides server.storage_dir)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Print the built-in defaults instead of the effective configuration
    #[arg(long)]
    pub default: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[value(alias = "md")]
    Markdown,
    Text,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
            OutputFormat::Text => Format::Text,
        }
    }
}

/// Analyze every file of a set in parallel.
///
/// Files that fail (unsupported content, oversized, timed out) are listed as
/// failures; they never abort the run.
pub fn analyze_directory(
    engine: &Engine,
    files: &FileSet,
    progress: &ProgressTracker,
) -> DirectoryReport {
    let failures = Mutex::new(Vec::new());

    let summaries: Vec<FileSummary> = files
        .files()
        .par_iter()
        .filter_map(|path| {
            let relative = files.relative_path(path).display().to_string();
            let outcome = engine.analyze_path(path);
            progress.inc();
            match outcome {
                Ok(result) => Some(FileSummary::new(relative, &result)),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", relative, e);
                    failures.lock().push(FileFailure {
                        file: relative,
                        error: e.to_string(),
                    });
                    None
                }
            }
        })
        .collect();

    let mut failures = failures.into_inner();
    failures.sort_by(|a, b| a.file.cmp(&b.file));
    DirectoryReport::new(files.root().display().to_string(), summaries, failures)
}
