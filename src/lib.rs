//! DevEase - static analysis engine for a code-quality dashboard.
//!
//! DevEase parses one source file with tree-sitter, extracts declarations and
//! metrics, detects code smells, scores quality, estimates technical debt,
//! predicts algorithmic complexity and recognizes design patterns.
//!
//! # Supported Languages
//!
//! Go, Rust, Python, TypeScript, JavaScript, TSX/JSX, Java, C, C++, C#, Ruby, PHP, Bash
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use devease::config::Config;
//! use devease::pipeline::Engine;
//!
//! let engine = Engine::from_config(&Config::default());
//! let result = engine
//!     .analyze(Some(Path::new("app.py")), "def add(a, b):\n    return a + b\n")
//!     .unwrap();
//! println!(
//!     "score {} with {} smells",
//!     result.quality_score.overall_score,
//!     result.code_smells.total_smells
//! );
//! ```

pub mod analyzers;
pub mod cli;
pub mod config;
pub mod core;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod score;
pub mod server;

pub use pipeline::{AnalysisResult, Engine};
