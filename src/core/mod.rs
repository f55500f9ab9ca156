//! Core types shared by every analysis stage.

mod error;
mod file_set;
mod language;
mod progress;
mod source_unit;

pub use error::{Error, Result};
pub use file_set::FileSet;
pub use language::{supported_extensions, Language};
pub use progress::ProgressTracker;
pub use source_unit::{line_count, SourceUnit};
