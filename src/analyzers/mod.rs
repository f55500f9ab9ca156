//! Analysis stages that run on a parsed source unit.

pub mod duplicates;
pub mod metrics;
pub mod patterns;
pub mod prediction;
pub mod smells;

// Re-export analyzer types for convenience
pub use metrics::{FileMetrics, FunctionMetrics, MetricOptions};
pub use patterns::{DesignPatterns, PatternCategory, PatternRecognizer};
pub use prediction::{ComplexityPredictor, MlComplexity, Prediction};
pub use smells::{Severity, Smell, SmellDetector, SmellReport, SmellType};
