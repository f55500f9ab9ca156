//! Configuration loading and management.
//!
//! Every policy constant the engine uses lives here: smell thresholds, score
//! weights, debt breakpoints and the request budgets.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exclude patterns (glob) for directory analysis.
    #[serde(rename = "exclude")]
    pub exclude_patterns: Vec<String>,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Time and size budgets.
    pub limits: LimitsConfig,
    /// Smell rule thresholds.
    pub smells: SmellConfig,
    /// Quality score policy.
    pub scoring: ScoringConfig,
    /// Technical debt policy.
    pub debt: DebtConfig,
    /// Complexity predictor configuration.
    pub predictor: PredictorConfig,
    /// Design pattern recognizer configuration.
    pub patterns: PatternConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `DEVEASE_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::core::Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("DEVEASE_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from directory, looking for devease.toml or .devease/devease.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    /// Env vars with `DEVEASE_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("devease.toml")))
            .merge(Toml::file(dir.join(".devease/devease.toml")))
            .merge(Env::prefixed("DEVEASE_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Create default config file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::core::Error::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        let w = &self.scoring.weights;
        let total = w.maintainability + w.readability + w.complexity + w.documentation;
        if [w.maintainability, w.readability, w.complexity, w.documentation]
            .iter()
            .any(|v| *v < 0.0)
            || total <= 0.0
        {
            return Err(crate::core::Error::config(
                "scoring weights must be non-negative and not all zero",
            ));
        }
        let levels = &self.debt.levels;
        if !(levels.medium <= levels.high && levels.high <= levels.critical) {
            return Err(crate::core::Error::config(
                "debt level breakpoints must satisfy medium <= high <= critical",
            ));
        }
        if self.debt.ledger_max_entries == 0 {
            return Err(crate::core::Error::config(
                "debt.ledger_max_entries must be at least 1",
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Allowed CORS origins. `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// Directory where uploaded files are stored.
    pub storage_dir: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Worker threads; defaults to the number of CPUs.
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            storage_dir: PathBuf::from("project_files"),
            max_upload_bytes: 2_000_000,
            workers: None,
        }
    }
}

/// Time and size budgets for one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Budget for the whole analysis, in milliseconds.
    pub analysis_timeout_ms: u64,
    /// Budget for a single tree-sitter parse, in milliseconds.
    pub parse_timeout_ms: u64,
    /// Budget for file reads and model loading, in milliseconds.
    pub io_timeout_ms: u64,
    /// Largest source file analyzed, in bytes. Larger files are likely bundles.
    pub max_file_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            analysis_timeout_ms: 15_000,
            parse_timeout_ms: 5_000,
            io_timeout_ms: 2_000,
            max_file_size: 1_000_000,
        }
    }
}

/// Smell rule thresholds. `*_warn` bands raise the lower severity, `*_error`
/// bands the higher one; a value must exceed the threshold to fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmellConfig {
    pub long_method_warn: u32,
    pub long_method_error: u32,
    pub cyclomatic_warn: u32,
    pub cyclomatic_error: u32,
    pub god_class_methods_warn: usize,
    pub god_class_methods_error: usize,
    pub god_class_fields_warn: usize,
    pub god_class_fields_error: usize,
    pub nesting_warn: u32,
    pub nesting_error: u32,
    pub parameters_warn: u32,
    pub parameters_error: u32,
    pub condition_warn: u32,
    pub condition_error: u32,
    pub large_file_warn: usize,
    pub large_file_error: usize,
    /// Literals with an absolute value above this are magic numbers.
    pub magic_number_min: f64,
    /// Cap on magic-number findings per file.
    pub max_magic_numbers: usize,
    /// Undocumented declarations shorter than this are not reported.
    pub documented_min_lines: u32,
    /// Bodies with fewer tokens are ignored by duplicate detection.
    pub duplicate_min_tokens: usize,
    /// Token-shape similarity at or above which two bodies are duplicates.
    pub duplicate_similarity: f64,
}

impl Default for SmellConfig {
    fn default() -> Self {
        Self {
            long_method_warn: 50,
            long_method_error: 100,
            cyclomatic_warn: 10,
            cyclomatic_error: 20,
            god_class_methods_warn: 15,
            god_class_methods_error: 25,
            god_class_fields_warn: 10,
            god_class_fields_error: 15,
            nesting_warn: 4,
            nesting_error: 6,
            parameters_warn: 5,
            parameters_error: 8,
            condition_warn: 3,
            condition_error: 5,
            large_file_warn: 500,
            large_file_error: 1000,
            magic_number_min: 10.0,
            max_magic_numbers: 25,
            documented_min_lines: 8,
            duplicate_min_tokens: 30,
            duplicate_similarity: 0.9,
        }
    }
}

/// Quality score policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Sub-score weights for the overall score.
    pub weights: ScoreWeights,
    /// Lines longer than this (in display columns) hurt readability.
    pub long_line_length: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            long_line_length: 120,
        }
    }
}

/// Weights of the four sub-scores in the overall score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub maintainability: f64,
    pub readability: f64,
    pub complexity: f64,
    pub documentation: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            maintainability: 0.30,
            readability: 0.25,
            complexity: 0.25,
            documentation: 0.20,
        }
    }
}

/// Technical debt policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebtConfig {
    /// Debt points contributed by one smell of each severity.
    pub severity_weights: SeverityWeights,
    /// Debt level breakpoints.
    pub levels: DebtLevels,
    /// Debt trend breakpoints.
    pub trend: TrendBreakpoints,
    /// Upper bound on estimated remediation hours for one file.
    pub max_hours: f64,
    /// Upper bound on remediation hours for one smell.
    pub max_hours_per_smell: f64,
    /// Cap on reported priority issues.
    pub max_priority_issues: usize,
    /// Cap on reported recommendations.
    pub max_recommendations: usize,
    /// Ledger entries kept per project; the oldest are dropped first.
    pub ledger_max_entries: usize,
}

impl Default for DebtConfig {
    fn default() -> Self {
        Self {
            severity_weights: SeverityWeights::default(),
            levels: DebtLevels::default(),
            trend: TrendBreakpoints::default(),
            max_hours: 40.0,
            max_hours_per_smell: 8.0,
            max_priority_issues: 10,
            max_recommendations: 8,
            ledger_max_entries: 500,
        }
    }
}

/// Debt points per smell, by severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 12.5,
            high: 7.5,
            medium: 4.0,
            low: 1.5,
        }
    }
}

/// Minimum debt score for each level; anything below `medium` is low.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebtLevels {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for DebtLevels {
    fn default() -> Self {
        Self {
            critical: 70.0,
            high: 50.0,
            medium: 30.0,
        }
    }
}

/// Minimum debt score for each trend; anything below `stable` is decreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendBreakpoints {
    pub increasing: f64,
    pub stable: f64,
}

impl Default for TrendBreakpoints {
    fn default() -> Self {
        Self {
            increasing: 70.0,
            stable: 40.0,
        }
    }
}

/// Complexity predictor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Optional JSON model replacing the built-in weights.
    pub model_path: Option<PathBuf>,
    /// Files with fewer code lines abstain from prediction.
    pub min_code_lines: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            min_code_lines: 3,
        }
    }
}

/// Design pattern recognizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Minimum confidence for a named pattern to be reported.
    pub detection_threshold: f64,
    /// Minimum raw category signal before a category is predicted.
    pub min_category_signal: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.3,
            min_category_signal: 0.2,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
    /// Color output.
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format.
    Json,
    /// Markdown format.
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {s}. Use 'text', 'json', or 'md'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.smells.cyclomatic_warn, 10);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.debt.levels.critical, 70.0);
        assert!(config.predictor.model_path.is_none());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        let total = w.maintainability + w.readability + w.complexity + w.documentation;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("unknown".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_config_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "devease.toml",
                "[smells]\ncyclomatic_warn = 15\ncyclomatic_error = 25",
            )?;
            let config = Config::from_file("devease.toml").unwrap();
            assert_eq!(config.smells.cyclomatic_warn, 15);
            assert_eq!(config.smells.cyclomatic_error, 25);
            assert_eq!(config.smells.long_method_warn, 50);
            Ok(())
        });
    }

    #[test]
    fn test_config_load_default_dot_devease() {
        Jail::expect_with(|jail| {
            std::fs::create_dir(jail.directory().join(".devease")).unwrap();
            jail.create_file(".devease/devease.toml", "[debt]\nmax_hours = 12.0")?;
            let config = Config::load_default(".").unwrap();
            assert_eq!(config.debt.max_hours, 12.0);
            Ok(())
        });
    }

    #[test]
    fn test_config_load_default_no_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load_default(".").unwrap();
            assert_eq!(config.smells.cyclomatic_warn, 10);
            Ok(())
        });
    }

    #[test]
    fn test_from_file_errors_on_missing_file() {
        let result = Config::from_file("/nonexistent/path/devease.toml");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not found"), "expected 'not found' in: {err}");
    }

    #[test]
    fn test_env_var_overrides_file_value() {
        Jail::expect_with(|jail| {
            jail.create_file("devease.toml", "[server]\nport = 9000")?;
            jail.set_env("DEVEASE_SERVER__PORT", "9100");
            let config = Config::from_file("devease.toml").unwrap();
            assert_eq!(config.server.port, 9100);
            Ok(())
        });
    }

    #[test]
    fn test_env_var_overrides_nested_weight() {
        Jail::expect_with(|jail| {
            jail.set_env("DEVEASE_SCORING__WEIGHTS__DOCUMENTATION", "0.5");
            let config = Config::load_default(".").unwrap();
            assert_eq!(config.scoring.weights.documentation, 0.5);
            Ok(())
        });
    }

    #[test]
    fn test_rejects_inverted_breakpoints() {
        Jail::expect_with(|jail| {
            jail.create_file("devease.toml", "[debt.levels]\nmedium = 80.0")?;
            let err = Config::from_file("devease.toml").unwrap_err();
            assert!(err.to_string().contains("breakpoints"));
            Ok(())
        });
    }

    #[test]
    fn test_rejects_zero_weights() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "devease.toml",
                "[scoring.weights]\nmaintainability = 0.0\nreadability = 0.0\ncomplexity = 0.0\ndocumentation = 0.0",
            )?;
            assert!(Config::from_file("devease.toml").is_err());
            Ok(())
        });
    }

    #[test]
    fn test_ledger_cap_must_be_positive() {
        Jail::expect_with(|jail| {
            jail.create_file("devease.toml", "[debt]\nledger_max_entries = 0")?;
            let err = Config::from_file("devease.toml").unwrap_err();
            assert!(err.to_string().contains("ledger_max_entries"));

            jail.create_file("devease.toml", "[debt]\nledger_max_entries = 2")?;
            assert_eq!(Config::from_file("devease.toml").unwrap().debt.ledger_max_entries, 2);
            Ok(())
        });
    }

    #[test]
    fn test_default_toml_parses() {
        let parsed: Config = toml::from_str(Config::default_toml()).unwrap();
        assert_eq!(parsed.smells.long_method_warn, 50);
        assert_eq!(parsed.scoring.weights.maintainability, 0.30);
    }

    #[test]
    fn test_to_toml_round_trips_port() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("port = 8000"));
    }
}
