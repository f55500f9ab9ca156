//! End-to-end analysis of one source unit.
//!
//! Stages run strictly forward: language detection, parsing, metric
//! extraction, then smells, complexity prediction and pattern recognition in
//! parallel, and finally scoring and debt estimation over the joined results.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::analyzers::metrics::{self, FileMetrics, MetricOptions};
use crate::analyzers::{
    ComplexityPredictor, DesignPatterns, MlComplexity, PatternRecognizer, SmellDetector,
    SmellReport,
};
use crate::config::{Config, LimitsConfig};
use crate::core::{Error, Language, Result, SourceUnit};
use crate::parser::{AdapterRegistry, AstSummary, DeclarationKind};
use crate::score::{DebtEstimator, QualityScore, QualityScorer, TechnicalDebt};

/// Stages reported in `analysis_metadata.modules_used`, in execution order.
pub const MODULES: [&str; 8] = [
    "language_detector",
    "ast_parser",
    "metric_extractor",
    "smell_detector",
    "complexity_predictor",
    "pattern_recognizer",
    "quality_scorer",
    "debt_estimator",
];

/// Whether the parser saw the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Complete,
    Partial,
}

/// Degraded-but-usable condition reported alongside a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Tree-sitter recovered from syntax errors on these lines.
    PartialParse { lines: Vec<u32>, message: String },
}

/// Provenance of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub modules_used: Vec<String>,
    pub analysis_complete: bool,
    pub engine_version: String,
    /// blake3 digest of the analyzed content.
    pub fingerprint: String,
}

/// Everything the engine reports for one source unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub language: Language,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub imports: Vec<String>,
    pub methods: Vec<String>,
    pub fields: Vec<String>,
    pub total_nodes: usize,
    pub ast_summary: AstSummary,
    pub metrics: FileMetrics,
    pub quality_score: QualityScore,
    pub code_smells: SmellReport,
    pub technical_debt: TechnicalDebt,
    pub ml_complexity: MlComplexity,
    pub design_patterns: DesignPatterns,
    pub code_content: String,
    pub warnings: Vec<Warning>,
    pub parse_status: ParseStatus,
    pub analysis_metadata: AnalysisMetadata,
}

/// The analysis engine. Holds only immutable configuration and models, so one
/// instance serves any number of concurrent requests.
pub struct Engine {
    registry: AdapterRegistry,
    limits: LimitsConfig,
    metric_options: MetricOptions,
    smells: SmellDetector,
    predictor: ComplexityPredictor,
    patterns: PatternRecognizer,
    scorer: QualityScorer,
    debt: DebtEstimator,
}

impl Default for Engine {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Engine {
    /// Build an engine from configuration.
    ///
    /// Loads the complexity model when one is configured, so this must run
    /// before any async runtime is entered.
    pub fn from_config(config: &Config) -> Self {
        let io_budget = Duration::from_millis(config.limits.io_timeout_ms);
        Self {
            registry: AdapterRegistry::new(),
            limits: config.limits.clone(),
            metric_options: MetricOptions {
                long_line_length: config.scoring.long_line_length,
            },
            smells: SmellDetector::new(config.smells.clone()),
            predictor: ComplexityPredictor::from_config(&config.predictor, io_budget),
            patterns: PatternRecognizer::new(config.patterns.clone()),
            scorer: QualityScorer::new(config.scoring.clone()),
            debt: DebtEstimator::new(config.debt.clone()),
        }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Analyze content, resolving its language from `path` and then the text.
    pub fn analyze(&self, path: Option<&Path>, content: &str) -> Result<AnalysisResult> {
        self.check_size(content.len())?;
        let adapter = self.registry.detect(path, content)?;
        let unit = SourceUnit::with_language(
            path.map(Path::to_path_buf),
            adapter.language(),
            content.to_string(),
        );
        self.analyze_unit(&unit)
    }

    /// Read and analyze a file from disk.
    pub fn analyze_path(&self, path: &Path) -> Result<AnalysisResult> {
        let metadata = std::fs::metadata(path).map_err(|_| Error::FileNotFound {
            path: path.to_path_buf(),
        })?;
        self.check_size(metadata.len() as usize)?;
        let unit = SourceUnit::load(path)?;
        self.analyze_unit(&unit)
    }

    /// Analyze an already-ingested unit.
    pub fn analyze_unit(&self, unit: &SourceUnit) -> Result<AnalysisResult> {
        let started = Instant::now();
        tracing::info!("Analyzing {} ({})", unit.display_path(), unit.language);

        let adapter = self.registry.for_language(unit.language)?;
        let parsed = adapter.parse(unit, Duration::from_millis(self.limits.parse_timeout_ms))?;
        let summary = adapter.extract_declarations(&parsed);
        tracing::debug!(
            "Parsed {}: {} declarations, {} nodes",
            unit.display_path(),
            summary.declarations.len(),
            summary.total_nodes
        );

        let mut warnings = Vec::new();
        if summary.is_partial() {
            tracing::warn!(
                "Partial parse of {}: syntax errors on lines {:?}",
                unit.display_path(),
                summary.error_lines
            );
            warnings.push(Warning::PartialParse {
                message: format!(
                    "Syntax errors on {} line(s); results are best-effort",
                    summary.error_lines.len()
                ),
                lines: summary.error_lines.clone(),
            });
        }

        let metrics = metrics::extract(&parsed, &summary, self.metric_options);
        tracing::debug!(
            "Metrics for {}: {} loc, {} functions",
            unit.display_path(),
            metrics.loc,
            metrics.function_count
        );

        let (code_smells, (prediction, design_patterns)) = rayon::join(
            || self.smells.detect(unit, &summary, &metrics),
            || {
                rayon::join(
                    || {
                        self.predictor
                            .predict(&metrics.features, metrics.body_count(), metrics.loc)
                    },
                    || self.patterns.recognize(unit, &summary, &metrics),
                )
            },
        );

        let quality_score = self.scorer.score(&metrics, &code_smells);
        let technical_debt = self.debt.estimate(&code_smells);

        let parse_status = if summary.is_partial() {
            ParseStatus::Partial
        } else {
            ParseStatus::Complete
        };

        tracing::info!(
            "Analyzed {} in {:?}: score {}, {} smells, debt {}",
            unit.display_path(),
            started.elapsed(),
            quality_score.overall_score,
            code_smells.total_smells,
            technical_debt.debt_level
        );

        Ok(AnalysisResult {
            language: unit.language,
            functions: summary.names(DeclarationKind::Function),
            classes: summary.names(DeclarationKind::Class),
            imports: summary.names(DeclarationKind::Import),
            methods: summary.names(DeclarationKind::Method),
            fields: summary.names(DeclarationKind::Field),
            total_nodes: summary.total_nodes,
            ml_complexity: MlComplexity {
                features: metrics.features.clone(),
                prediction,
            },
            ast_summary: summary,
            metrics,
            quality_score,
            code_smells,
            technical_debt,
            design_patterns,
            code_content: unit.content.clone(),
            warnings,
            parse_status,
            analysis_metadata: AnalysisMetadata {
                modules_used: MODULES.iter().map(|m| m.to_string()).collect(),
                analysis_complete: parse_status == ParseStatus::Complete,
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                fingerprint: unit.fingerprint.clone(),
            },
        })
    }

    fn check_size(&self, size: usize) -> Result<()> {
        let max = self.limits.max_file_size;
        if size > max {
            return Err(Error::PayloadTooLarge { size, max });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{PatternCategory, SmellType};
    use crate::analyzers::prediction::Prediction;
    use crate::score::DebtLevel;

    const SAMPLE: &str = r#"import os
import json


class Inventory:
    """Keeps stock counts."""

    def __init__(self):
        self.items = {}

    def add(self, name, count):
        if name in self.items:
            self.items[name] += count
        else:
            self.items[name] = count
        return self.items[name]


def load(path):
    with open(path) as fh:
        return json.load(fh)
"#;

    fn analyze(name: &str, content: &str) -> Result<AnalysisResult> {
        Engine::default().analyze(Some(Path::new(name)), content)
    }

    #[test]
    fn test_full_analysis() {
        let result = analyze("inventory.py", SAMPLE).unwrap();
        assert_eq!(result.language, Language::Python);
        assert_eq!(result.classes, vec!["Inventory"]);
        assert_eq!(result.functions, vec!["load"]);
        assert_eq!(result.methods, vec!["__init__", "add"]);
        assert_eq!(result.fields, vec!["items"]);
        assert_eq!(result.imports.len(), 2);
        assert_eq!(result.parse_status, ParseStatus::Complete);
        assert!(result.warnings.is_empty());
        assert!(result.analysis_metadata.analysis_complete);
        assert_eq!(result.analysis_metadata.modules_used.len(), MODULES.len());
        assert_eq!(result.code_content, SAMPLE);

        // `os` is never used
        assert_eq!(result.code_smells.count(SmellType::UnusedImport), 1);
        assert!(result.ml_complexity.prediction.is_estimate());
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let a = analyze("inventory.py", SAMPLE).unwrap();
        let b = analyze("inventory.py", SAMPLE).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_blank_content_with_filename() {
        let result = analyze("empty.py", "  \n\n").unwrap();
        assert_eq!(result.code_smells.total_smells, 0);
        assert_eq!(result.quality_score.overall_score, 100.0);
        assert_eq!(result.quality_score.maintainability, 100.0);
        assert_eq!(result.technical_debt.total_debt_score, 0.0);
        assert_eq!(result.technical_debt.estimated_hours, 0.0);
        assert_eq!(result.technical_debt.debt_level, DebtLevel::Low);
        assert!(matches!(
            result.ml_complexity.prediction,
            Prediction::Abstained { .. }
        ));
        assert_eq!(
            result.design_patterns.predicted_category,
            PatternCategory::Unknown
        );
    }

    #[test]
    fn test_blank_content_without_filename() {
        let err = Engine::default().analyze(None, "   \n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_unknown_extension_falls_back_to_content() {
        let result = analyze("snippet.txt", SAMPLE).unwrap();
        assert_eq!(result.language, Language::Python);
    }

    #[test]
    fn test_payload_too_large() {
        let mut config = Config::default();
        config.limits.max_file_size = 16;
        let engine = Engine::from_config(&config);
        let err = engine
            .analyze(Some(Path::new("a.py")), "x = 1\ny = 2\nz = 3\n")
            .unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { max: 16, .. }));
    }

    #[test]
    fn test_malformed_input_is_partial() {
        let code = "def ok():\n    return 1\n\ndef broken(:\n    return (\n";
        let result = analyze("broken.py", code).unwrap();
        assert_eq!(result.parse_status, ParseStatus::Partial);
        assert!(!result.analysis_metadata.analysis_complete);
        let Warning::PartialParse { lines, .. } = &result.warnings[0];
        assert!(!lines.is_empty());
        assert_eq!(
            result.code_smells.smells[0].smell_type,
            SmellType::SyntaxError
        );
        assert!(result.functions.contains(&"ok".to_string()));
    }

    #[test]
    fn test_god_class_flagged_end_to_end() {
        let mut code = String::from("class Huge:\n    def __init__(self):\n");
        for i in 0..20 {
            code.push_str(&format!("        self.f{i} = 0\n"));
        }
        for i in 0..29 {
            code.push_str(&format!("    def m{i}(self):\n        return self.f0\n"));
        }
        let result = analyze("huge.py", &code).unwrap();
        assert_eq!(result.code_smells.count(SmellType::GodClass), 1);
        assert_eq!(result.methods.len(), 30);
        assert_eq!(result.fields.len(), 20);
        assert!(!result.technical_debt.priority_issues.is_empty());
    }

    #[test]
    fn test_analyze_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("inventory.py");
        std::fs::write(&file, SAMPLE).unwrap();
        let result = Engine::default().analyze_path(&file).unwrap();
        assert_eq!(result.language, Language::Python);

        let err = Engine::default()
            .analyze_path(&dir.path().join("missing.py"))
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
