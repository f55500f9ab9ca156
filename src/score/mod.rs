//! Composite quality score.
//!
//! Four sub-scores (maintainability, readability, complexity, documentation)
//! are derived from file metrics and the smell report, then combined with the
//! configured weights into an overall score.

pub mod debt;

use serde::{Deserialize, Serialize};

use crate::analyzers::metrics::FileMetrics;
use crate::analyzers::smells::{Severity, SmellReport, SmellType};
use crate::config::{ScoreWeights, ScoringConfig};

pub use debt::{DebtEstimator, DebtLevel, DebtTrend, TechnicalDebt};

/// Maintainability points lost per smell of each type.
const TYPE_PENALTIES: [(SmellType, f64); 6] = [
    (SmellType::DuplicateCode, 8.0),
    (SmellType::LongMethod, 6.0),
    (SmellType::GodClass, 12.0),
    (SmellType::HighComplexity, 5.0),
    (SmellType::DeepNesting, 4.0),
    (SmellType::LongParameterList, 3.0),
];

/// Cap on the severity-weighted smell density penalty.
const MAX_DENSITY_PENALTY: f64 = 20.0;

/// Density is measured per 100 lines, with small files treated as 100 lines.
const DENSITY_FLOOR_LINES: f64 = 100.0;

/// Quality score of one source unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub overall_score: f64,
    pub maintainability: f64,
    pub readability: f64,
    pub complexity: f64,
    pub documentation: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Quality scorer.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    config: ScoringConfig,
}

impl QualityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, metrics: &FileMetrics, smells: &SmellReport) -> QualityScore {
        let maintainability = clamp_score(maintainability_score(metrics, smells));
        let readability = clamp_score(readability_score(metrics));
        let complexity = clamp_score(complexity_score(metrics));
        let documentation = clamp_score(documentation_score(metrics));

        let weights = normalized_weights(&self.config.weights);
        let overall = maintainability * weights.maintainability
            + readability * weights.readability
            + complexity * weights.complexity
            + documentation * weights.documentation;

        QualityScore {
            overall_score: round1(clamp_score(overall)),
            maintainability: round1(maintainability),
            readability: round1(readability),
            complexity: round1(complexity),
            documentation: round1(documentation),
            issues: generate_issues(metrics, smells, complexity),
            recommendations: generate_recommendations(metrics, smells),
        }
    }
}

/// Weights scaled to sum to 1. Non-positive totals fall back to the defaults.
pub fn normalized_weights(weights: &ScoreWeights) -> ScoreWeights {
    let parts = [
        weights.maintainability,
        weights.readability,
        weights.complexity,
        weights.documentation,
    ];
    let total: f64 = parts.iter().map(|w| w.max(0.0)).sum();
    if total <= f64::EPSILON || parts.iter().any(|w| !w.is_finite()) {
        return ScoreWeights::default();
    }
    ScoreWeights {
        maintainability: weights.maintainability.max(0.0) / total,
        readability: weights.readability.max(0.0) / total,
        complexity: weights.complexity.max(0.0) / total,
        documentation: weights.documentation.max(0.0) / total,
    }
}

fn maintainability_score(metrics: &FileMetrics, smells: &SmellReport) -> f64 {
    let type_penalty: f64 = TYPE_PENALTIES
        .iter()
        .map(|(t, p)| smells.count(*t) as f64 * p)
        .sum();

    let severity_weight: f64 = smells
        .smells
        .iter()
        .map(|s| f64::from(s.severity.weight()))
        .sum();
    let density = severity_weight / (metrics.loc as f64).max(DENSITY_FLOOR_LINES) * 100.0;
    let density_penalty = (density * 2.0).min(MAX_DENSITY_PENALTY);

    100.0 - type_penalty - density_penalty
}

fn readability_score(metrics: &FileMetrics) -> f64 {
    let mut score = 100.0;

    if metrics.long_lines > 0 && metrics.total_lines > 0 {
        let ratio = metrics.long_lines as f64 / metrics.total_lines as f64;
        score -= (ratio * 30.0).min(15.0);
    }
    score -= (metrics.indentation_issues as f64 * 5.0).min(10.0);
    score -= (metrics.naming_issues as f64 * 1.5).min(15.0);
    score -= (metrics.spacing_issues as f64 * 0.5).min(10.0);

    // Sparse comments only count against files with real code in them.
    if metrics.loc >= 10 && metrics.comment_ratio < 0.05 {
        score -= (0.05 - metrics.comment_ratio) / 0.05 * 10.0;
    }
    score
}

fn complexity_score(metrics: &FileMetrics) -> f64 {
    // Score based on average complexity
    // 0-5: 100, 5-10: 90-100, 10-20: 70-90, 20-30: 50-70, 30+: 0-50
    let avg = metrics.avg_cyclomatic;
    let base = if avg <= 5.0 {
        100.0
    } else if avg <= 10.0 {
        90.0 + (10.0 - avg) * 2.0
    } else if avg <= 20.0 {
        70.0 + (20.0 - avg) * 2.0
    } else if avg <= 30.0 {
        50.0 + (30.0 - avg) * 2.0
    } else {
        (50.0 - (avg - 30.0)).max(0.0)
    };

    let nesting_penalty = f64::from(metrics.max_nesting.saturating_sub(4)) * 10.0;
    base - nesting_penalty
}

fn documentation_score(metrics: &FileMetrics) -> f64 {
    if metrics.loc == 0 {
        return 100.0;
    }
    if let Some(coverage) = metrics.doc_coverage {
        return coverage * 100.0;
    }
    let ratio = metrics.comment_ratio;
    if ratio >= 0.20 {
        100.0
    } else if ratio >= 0.15 {
        90.0
    } else if ratio >= 0.10 {
        80.0
    } else if ratio >= 0.05 {
        60.0
    } else if ratio >= 0.02 {
        40.0
    } else {
        20.0
    }
}

fn generate_issues(metrics: &FileMetrics, smells: &SmellReport, complexity: f64) -> Vec<String> {
    let mut issues = Vec::new();
    let severity = |s: Severity| smells.by_severity.get(s.as_str()).copied().unwrap_or(0);

    let critical = severity(Severity::Critical);
    if critical > 0 {
        issues.push(format!(
            "Critical issues found: {critical} critical code smells"
        ));
    }
    let high = severity(Severity::High);
    if high > 0 {
        issues.push(format!(
            "High priority issues: {high} high severity code smells"
        ));
    }

    let typed = [
        (SmellType::DuplicateCode, "Code duplication: {} instances of duplicate code"),
        (SmellType::LongMethod, "Long functions: {} functions are too long"),
        (SmellType::GodClass, "God classes: {} classes have too many responsibilities"),
    ];
    for (smell_type, template) in typed {
        let count = smells.count(smell_type);
        if count > 0 {
            issues.push(template.replace("{}", &count.to_string()));
        }
    }

    if metrics.total_lines > 1000 {
        issues.push(format!(
            "Large file: {} lines (consider splitting)",
            metrics.total_lines
        ));
    } else if metrics.total_lines > 500 {
        issues.push(format!("Moderately large file: {} lines", metrics.total_lines));
    }

    if metrics.loc > 0 && metrics.comment_ratio < 0.02 {
        issues.push(
            "Very low documentation: Less than 2% of lines are comments or docstrings".to_string(),
        );
    } else if metrics.comment_ratio > 0.5 {
        issues.push("Excessive comments: More than 50% of lines are comments".to_string());
    }

    if complexity < 50.0 {
        issues.push(format!(
            "High complexity: average cyclomatic complexity is {:.1}",
            metrics.avg_cyclomatic
        ));
    }
    issues
}

fn generate_recommendations(metrics: &FileMetrics, smells: &SmellReport) -> Vec<String> {
    let mut recommendations = Vec::new();

    let by_type = [
        (
            SmellType::DuplicateCode,
            "Extract common functionality into shared functions or methods",
        ),
        (
            SmellType::LongMethod,
            "Break down long functions into smaller, focused functions",
        ),
        (
            SmellType::GodClass,
            "Split large classes into smaller, single-responsibility classes",
        ),
        (
            SmellType::ComplexCondition,
            "Simplify complex conditions by extracting them into well-named methods",
        ),
        (
            SmellType::MagicNumber,
            "Replace magic numbers with named constants",
        ),
        (
            SmellType::UnusedImport,
            "Remove unused imports to clean up the code",
        ),
    ];
    for (smell_type, text) in by_type {
        if smells.count(smell_type) > 0 {
            recommendations.push(text.to_string());
        }
    }

    if metrics.total_lines > 500 {
        recommendations
            .push("Consider splitting this file into smaller, more focused files".to_string());
    }
    if metrics.loc > 0 && metrics.comment_ratio < 0.02 {
        recommendations.push("Add more comments to improve code documentation".to_string());
    } else if metrics.comment_ratio > 0.5 {
        recommendations.push(
            "Review comments: some may be redundant or the code needs refactoring".to_string(),
        );
    }
    if !smells.is_empty() {
        recommendations.push("Focus on addressing the highest priority issues first".to_string());
    }
    recommendations
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::smells::Smell;

    fn smell(smell_type: SmellType, severity: Severity) -> Smell {
        Smell {
            smell_type,
            severity,
            line: 1,
            description: String::new(),
            suggestion: String::new(),
        }
    }

    fn base_metrics() -> FileMetrics {
        FileMetrics {
            total_lines: 40,
            loc: 30,
            comment_lines: 6,
            blank_lines: 4,
            comment_ratio: 0.15,
            avg_cyclomatic: 2.0,
            max_cyclomatic: 3,
            module_cyclomatic: 5,
            doc_coverage: Some(1.0),
            documentable: 2,
            documented: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_file_scores_high() {
        let score = QualityScorer::default().score(&base_metrics(), &SmellReport::default());
        assert_eq!(score.maintainability, 100.0);
        assert_eq!(score.readability, 100.0);
        assert_eq!(score.complexity, 100.0);
        assert_eq!(score.documentation, 100.0);
        assert_eq!(score.overall_score, 100.0);
        assert!(score.issues.is_empty());
        assert!(score.recommendations.is_empty());
    }

    #[test]
    fn test_complexity_piecewise() {
        let mut metrics = base_metrics();
        for (avg, expected) in [
            (5.0, 100.0),
            (7.5, 95.0),
            (15.0, 80.0),
            (25.0, 60.0),
            (40.0, 40.0),
            (100.0, 0.0),
        ] {
            metrics.avg_cyclomatic = avg;
            assert!((complexity_score(&metrics) - expected).abs() < 1e-9, "avg {avg}");
        }
        metrics.avg_cyclomatic = 1.0;
        metrics.max_nesting = 6;
        assert!((complexity_score(&metrics) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_documentation_fallback_steps() {
        let mut metrics = base_metrics();
        metrics.doc_coverage = None;
        for (ratio, expected) in [
            (0.25, 100.0),
            (0.15, 90.0),
            (0.12, 80.0),
            (0.06, 60.0),
            (0.03, 40.0),
            (0.0, 20.0),
        ] {
            metrics.comment_ratio = ratio;
            assert_eq!(documentation_score(&metrics), expected);
        }
    }

    #[test]
    fn test_maintainability_penalties() {
        let report = SmellReport::from_smells(vec![
            smell(SmellType::GodClass, Severity::Critical),
            smell(SmellType::DuplicateCode, Severity::Medium),
        ]);
        let score = QualityScorer::default().score(&base_metrics(), &report);
        // 100 - 12 - 8 - (4 + 2) / 100 * 100 * 2
        assert!((score.maintainability - 68.0).abs() < 1e-9);
        assert!(score.issues.iter().any(|i| i.contains("1 critical")));
        assert!(score
            .recommendations
            .iter()
            .any(|r| r.contains("single-responsibility")));
        assert_eq!(
            score.recommendations.last().map(String::as_str),
            Some("Focus on addressing the highest priority issues first")
        );
    }

    #[test]
    fn test_readability_penalties_are_capped() {
        let mut metrics = base_metrics();
        metrics.long_lines = 40;
        metrics.indentation_issues = 5;
        metrics.naming_issues = 100;
        metrics.spacing_issues = 100;
        let score = readability_score(&metrics);
        assert!((score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let smells: Vec<Smell> = (0..200)
            .map(|_| smell(SmellType::GodClass, Severity::Critical))
            .collect();
        let mut metrics = base_metrics();
        metrics.avg_cyclomatic = 500.0;
        metrics.max_nesting = 50;
        let score = QualityScorer::default().score(&metrics, &SmellReport::from_smells(smells));
        for value in [
            score.overall_score,
            score.maintainability,
            score.readability,
            score.complexity,
            score.documentation,
        ] {
            assert!((0.0..=100.0).contains(&value));
        }
        assert_eq!(score.maintainability, 0.0);
        assert_eq!(score.complexity, 0.0);
    }

    #[test]
    fn test_weights_are_renormalized() {
        let weights = ScoreWeights {
            maintainability: 3.0,
            readability: 2.5,
            complexity: 2.5,
            documentation: 2.0,
        };
        let normalized = normalized_weights(&weights);
        assert!((normalized.maintainability - 0.3).abs() < 1e-9);
        assert!((normalized.documentation - 0.2).abs() < 1e-9);

        let zero = ScoreWeights {
            maintainability: 0.0,
            readability: 0.0,
            complexity: 0.0,
            documentation: 0.0,
        };
        assert!((normalized_weights(&zero).maintainability - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_empty_file_is_perfect() {
        let metrics = FileMetrics {
            avg_cyclomatic: 1.0,
            module_cyclomatic: 1,
            ..Default::default()
        };
        let score = QualityScorer::default().score(&metrics, &SmellReport::default());
        assert_eq!(score.overall_score, 100.0);
        assert!(score.issues.is_empty());
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(72.349), 72.3);
        assert_eq!(round1(72.36), 72.4);
        assert_eq!(round1(0.04), 0.0);
    }
}
