//! Technical debt estimation.
//!
//! Debt is a severity-weighted sum over code smells, clamped to [0, 100].
//! Remediation hours combine a per-severity and a per-type cost, scaled up
//! as overall debt grows.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::round1;
use crate::analyzers::smells::{Severity, Smell, SmellReport, SmellType};
use crate::config::{DebtConfig, DebtLevels, TrendBreakpoints};

/// Debt breakdown categories, in report order.
pub const CATEGORIES: [&str; 6] = [
    "code_smells",
    "complexity",
    "maintainability",
    "documentation",
    "duplication",
    "readability",
];

/// Overall debt level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl DebtLevel {
    pub fn from_score(score: f64, levels: &DebtLevels) -> Self {
        if score >= levels.critical {
            DebtLevel::Critical
        } else if score >= levels.high {
            DebtLevel::High
        } else if score >= levels.medium {
            DebtLevel::Medium
        } else {
            DebtLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DebtLevel::Low => "low",
            DebtLevel::Medium => "medium",
            DebtLevel::High => "high",
            DebtLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for DebtLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction debt is heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtTrend {
    Increasing,
    Stable,
    Decreasing,
}

impl DebtTrend {
    /// Trend implied by a single score.
    pub fn from_score(score: f64, breakpoints: &TrendBreakpoints) -> Self {
        if score >= breakpoints.increasing {
            DebtTrend::Increasing
        } else if score >= breakpoints.stable {
            DebtTrend::Stable
        } else {
            DebtTrend::Decreasing
        }
    }

    /// Trend of the latest score against the mean of earlier ones.
    ///
    /// Differences within `tolerance` points are stable.
    pub fn from_history(scores: &[f64], tolerance: f64) -> Self {
        let Some((latest, earlier)) = scores.split_last() else {
            return DebtTrend::Stable;
        };
        if earlier.is_empty() {
            return DebtTrend::Stable;
        }
        let mean = earlier.iter().sum::<f64>() / earlier.len() as f64;
        if *latest > mean + tolerance {
            DebtTrend::Increasing
        } else if *latest < mean - tolerance {
            DebtTrend::Decreasing
        } else {
            DebtTrend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DebtTrend::Increasing => "increasing",
            DebtTrend::Stable => "stable",
            DebtTrend::Decreasing => "decreasing",
        }
    }
}

impl fmt::Display for DebtTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Technical debt of one source unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalDebt {
    pub total_debt_score: f64,
    pub debt_level: DebtLevel,
    pub debt_trend: DebtTrend,
    pub estimated_hours: f64,
    pub debt_breakdown: BTreeMap<String, f64>,
    pub priority_issues: Vec<Smell>,
    pub recommendations: Vec<String>,
}

/// Remediation hours for one smell of a given severity.
fn severity_cost(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 8.0,
        Severity::High => 4.0,
        Severity::Medium => 2.0,
        Severity::Low => 0.5,
    }
}

/// Remediation hours for one smell of a given type.
fn type_cost(smell_type: SmellType) -> f64 {
    match smell_type {
        SmellType::LongMethod => 3.0,
        SmellType::HighComplexity => 3.0,
        SmellType::GodClass => 6.0,
        SmellType::DuplicateCode => 2.5,
        SmellType::MagicNumber => 0.3,
        SmellType::DeepNesting => 2.0,
        SmellType::MissingDocumentation => 1.0,
        SmellType::LongParameterList => 1.0,
        SmellType::ComplexCondition => 1.5,
        SmellType::LargeFile => 4.0,
        SmellType::UnusedImport => 0.1,
        SmellType::SyntaxError => 2.0,
    }
}

fn category(smell_type: SmellType) -> &'static str {
    match smell_type {
        SmellType::HighComplexity
        | SmellType::DeepNesting
        | SmellType::ComplexCondition
        | SmellType::LongParameterList => "complexity",
        SmellType::LongMethod
        | SmellType::GodClass
        | SmellType::LargeFile
        | SmellType::SyntaxError => "maintainability",
        SmellType::MissingDocumentation => "documentation",
        SmellType::DuplicateCode => "duplication",
        SmellType::MagicNumber | SmellType::UnusedImport => "readability",
    }
}

fn recommendation(smell_type: SmellType) -> &'static str {
    match smell_type {
        SmellType::LongMethod => "Break down long functions into smaller, focused units",
        SmellType::HighComplexity => {
            "Reduce code complexity by breaking down large functions and simplifying logic"
        }
        SmellType::GodClass => "Improve maintainability by splitting god classes into cohesive components",
        SmellType::DuplicateCode => "Eliminate code duplication by extracting common functionality",
        SmellType::MagicNumber => "Replace magic numbers with named constants",
        SmellType::DeepNesting => "Flatten deeply nested blocks with early returns or extracted helpers",
        SmellType::MissingDocumentation => {
            "Add documentation to public functions and classes to improve code understanding"
        }
        SmellType::LongParameterList => "Group related parameters into a dedicated type",
        SmellType::ComplexCondition => "Simplify complex conditions with well-named boolean helpers",
        SmellType::LargeFile => "Split large files into smaller, focused modules",
        SmellType::UnusedImport => "Remove unused imports",
        SmellType::SyntaxError => "Fix syntax errors first; other findings rely on a complete parse",
    }
}

const NO_DEBT: &str = "Code quality is good! Maintain current standards.";

/// Technical debt estimator.
#[derive(Debug, Clone, Default)]
pub struct DebtEstimator {
    config: DebtConfig,
}

impl DebtEstimator {
    pub fn new(config: DebtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DebtConfig {
        &self.config
    }

    /// Debt points contributed by one smell.
    pub fn contribution(&self, severity: Severity) -> f64 {
        let weights = &self.config.severity_weights;
        match severity {
            Severity::Critical => weights.critical,
            Severity::High => weights.high,
            Severity::Medium => weights.medium,
            Severity::Low => weights.low,
        }
    }

    pub fn estimate(&self, report: &SmellReport) -> TechnicalDebt {
        let smells = &report.smells;

        let mut breakdown: BTreeMap<String, f64> =
            CATEGORIES.iter().map(|c| (c.to_string(), 0.0)).collect();
        let mut total = 0.0;
        for smell in smells {
            let points = self.contribution(smell.severity);
            total += points;
            *breakdown
                .entry(category(smell.smell_type).to_string())
                .or_default() += points;
        }
        breakdown.insert("code_smells".to_string(), total);
        for value in breakdown.values_mut() {
            *value = round1(value.clamp(0.0, 100.0));
        }
        let total_debt_score = round1(total.clamp(0.0, 100.0));

        let base_hours: f64 = smells
            .iter()
            .map(|s| {
                ((severity_cost(s.severity) + type_cost(s.smell_type)) / 2.0)
                    .min(self.config.max_hours_per_smell)
            })
            .sum();
        let estimated_hours =
            round1((base_hours * (1.0 + total_debt_score / 100.0)).min(self.config.max_hours));

        let debt_level = DebtLevel::from_score(total_debt_score, &self.config.levels);

        TechnicalDebt {
            total_debt_score,
            debt_level,
            debt_trend: DebtTrend::from_score(total_debt_score, &self.config.trend),
            estimated_hours,
            debt_breakdown: breakdown,
            priority_issues: self.priority_issues(smells),
            recommendations: self.recommendations(smells, debt_level),
        }
    }

    /// Critical and high smells, most severe first, original order within a severity.
    fn priority_issues(&self, smells: &[Smell]) -> Vec<Smell> {
        let mut issues: Vec<Smell> = smells
            .iter()
            .filter(|s| s.severity >= Severity::High)
            .cloned()
            .collect();
        issues.sort_by_key(|s| std::cmp::Reverse(s.severity.weight()));
        issues.truncate(self.config.max_priority_issues);
        issues
    }

    fn recommendations(&self, smells: &[Smell], level: DebtLevel) -> Vec<String> {
        if smells.is_empty() {
            return vec![NO_DEBT.to_string()];
        }

        let headline = match level {
            DebtLevel::Critical => {
                "CRITICAL: High technical debt detected. Prioritize refactoring immediately."
            }
            DebtLevel::High => "WARNING: Significant technical debt. Plan dedicated refactoring work.",
            DebtLevel::Medium => "INFO: Some technical debt present. Address it incrementally.",
            DebtLevel::Low => "LOW: Technical debt is under control. Fix remaining issues as you go.",
        };

        // (count, severity weight) per type
        let mut by_type: BTreeMap<SmellType, (usize, u32)> = BTreeMap::new();
        for smell in smells {
            let entry = by_type.entry(smell.smell_type).or_default();
            entry.0 += 1;
            entry.1 += smell.severity.weight();
        }
        let mut dominant: Vec<(SmellType, (usize, u32))> = by_type.into_iter().collect();
        dominant.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(b.1 .1.cmp(&a.1 .1)));

        std::iter::once(headline)
            .chain(dominant.iter().map(|(t, _)| recommendation(*t)))
            .take(self.config.max_recommendations)
            .map(str::to_string)
            .collect()
    }
}
