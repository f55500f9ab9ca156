//! Design pattern recognition.
//!
//! Two independent signals are produced for a source unit:
//! - a category classifier (Creational, Structural, Behavioral or Unknown)
//! - a named-pattern detector (Singleton, Factory, Builder, Observer, Strategy,
//!   Decorator, Adapter, Command)
//!
//! Both are driven by weighted regex indicators over code lines. They are not
//! reconciled and may disagree.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::metrics::FileMetrics;
use crate::config::PatternConfig;
use crate::core::SourceUnit;
use crate::parser::{AstSummary, DeclarationKind};

/// Design pattern category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternCategory {
    Creational,
    Structural,
    Behavioral,
    Unknown,
}

impl PatternCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::Creational => "Creational",
            PatternCategory::Structural => "Structural",
            PatternCategory::Behavioral => "Behavioral",
            PatternCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named pattern found in the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub name: String,
    pub category: PatternCategory,
    pub confidence: f64,
    pub description: String,
}

/// The single pattern suggested for the unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedPattern {
    pub name: String,
    pub category: PatternCategory,
    pub confidence: f64,
    pub description: String,
    pub reason: String,
}

/// Class-level metrics the recognizer based its decision on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeMetrics {
    pub loc: usize,
    pub methods: usize,
    pub fields: usize,
    /// Sum of cyclomatic complexity over all functions.
    pub complexity: u32,
    /// Imports plus distinct referenced type names.
    pub coupling: usize,
}

/// Pattern recognition result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignPatterns {
    pub predicted_category: PatternCategory,
    pub confidence: f64,
    pub category_probabilities: BTreeMap<String, f64>,
    pub detected_patterns: Vec<DetectedPattern>,
    pub suggested_pattern: SuggestedPattern,
    pub code_metrics: CodeMetrics,
    pub analysis_method: String,
}

impl DesignPatterns {
    /// Result for a unit with no pattern evidence at all.
    pub fn unknown(code_metrics: CodeMetrics) -> Self {
        Self {
            predicted_category: PatternCategory::Unknown,
            confidence: 0.0,
            category_probabilities: [
                PatternCategory::Creational,
                PatternCategory::Structural,
                PatternCategory::Behavioral,
            ]
            .iter()
            .map(|c| (c.as_str().to_string(), 0.0))
            .collect(),
            detected_patterns: Vec::new(),
            suggested_pattern: fallback_suggestion(PatternCategory::Unknown),
            code_metrics,
            analysis_method: ANALYSIS_METHOD.to_string(),
        }
    }
}

const ANALYSIS_METHOD: &str = "heuristic";

/// How an indicator contributes to a pattern score.
#[derive(Debug, Clone, Copy)]
enum Contribution {
    /// Full weight when the regex matches at least once.
    Present,
    /// Full weight when the regex matches at least this many times.
    AtLeast(usize),
    /// Weight per match, capped.
    PerMatch(f64),
}

struct IndicatorSpec {
    pattern: &'static str,
    weight: f64,
    contribution: Contribution,
}

const fn present(pattern: &'static str, weight: f64) -> IndicatorSpec {
    IndicatorSpec {
        pattern,
        weight,
        contribution: Contribution::Present,
    }
}

struct PatternSpec {
    name: &'static str,
    category: PatternCategory,
    description: &'static str,
    indicators: &'static [IndicatorSpec],
}

const PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        name: "Singleton",
        category: PatternCategory::Creational,
        description: "Ensures a class has only one instance and provides global access to it",
        indicators: &[
            present(r"\bprivate\s+\w+\s*\(\s*\)|def\s+__new__\s*\(", 0.3),
            present(
                r"(?i)private\s+static\s+(readonly\s+)?\w+\s+_?instance\b|_instance\s*=\s*None|static\s+\w*\s*_?instance\s*[:=;]",
                0.3,
            ),
            present(r"(?i)\bget_?instance\s*\(|\bshared(Instance)?\s*\(", 0.4),
            present(r"class\s+\w+\s*\(.*metaclass", 0.3),
        ],
    },
    PatternSpec {
        name: "Factory",
        category: PatternCategory::Creational,
        description: "Creates objects without specifying the exact class to create",
        indicators: &[
            present(r"\b\w*Factory\b", 0.3),
            present(r"\b(create|make|build)\w*\s*\(", 0.3),
            present(r"return\s+new\s+\w+\s*\(", 0.2),
            IndicatorSpec {
                pattern: r#"\b(case|when)\s+["']?\w+["']?\s*:?"#,
                weight: 0.2,
                contribution: Contribution::AtLeast(2),
            },
        ],
    },
    PatternSpec {
        name: "Builder",
        category: PatternCategory::Creational,
        description: "Separates object construction from its representation",
        indicators: &[
            present(r"\bBuilder\b", 0.3),
            present(r"\bbuild\s*\(\s*\)", 0.3),
            present(r"return\s+(self|this)\s*;?\s*$", 0.2),
            IndicatorSpec {
                pattern: r"\b(set|with)[A-Z_]\w*\s*\(",
                weight: 0.2,
                contribution: Contribution::AtLeast(2),
            },
        ],
    },
    PatternSpec {
        name: "Observer",
        category: PatternCategory::Behavioral,
        description: "Defines a subscription mechanism to notify multiple objects about events",
        indicators: &[
            present(r"(?i)\b(observer|listener|subscriber)s?\b", 0.3),
            present(r"(?i)\b(add|remove|register|unregister|attach|detach)_?(observer|listener|subscriber)\b", 0.3),
            present(r"\b(notify\w*|update|on\w+Changed)\s*\(", 0.2),
            present(
                r"(?i)List<.*?(observer|listener)>|\b_?(observers|listeners|subscribers)\s*[:=]",
                0.2,
            ),
        ],
    },
    PatternSpec {
        name: "Strategy",
        category: PatternCategory::Behavioral,
        description: "Defines a family of algorithms and makes them interchangeable",
        indicators: &[
            present(r"\bStrategy\b", 0.4),
            present(r"interface\s+\w+\s*\{[^}]*\w+\s+\w+\s*\([^)]*\)\s*;", 0.3),
            present(r"(?i)\bset_?\w*strategy\b", 0.3),
        ],
    },
    PatternSpec {
        name: "Decorator",
        category: PatternCategory::Structural,
        description: "Attaches additional responsibilities to objects dynamically",
        indicators: &[
            present(r"\bDecorator\b", 0.4),
            IndicatorSpec {
                pattern: r"(?m)^\s*@\w+",
                weight: 0.1,
                contribution: Contribution::PerMatch(0.3),
            },
            present(
                r"def\s+__init__\s*\(\s*self\s*,\s*\w+\s*\)|public\s+\w+\s*\(\s*\w+\s+\w+\s*\)\s*\{",
                0.2,
            ),
            present(r"self\._\w+\s*=\s*\w+\s*$|this\.\w+\s*=\s*\w+\s*;", 0.2),
        ],
    },
    PatternSpec {
        name: "Adapter",
        category: PatternCategory::Structural,
        description: "Converts the interface of a class into another interface clients expect",
        indicators: &[
            present(r"\b\w*(Adapter|Wrapper)\b", 0.4),
            present(r"(?i)\b_?(adaptee|wrapped|delegate)\b", 0.3),
            present(r"implements\s+\w+|class\s+\w+\s*\(\s*[A-Z]\w*\s*\)\s*:", 0.1),
            present(r"return\s+(self\.|this\.)_?\w+\.\w+\s*\(", 0.2),
        ],
    },
    PatternSpec {
        name: "Command",
        category: PatternCategory::Behavioral,
        description: "Encapsulates a request as an object",
        indicators: &[
            present(r"\bCommand\b", 0.4),
            present(r"\bexecute\s*\(", 0.3),
            present(r"\bundo\s*\(", 0.2),
            present(r"(?i)\b(invoker|receiver)\b", 0.2),
        ],
    },
];

struct Indicator {
    regex: Regex,
    weight: f64,
    contribution: Contribution,
}

struct PatternRule {
    spec: &'static PatternSpec,
    indicators: Vec<Indicator>,
}

impl PatternRule {
    fn score(&self, code: &str) -> f64 {
        let score: f64 = self
            .indicators
            .iter()
            .map(|ind| match ind.contribution {
                Contribution::Present => {
                    if ind.regex.is_match(code) {
                        ind.weight
                    } else {
                        0.0
                    }
                }
                Contribution::AtLeast(n) => {
                    if ind.regex.find_iter(code).take(n).count() >= n {
                        ind.weight
                    } else {
                        0.0
                    }
                }
                Contribution::PerMatch(cap) => {
                    (ind.regex.find_iter(code).count() as f64 * ind.weight).min(cap)
                }
            })
            .sum();
        score.min(1.0)
    }
}

/// Heuristic design pattern recognizer.
pub struct PatternRecognizer {
    config: PatternConfig,
    rules: Vec<PatternRule>,
    type_ref: Regex,
    implements: Regex,
    interface: Regex,
}

impl Default for PatternRecognizer {
    fn default() -> Self {
        Self::new(PatternConfig::default())
    }
}

impl PatternRecognizer {
    pub fn new(config: PatternConfig) -> Self {
        let rules = PATTERNS
            .iter()
            .map(|spec| PatternRule {
                spec,
                indicators: spec
                    .indicators
                    .iter()
                    .map(|ind| Indicator {
                        regex: Regex::new(&format!("(?m){}", ind.pattern))
                            .expect("Invalid pattern indicator"),
                        weight: ind.weight,
                        contribution: ind.contribution,
                    })
                    .collect(),
            })
            .collect();

        Self {
            config,
            rules,
            type_ref: Regex::new(r"\b[A-Z][a-zA-Z0-9]*\b").expect("valid regex"),
            implements: Regex::new(r"\bimplements\s+|\bclass\s+\w+[ \t]*(\([^)]+\)|:[ \t]*\w|extends\s)")
                .expect("valid regex"),
            interface: Regex::new(r"\binterface\s+\w+|\bprotocol\s+\w+|\btrait\s+\w+|\(\s*ABC\s*\)|@abstractmethod")
                .expect("valid regex"),
        }
    }

    /// Recognize patterns in one unit.
    pub fn recognize(
        &self,
        unit: &SourceUnit,
        summary: &AstSummary,
        metrics: &FileMetrics,
    ) -> DesignPatterns {
        let code = code_only(unit.content.as_str(), &summary.comment_lines);
        let code_metrics = self.code_metrics(&code, summary, metrics);
        if code.trim().is_empty() {
            return DesignPatterns::unknown(code_metrics);
        }

        let scores: Vec<(&PatternRule, f64)> =
            self.rules.iter().map(|r| (r, r.score(&code))).collect();
        let score_of = |name: &str| {
            scores
                .iter()
                .find(|(r, _)| r.spec.name == name)
                .map_or(0.0, |(_, s)| *s)
        };

        let methods = code_metrics.methods.max(1) as f64;
        let implements_ratio = (self.implements.find_iter(&code).count() as f64 / methods * 0.5).min(1.0);
        let interface_ratio = (self.interface.find_iter(&code).count() as f64 / methods * 0.5).min(1.0);
        let coupling = (code_metrics.coupling as f64 / 20.0).min(1.0) * 0.3;

        let creational = blend(
            &[score_of("Singleton"), score_of("Factory"), score_of("Builder")],
            0.7,
        );
        let structural = blend(
            &[
                score_of("Decorator"),
                score_of("Adapter"),
                implements_ratio,
                coupling,
            ],
            0.6,
        );
        let behavioral = blend(
            &[
                score_of("Observer"),
                score_of("Strategy"),
                score_of("Command"),
                interface_ratio,
            ],
            0.6,
        );

        let raw = [
            (PatternCategory::Creational, creational),
            (PatternCategory::Structural, structural),
            (PatternCategory::Behavioral, behavioral),
        ];
        let total: f64 = raw.iter().map(|(_, s)| s).sum();
        let category_probabilities: BTreeMap<String, f64> = raw
            .iter()
            .map(|(c, s)| {
                let p = if total > 0.0 { s / total } else { 0.0 };
                (c.as_str().to_string(), round(p, 3))
            })
            .collect();

        // Ties resolve to the first category in declaration order.
        let (mut predicted, mut best) = raw[0];
        for (category, score) in &raw[1..] {
            if *score > best {
                predicted = *category;
                best = *score;
            }
        }
        let confidence = if best < self.config.min_category_signal {
            predicted = PatternCategory::Unknown;
            0.0
        } else {
            round(best / total, 3)
        };

        let mut detected_patterns: Vec<DetectedPattern> = scores
            .iter()
            .filter(|(_, s)| *s >= self.config.detection_threshold)
            .map(|(r, s)| DetectedPattern {
                name: r.spec.name.to_string(),
                category: r.spec.category,
                confidence: round(*s, 2),
                description: r.spec.description.to_string(),
            })
            .collect();
        detected_patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let suggested_pattern = match detected_patterns.first() {
            Some(top) => SuggestedPattern {
                name: top.name.clone(),
                category: top.category,
                confidence: top.confidence,
                description: top.description.clone(),
                reason: "Detected through code analysis".to_string(),
            },
            None => suggest_for_category(predicted, &code.to_lowercase(), &code_metrics),
        };

        tracing::debug!(
            "Pattern recognition for {}: {} ({} named)",
            unit.display_path(),
            predicted,
            detected_patterns.len()
        );

        DesignPatterns {
            predicted_category: predicted,
            confidence,
            category_probabilities,
            detected_patterns,
            suggested_pattern,
            code_metrics,
            analysis_method: ANALYSIS_METHOD.to_string(),
        }
    }

    fn code_metrics(&self, code: &str, summary: &AstSummary, metrics: &FileMetrics) -> CodeMetrics {
        let imports = summary.of_kind(DeclarationKind::Import).count();
        let types: BTreeSet<&str> = self.type_ref.find_iter(code).map(|m| m.as_str()).collect();
        CodeMetrics {
            loc: metrics.loc,
            methods: summary.callables().count(),
            fields: summary.of_kind(DeclarationKind::Field).count(),
            complexity: metrics.functions.iter().map(|f| f.cyclomatic).sum(),
            coupling: (imports + types.len() / 5).min(50),
        }
    }
}

/// max·w + mean·(1-w)
fn blend(indicators: &[f64], max_weight: f64) -> f64 {
    let max = indicators.iter().copied().fold(0.0, f64::max);
    let mean = indicators.iter().sum::<f64>() / indicators.len() as f64;
    max * max_weight + mean * (1.0 - max_weight)
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Content with comment-only lines blanked out, line structure kept.
fn code_only(content: &str, comment_lines: &[u32]) -> String {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if comment_lines.binary_search(&(i as u32 + 1)).is_ok() {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn suggestion(
    name: &str,
    category: PatternCategory,
    confidence: f64,
    description: &str,
    reason: &str,
) -> SuggestedPattern {
    SuggestedPattern {
        name: name.to_string(),
        category,
        confidence,
        description: description.to_string(),
        reason: reason.to_string(),
    }
}

fn fallback_suggestion(category: PatternCategory) -> SuggestedPattern {
    suggestion(
        "Unknown",
        category,
        0.0,
        "Could not determine a specific pattern",
        "Insufficient pattern indicators",
    )
}

fn suggest_for_category(
    category: PatternCategory,
    code: &str,
    metrics: &CodeMetrics,
) -> SuggestedPattern {
    use PatternCategory::*;

    const SINGLETON: &str = "Ensures a class has only one instance";
    const FACTORY: &str = "Creates objects without specifying the exact class";
    const BUILDER: &str = "Separates object construction from representation";
    const ADAPTER: &str = "Converts the interface of a class into another interface";
    const DECORATOR: &str = "Attaches additional responsibilities dynamically";
    const FACADE: &str = "Provides a simplified interface to a complex subsystem";
    const OBSERVER: &str = "Defines a subscription mechanism for event notification";
    const STRATEGY: &str = "Defines a family of interchangeable algorithms";
    const COMMAND: &str = "Encapsulates a request as an object";
    const STATE: &str = "Lets an object alter its behavior when its state changes";

    let has = |needle: &str| code.contains(needle);
    match category {
        Creational => {
            if has("instance") && has("static") {
                suggestion("Singleton", category, 0.6, SINGLETON, "Static instance field detected")
            } else if has("create") || has("factory") || has("make") {
                suggestion("Factory", category, 0.5, FACTORY, "Object creation methods detected")
            } else if has("builder") || (has("set") && (has("return this") || has("return self"))) {
                suggestion("Builder", category, 0.5, BUILDER, "Fluent builder methods detected")
            } else {
                suggestion("Factory", category, 0.4, FACTORY, "Default suggestion for Creational category")
            }
        }
        Structural => {
            if has("adapter") || has("wrapper") {
                suggestion("Adapter", category, 0.6, ADAPTER, "Adapter or wrapper detected")
            } else if has("decorator") || (has("component") && has("wrapped")) {
                suggestion("Decorator", category, 0.5, DECORATOR, "Decorator indicators detected")
            } else if metrics.methods > 5 && metrics.coupling > 3 {
                suggestion("Facade", category, 0.5, FACADE, "High coupling suggests a facade")
            } else {
                suggestion("Facade", category, 0.4, FACADE, "Default suggestion for Structural category")
            }
        }
        Behavioral => {
            if has("observer") || has("listener") || has("subscribe") {
                suggestion("Observer", category, 0.6, OBSERVER, "Observer or listener detected")
            } else if has("strategy") || has("algorithm") {
                suggestion("Strategy", category, 0.5, STRATEGY, "Strategy indicators detected")
            } else if has("command") || has("execute") {
                suggestion("Command", category, 0.5, COMMAND, "Command or execute method detected")
            } else if has("state") && metrics.methods > 3 {
                suggestion("State", category, 0.5, STATE, "State management detected")
            } else {
                suggestion("Strategy", category, 0.4, STRATEGY, "Default suggestion for Behavioral category")
            }
        }
        Unknown => fallback_suggestion(Unknown),
    }
}
