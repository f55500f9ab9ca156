//! Code smell detection.
//!
//! Detects maintainability anti-patterns in a single source unit:
//! - Long methods, high complexity, deep nesting and long parameter lists
//! - God classes (too many methods or fields)
//! - Structural duplicates between function bodies
//! - Magic numbers, complex conditions, unused imports and oversized files
//!
//! Rules are pure functions of the AST summary and extracted metrics. Each rule
//! declares fixed threshold bands taken from [`SmellConfig`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::metrics::FileMetrics;
use crate::config::SmellConfig;
use crate::core::{Language, SourceUnit};
use crate::parser::{AstSummary, Declaration, DeclarationKind};

/// Kind of code smell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmellType {
    LongMethod,
    HighComplexity,
    GodClass,
    DuplicateCode,
    MagicNumber,
    DeepNesting,
    MissingDocumentation,
    LongParameterList,
    ComplexCondition,
    LargeFile,
    UnusedImport,
    SyntaxError,
}

impl SmellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmellType::LongMethod => "long_method",
            SmellType::HighComplexity => "high_complexity",
            SmellType::GodClass => "god_class",
            SmellType::DuplicateCode => "duplicate_code",
            SmellType::MagicNumber => "magic_number",
            SmellType::DeepNesting => "deep_nesting",
            SmellType::MissingDocumentation => "missing_documentation",
            SmellType::LongParameterList => "long_parameter_list",
            SmellType::ComplexCondition => "complex_condition",
            SmellType::LargeFile => "large_file",
            SmellType::UnusedImport => "unused_import",
            SmellType::SyntaxError => "syntax_error",
        }
    }
}

impl fmt::Display for SmellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smell severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected code smell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Smell {
    #[serde(rename = "type")]
    pub smell_type: SmellType,
    pub severity: Severity,
    /// 1-based line the finding is anchored to.
    pub line: u32,
    pub description: String,
    pub suggestion: String,
}

impl Smell {
    fn new(
        smell_type: SmellType,
        severity: Severity,
        line: u32,
        description: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            smell_type,
            severity,
            line,
            description: description.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Smells in detection order with their aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmellReport {
    pub total_smells: usize,
    /// Count per severity. All four keys are always present.
    pub by_severity: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub smells: Vec<Smell>,
}

impl SmellReport {
    pub fn from_smells(smells: Vec<Smell>) -> Self {
        let mut by_severity: BTreeMap<String, usize> = Severity::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        for smell in &smells {
            *by_severity
                .entry(smell.severity.as_str().to_string())
                .or_default() += 1;
            *by_type
                .entry(smell.smell_type.as_str().to_string())
                .or_default() += 1;
        }
        Self {
            total_smells: smells.len(),
            by_severity,
            by_type,
            smells,
        }
    }

    pub fn count(&self, smell_type: SmellType) -> usize {
        self.by_type.get(smell_type.as_str()).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.smells.is_empty()
    }
}

/// Read-only inputs shared by every rule.
pub struct RuleContext<'a> {
    pub unit: &'a SourceUnit,
    pub summary: &'a AstSummary,
    pub metrics: &'a FileMetrics,
    pub config: &'a SmellConfig,
}

/// A rule evaluated once per declaration.
pub trait DeclarationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, index: usize, decl: &Declaration, ctx: &RuleContext<'_>) -> Option<Smell>;
}

/// A rule evaluated once per file.
pub trait FileRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Smell>;
}

/// Map a value onto a medium/high threshold band.
fn band(value: u64, warn: u64, error: u64) -> Option<Severity> {
    if value > error {
        Some(Severity::High)
    } else if value > warn {
        Some(Severity::Medium)
    } else {
        None
    }
}

struct LongMethod;

impl DeclarationRule for LongMethod {
    fn name(&self) -> &'static str {
        "long_method"
    }

    fn check(&self, _index: usize, decl: &Declaration, ctx: &RuleContext<'_>) -> Option<Smell> {
        if !decl.is_callable() {
            return None;
        }
        let lines = decl.line_span();
        let severity = band(
            lines.into(),
            ctx.config.long_method_warn.into(),
            ctx.config.long_method_error.into(),
        )?;
        Some(Smell::new(
            SmellType::LongMethod,
            severity,
            decl.start_line,
            format!("Function '{}' is {} lines long", decl.name, lines),
            "Consider breaking this function into smaller, more focused functions",
        ))
    }
}

struct HighComplexity;

impl DeclarationRule for HighComplexity {
    fn name(&self) -> &'static str {
        "high_complexity"
    }

    fn check(&self, index: usize, decl: &Declaration, ctx: &RuleContext<'_>) -> Option<Smell> {
        let function = ctx.metrics.function(index)?;
        let severity = band(
            function.cyclomatic.into(),
            ctx.config.cyclomatic_warn.into(),
            ctx.config.cyclomatic_error.into(),
        )?;
        Some(Smell::new(
            SmellType::HighComplexity,
            severity,
            decl.start_line,
            format!(
                "Function '{}' has cyclomatic complexity {}",
                decl.name, function.cyclomatic
            ),
            "Reduce branching by extracting helper functions or using lookup tables",
        ))
    }
}

struct DeepNesting;

impl DeclarationRule for DeepNesting {
    fn name(&self) -> &'static str {
        "deep_nesting"
    }

    fn check(&self, index: usize, decl: &Declaration, ctx: &RuleContext<'_>) -> Option<Smell> {
        let function = ctx.metrics.function(index)?;
        let severity = band(
            function.max_nesting.into(),
            ctx.config.nesting_warn.into(),
            ctx.config.nesting_error.into(),
        )?;
        Some(Smell::new(
            SmellType::DeepNesting,
            severity,
            decl.start_line,
            format!(
                "Code block in '{}' has {} levels of nesting",
                decl.name, function.max_nesting
            ),
            "Consider extracting methods or using early returns to reduce nesting",
        ))
    }
}

struct LongParameterList;

impl DeclarationRule for LongParameterList {
    fn name(&self) -> &'static str {
        "long_parameter_list"
    }

    fn check(&self, _index: usize, decl: &Declaration, ctx: &RuleContext<'_>) -> Option<Smell> {
        if !decl.is_callable() {
            return None;
        }
        let severity = band(
            decl.parameters.into(),
            ctx.config.parameters_warn.into(),
            ctx.config.parameters_error.into(),
        )?;
        Some(Smell::new(
            SmellType::LongParameterList,
            severity,
            decl.start_line,
            format!("Function '{}' has {} parameters", decl.name, decl.parameters),
            "Consider using a data structure or object to group related parameters",
        ))
    }
}

struct GodClass;

impl DeclarationRule for GodClass {
    fn name(&self) -> &'static str {
        "god_class"
    }

    fn check(&self, index: usize, decl: &Declaration, ctx: &RuleContext<'_>) -> Option<Smell> {
        if decl.kind != DeclarationKind::Class {
            return None;
        }
        let methods = ctx.summary.member_count(index, DeclarationKind::Method);
        let fields = ctx.summary.member_count(index, DeclarationKind::Field);
        let config = ctx.config;

        let severity = if methods > config.god_class_methods_error
            || fields > config.god_class_fields_error
        {
            Severity::Critical
        } else if methods > config.god_class_methods_warn || fields > config.god_class_fields_warn
        {
            Severity::High
        } else {
            return None;
        };
        Some(Smell::new(
            SmellType::GodClass,
            severity,
            decl.start_line,
            format!(
                "Class '{}' has {} methods and {} fields",
                decl.name, methods, fields
            ),
            "Consider splitting this class into smaller, single-responsibility classes",
        ))
    }
}

struct DuplicateCode;

impl DeclarationRule for DuplicateCode {
    fn name(&self) -> &'static str {
        "duplicate_code"
    }

    fn check(&self, index: usize, decl: &Declaration, ctx: &RuleContext<'_>) -> Option<Smell> {
        let min_tokens = ctx.config.duplicate_min_tokens;
        let shape = ctx
            .metrics
            .function(index)?
            .shape
            .as_ref()
            .filter(|s| s.tokens >= min_tokens)?;

        let original = ctx
            .metrics
            .functions
            .iter()
            .take_while(|f| f.declaration < index)
            .find(|f| {
                f.shape.as_ref().is_some_and(|other| {
                    other.tokens >= min_tokens
                        && shape.is_clone_of(other, ctx.config.duplicate_similarity)
                })
            })?;

        Some(Smell::new(
            SmellType::DuplicateCode,
            Severity::Medium,
            decl.start_line,
            format!(
                "Functions '{}' and '{}' appear to be similar",
                original.name, decl.name
            ),
            "Consider extracting common functionality into a shared function",
        ))
    }
}

struct MissingDocumentation;

impl DeclarationRule for MissingDocumentation {
    fn name(&self) -> &'static str {
        "missing_documentation"
    }

    fn check(&self, _index: usize, decl: &Declaration, ctx: &RuleContext<'_>) -> Option<Smell> {
        let documentable = decl.is_callable() || decl.kind == DeclarationKind::Class;
        if !documentable
            || decl.documented
            || decl.name.starts_with('<')
            || decl.line_span() < ctx.config.documented_min_lines
        {
            return None;
        }
        let what = if decl.kind == DeclarationKind::Class {
            "Class"
        } else {
            "Function"
        };
        Some(Smell::new(
            SmellType::MissingDocumentation,
            Severity::Low,
            decl.start_line,
            format!("{what} '{}' has no documentation", decl.name),
            "Add a doc comment describing purpose, parameters and return value",
        ))
    }
}

struct SyntaxError;

impl FileRule for SyntaxError {
    fn name(&self) -> &'static str {
        "syntax_error"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Smell> {
        let Some(first) = ctx.summary.error_lines.first() else {
            return Vec::new();
        };
        let count = ctx.summary.error_lines.len();
        vec![Smell::new(
            SmellType::SyntaxError,
            Severity::Critical,
            *first,
            format!(
                "Syntax errors on {} line{}; results are based on a partial parse",
                count,
                if count == 1 { "" } else { "s" }
            ),
            "Fix the syntax errors so the file can be fully analyzed",
        )]
    }
}

struct LargeFile;

impl FileRule for LargeFile {
    fn name(&self) -> &'static str {
        "large_file"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Smell> {
        let lines = ctx.metrics.total_lines;
        let Some(severity) = band(
            lines as u64,
            ctx.config.large_file_warn as u64,
            ctx.config.large_file_error as u64,
        ) else {
            return Vec::new();
        };
        vec![Smell::new(
            SmellType::LargeFile,
            severity,
            1,
            format!("File has {lines} lines"),
            "Consider splitting this file into smaller, more focused files",
        )]
    }
}

struct ComplexCondition;

impl FileRule for ComplexCondition {
    fn name(&self) -> &'static str {
        "complex_condition"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Smell> {
        ctx.metrics
            .conditions
            .iter()
            .filter_map(|c| {
                let severity = band(
                    c.operators.into(),
                    ctx.config.condition_warn.into(),
                    ctx.config.condition_error.into(),
                )?;
                Some(Smell::new(
                    SmellType::ComplexCondition,
                    severity,
                    c.line,
                    format!("Complex condition with {} operators", c.operators),
                    "Consider extracting the condition into a well-named boolean method",
                ))
            })
            .collect()
    }
}

struct MagicNumber;

impl FileRule for MagicNumber {
    fn name(&self) -> &'static str {
        "magic_number"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Smell> {
        ctx.summary
            .numeric_literals
            .iter()
            .filter(|n| !n.in_constant && n.value.abs() > ctx.config.magic_number_min)
            .take(ctx.config.max_magic_numbers)
            .map(|n| {
                Smell::new(
                    SmellType::MagicNumber,
                    Severity::Low,
                    n.line,
                    format!("Magic number '{}' found", n.text),
                    "Consider using a named constant to explain the meaning of this value",
                )
            })
            .collect()
    }
}

struct UnusedImport;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").expect("valid regex"));

impl FileRule for UnusedImport {
    fn name(&self) -> &'static str {
        "unused_import"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Smell> {
        let language = ctx.unit.language;
        let imports: Vec<&Declaration> = ctx.summary.of_kind(DeclarationKind::Import).collect();
        if imports.is_empty() || import_bindings(language, "").is_none() {
            return Vec::new();
        }

        let mut excluded: HashSet<u32> = ctx.summary.comment_lines.iter().copied().collect();
        for import in &imports {
            excluded.extend(import.start_line..=import.end_line);
        }
        let used: HashSet<&str> = ctx
            .unit
            .content
            .lines()
            .enumerate()
            .filter(|(i, _)| !excluded.contains(&(*i as u32 + 1)))
            .flat_map(|(_, line)| IDENTIFIER.find_iter(line).map(|m| m.as_str()))
            .collect();

        let mut smells = Vec::new();
        for import in imports {
            for binding in import_bindings(language, &import.name).unwrap_or_default() {
                if !used.contains(binding.as_str()) {
                    smells.push(Smell::new(
                        SmellType::UnusedImport,
                        Severity::Low,
                        import.start_line,
                        format!("Unused import '{binding}'"),
                        "Remove unused imports to keep dependencies explicit",
                    ));
                }
            }
        }
        smells
    }
}

/// Names an import statement binds in the file's scope.
///
/// `None` for languages whose import semantics are not tracked.
fn import_bindings(language: Language, statement: &str) -> Option<Vec<String>> {
    let bindings = match language {
        Language::Python => python_bindings(statement),
        Language::Java => java_bindings(statement),
        Language::JavaScript | Language::Jsx | Language::TypeScript | Language::Tsx => {
            js_bindings(statement)
        }
        _ => return None,
    };
    Some(
        bindings
            .into_iter()
            .filter(|b| !b.is_empty() && IDENTIFIER.is_match(b))
            .collect(),
    )
}

fn alias_or_name(item: &str) -> String {
    let item = item.trim();
    match item.split_once(" as ") {
        Some((_, alias)) => alias.trim().to_string(),
        None => item.to_string(),
    }
}

fn python_bindings(statement: &str) -> Vec<String> {
    if let Some(rest) = statement.strip_prefix("from ") {
        let Some((_, names)) = rest.split_once(" import ") else {
            return Vec::new();
        };
        let names = names.trim().trim_start_matches('(').trim_end_matches(')');
        return names
            .split(',')
            .filter(|n| n.trim() != "*" && !n.trim().is_empty())
            .map(alias_or_name)
            .collect();
    }
    let Some(rest) = statement.strip_prefix("import ") else {
        return Vec::new();
    };
    rest.split(',')
        .map(|item| {
            let item = item.trim();
            match item.split_once(" as ") {
                Some((_, alias)) => alias.trim().to_string(),
                None => item.split('.').next().unwrap_or(item).to_string(),
            }
        })
        .collect()
}

fn java_bindings(statement: &str) -> Vec<String> {
    let Some(rest) = statement.strip_prefix("import ") else {
        return Vec::new();
    };
    let path = rest.trim_start_matches("static ").trim();
    if path.ends_with(".*") {
        return Vec::new();
    }
    path.rsplit('.').next().map(str::to_string).into_iter().collect()
}

fn js_bindings(statement: &str) -> Vec<String> {
    let Some(rest) = statement.strip_prefix("import ") else {
        return Vec::new();
    };
    let rest = rest.strip_prefix("type ").unwrap_or(rest);
    // Side-effect imports bind nothing.
    let Some(clause) = rest.rsplit_once(" from ").map(|(c, _)| c.trim()) else {
        return Vec::new();
    };

    let mut bindings = Vec::new();
    let (outside, named) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (
            format!("{}{}", &clause[..open], &clause[close + 1..]),
            Some(&clause[open + 1..close]),
        ),
        _ => (clause.to_string(), None),
    };

    for part in outside.split(',') {
        let part = part.trim();
        if let Some(ns) = part.strip_prefix("* as ") {
            bindings.push(ns.trim().to_string());
        } else if !part.is_empty() {
            bindings.push(part.to_string());
        }
    }
    if let Some(named) = named {
        bindings.extend(
            named
                .split(',')
                .map(|n| n.trim().trim_start_matches("type ").to_string())
                .filter(|n| !n.is_empty())
                .map(|n| alias_or_name(&n)),
        );
    }
    bindings
}

/// Rule engine over one source unit.
pub struct SmellDetector {
    config: SmellConfig,
    declaration_rules: Vec<Box<dyn DeclarationRule>>,
    file_rules: Vec<Box<dyn FileRule>>,
}

impl Default for SmellDetector {
    fn default() -> Self {
        Self::new(SmellConfig::default())
    }
}

impl SmellDetector {
    pub fn new(config: SmellConfig) -> Self {
        Self {
            config,
            declaration_rules: vec![
                Box::new(LongMethod),
                Box::new(HighComplexity),
                Box::new(DeepNesting),
                Box::new(LongParameterList),
                Box::new(GodClass),
                Box::new(DuplicateCode),
                Box::new(MissingDocumentation),
            ],
            file_rules: vec![
                Box::new(LargeFile),
                Box::new(ComplexCondition),
                Box::new(MagicNumber),
                Box::new(UnusedImport),
            ],
        }
    }

    pub fn config(&self) -> &SmellConfig {
        &self.config
    }

    /// Names of all active rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        std::iter::once(SyntaxError.name())
            .chain(self.declaration_rules.iter().map(|r| r.name()))
            .chain(self.file_rules.iter().map(|r| r.name()))
            .collect()
    }

    /// Run every rule. Findings keep evaluation order: syntax errors first,
    /// then declarations in source order, then file-level rules.
    pub fn detect(
        &self,
        unit: &SourceUnit,
        summary: &AstSummary,
        metrics: &FileMetrics,
    ) -> SmellReport {
        let ctx = RuleContext {
            unit,
            summary,
            metrics,
            config: &self.config,
        };

        let mut smells = SyntaxError.check(&ctx);
        for (index, decl) in summary.declarations.iter().enumerate() {
            smells.extend(
                self.declaration_rules
                    .iter()
                    .filter_map(|rule| rule.check(index, decl, &ctx)),
            );
        }
        for rule in &self.file_rules {
            smells.extend(rule.check(&ctx));
        }

        tracing::debug!(
            "Detected {} smells in {}",
            smells.len(),
            unit.display_path()
        );
        SmellReport::from_smells(smells)
    }
}
