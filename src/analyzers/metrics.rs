//! Metric extraction: cyclomatic and cognitive complexity, nesting, and
//! line-level readability facts.
//!
//! # Overview
//!
//! - **Cyclomatic Complexity**: Counts the number of linearly independent paths through code.
//!   Based on McCabe (1976) "A Complexity Measure", IEEE TSE SE-2(4).
//!
//! - **Cognitive Complexity**: Measures how hard code is to understand, with penalties
//!   for nesting. Based on SonarSource's methodology.
//!   Reference: https://www.sonarsource.com/docs/CognitiveComplexity.pdf
//!
//! All walks use iterative cursor traversal, so deeply nested input cannot
//! exhaust the stack.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_sitter::Node;
use unicode_width::UnicodeWidthStr;

use super::duplicates::BodyShape;
use super::prediction::{extract_features, ComplexityFeatures};
use crate::parser::grammar::{is_binary_like, is_logical_operator, GrammarSpec};
use crate::parser::{end_row, line_of, AstSummary, Declaration, DeclarationKind, ParsedSource};

/// Complexity metrics for one function or method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetrics {
    /// Index of the declaration in [`AstSummary::declarations`].
    pub declaration: usize,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Cyclomatic complexity, always at least 1.
    pub cyclomatic: u32,
    pub cognitive: u32,
    pub max_nesting: u32,
    pub lines: u32,
    pub parameters: u32,
    /// Most boolean operators in a single condition.
    pub max_condition_operators: u32,
    /// Token shape of the body, for clone detection.
    #[serde(skip)]
    pub shape: Option<BodyShape>,
}

/// A boolean condition and its operator count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub line: u32,
    pub operators: u32,
}

/// File-level metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub total_lines: usize,
    /// Non-blank, non-comment lines.
    pub loc: usize,
    pub comment_lines: usize,
    pub blank_lines: usize,
    pub comment_ratio: f64,
    pub function_count: usize,
    pub class_count: usize,
    pub avg_function_length: f64,
    pub avg_cyclomatic: f64,
    pub max_cyclomatic: u32,
    /// Cyclomatic complexity of the whole unit, including top-level code.
    pub module_cyclomatic: u32,
    pub max_nesting: u32,
    pub long_lines: usize,
    pub max_line_length: usize,
    pub indentation_issues: usize,
    pub spacing_issues: usize,
    pub naming_issues: usize,
    pub documentable: usize,
    pub documented: usize,
    /// documented / documentable, when anything is documentable.
    pub doc_coverage: Option<f64>,
    pub max_condition_operators: u32,
    #[serde(skip)]
    pub conditions: Vec<Condition>,
    pub functions: Vec<FunctionMetrics>,
    #[serde(skip)]
    pub features: ComplexityFeatures,
}

impl FileMetrics {
    /// Metrics for the callable declaration at `index`.
    pub fn function(&self, declaration: usize) -> Option<&FunctionMetrics> {
        self.functions
            .binary_search_by_key(&declaration, |f| f.declaration)
            .ok()
            .map(|i| &self.functions[i])
    }

    /// Functions with a body that could be measured.
    pub fn body_count(&self) -> usize {
        self.functions.iter().filter(|f| f.shape.is_some()).count()
    }
}

/// Metric extraction options.
#[derive(Debug, Clone, Copy)]
pub struct MetricOptions {
    /// Lines wider than this many columns count as long.
    pub long_line_length: usize,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            long_line_length: 120,
        }
    }
}

/// Compute all metrics for a parsed unit.
pub fn extract(
    parsed: &ParsedSource<'_>,
    summary: &AstSummary,
    options: MetricOptions,
) -> FileMetrics {
    let spec = parsed.spec;
    let source = parsed.unit.bytes();
    let root = parsed.root_node();
    let line_count = parsed.line_count();

    let function_nodes = index_function_nodes(parsed);
    let conditions = collect_conditions(&root, source, line_count);

    let mut functions = Vec::new();
    let mut named_bodies: Vec<(&str, Node<'_>)> = Vec::new();
    for (index, decl) in summary.declarations.iter().enumerate() {
        if !decl.is_callable() {
            continue;
        }
        let node = function_nodes.get(&decl.start_byte).copied();
        if let Some(node) = node {
            named_bodies.push((decl.name.as_str(), node));
        }
        functions.push(analyze_function(index, decl, node, spec, source, &conditions));
    }

    let mut metrics = line_metrics(parsed.unit.content.as_str(), summary, options);
    metrics.function_count = functions.len();
    metrics.class_count = summary.of_kind(DeclarationKind::Class).count();
    metrics.module_cyclomatic = 1 + count_decision_points(&root, source, spec);
    metrics.max_nesting = calculate_max_nesting(&root, spec, 0);

    if !functions.is_empty() {
        let count = functions.len() as f64;
        metrics.avg_function_length =
            functions.iter().map(|f| f64::from(f.lines)).sum::<f64>() / count;
        metrics.avg_cyclomatic =
            functions.iter().map(|f| f64::from(f.cyclomatic)).sum::<f64>() / count;
        metrics.max_cyclomatic = functions.iter().map(|f| f.cyclomatic).max().unwrap_or(1);
    } else {
        metrics.avg_cyclomatic = f64::from(metrics.module_cyclomatic);
        metrics.max_cyclomatic = metrics.module_cyclomatic;
    }

    metrics.documentable = summary.documentable().count();
    metrics.documented = summary.documentable().filter(|d| d.documented).count();
    metrics.doc_coverage = (metrics.documentable > 0)
        .then(|| metrics.documented as f64 / metrics.documentable as f64);

    metrics.max_condition_operators = conditions.iter().map(|c| c.operators).max().unwrap_or(0);
    metrics.features = extract_features(parsed, summary, &named_bodies);
    metrics.conditions = conditions;
    metrics.functions = functions;
    metrics
}

/// Map start byte to function nodes, matching the declarations' `start_byte`.
fn index_function_nodes<'t>(parsed: &'t ParsedSource<'_>) -> HashMap<usize, Node<'t>> {
    let spec = parsed.spec;
    let mut nodes = HashMap::new();
    let mut stack = vec![parsed.root_node()];
    while let Some(node) = stack.pop() {
        if node.is_named() && (spec.is_function(node.kind()) || spec.is_anonymous_function(node.kind()))
        {
            nodes.entry(node.start_byte()).or_insert(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    nodes
}

fn analyze_function(
    index: usize,
    decl: &Declaration,
    node: Option<Node<'_>>,
    spec: &GrammarSpec,
    source: &[u8],
    conditions: &[Condition],
) -> FunctionMetrics {
    let body = node.and_then(|n| n.child_by_field_name("body"));
    let (cyclomatic, cognitive, max_nesting) = match node {
        Some(node) => {
            let target = body.unwrap_or(node);
            (
                1 + count_decision_points(&target, source, spec),
                calculate_cognitive_complexity(&target, source, spec, 0),
                calculate_max_nesting(&target, spec, 0),
            )
        }
        None => (1, 0, 0),
    };

    let max_condition_operators = conditions
        .iter()
        .filter(|c| c.line >= decl.start_line && c.line <= decl.end_line)
        .map(|c| c.operators)
        .max()
        .unwrap_or(0);

    FunctionMetrics {
        declaration: index,
        name: decl.name.clone(),
        start_line: decl.start_line,
        end_line: decl.end_line,
        cyclomatic,
        cognitive,
        max_nesting,
        lines: decl.line_span(),
        parameters: decl.parameters,
        max_condition_operators,
        shape: body.map(|b| BodyShape::of(&b, spec)),
    }
}

/// Count decision points for cyclomatic complexity.
fn count_decision_points(node: &Node<'_>, source: &[u8], spec: &GrammarSpec) -> u32 {
    let mut count = 0;
    let mut cursor = node.walk();

    loop {
        let current = cursor.node();
        let kind = current.kind();

        if current.is_named() && spec.decision_kinds.contains(&kind) {
            count += 1;
        }

        // Logical operators are additional decision points
        if is_binary_like(kind) && get_operator(&current, source).is_some() {
            count += 1;
        }

        if cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return count;
            }
        }
    }
}

/// Calculate cognitive complexity with nesting penalties.
///
/// Per the SonarSource Cognitive Complexity whitepaper:
/// - Nesting constructs (if, for, while, etc.) add +1 plus nesting depth
/// - Flat constructs (else, elif, break, continue) add +1 only (no nesting penalty)
/// - Logical operators (&&, ||, and, or) add +1 each (no nesting penalty)
fn calculate_cognitive_complexity(
    node: &Node<'_>,
    source: &[u8],
    spec: &GrammarSpec,
    initial_depth: u32,
) -> u32 {
    let mut complexity = 0;
    let mut cursor = node.walk();
    let start_depth = cursor.depth();

    let mut depth_at_level: Vec<u32> = vec![initial_depth; 64];

    loop {
        let current = cursor.node();
        let kind = current.kind();
        let level = (cursor.depth() - start_depth) as usize;

        if level + 1 >= depth_at_level.len() {
            depth_at_level.resize(level + 16, initial_depth);
        }
        let current_depth = depth_at_level[level];

        let child_depth = if current.is_named() && spec.is_nesting(kind) {
            complexity += 1 + current_depth;
            current_depth + 1
        } else if current.is_named() && spec.flat_kinds.contains(&kind) {
            complexity += 1;
            current_depth
        } else {
            if is_binary_like(kind) && get_operator(&current, source).is_some() {
                complexity += 1;
            }
            current_depth
        };
        depth_at_level[level + 1] = child_depth;

        if cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() || cursor.depth() < start_depth {
                return complexity;
            }
        }
    }
}

/// Calculate maximum nesting depth.
fn calculate_max_nesting(node: &Node<'_>, spec: &GrammarSpec, initial_depth: u32) -> u32 {
    let mut max_depth = initial_depth;
    let mut cursor = node.walk();
    let start_depth = cursor.depth();

    let mut depth_at_level: Vec<u32> = vec![initial_depth; 64];

    loop {
        let current = cursor.node();
        let level = (cursor.depth() - start_depth) as usize;

        if level + 1 >= depth_at_level.len() {
            depth_at_level.resize(level + 16, initial_depth);
        }
        let current_depth = depth_at_level[level];
        max_depth = max_depth.max(current_depth);

        depth_at_level[level + 1] = if current.is_named() && spec.is_nesting(current.kind()) {
            current_depth + 1
        } else {
            current_depth
        };

        if cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() || cursor.depth() < start_depth {
                return max_depth;
            }
        }
    }
}

/// Get the logical operator of a binary expression, if it has one.
fn get_operator<'a>(node: &Node<'a>, source: &'a [u8]) -> Option<&'a str> {
    if let Some(op) = node.child_by_field_name("operator") {
        let text = op.utf8_text(source).ok()?;
        return is_logical_operator(text).then_some(text);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = child.kind();
        if is_logical_operator(kind) {
            return Some(kind);
        }
    }
    None
}

/// Find condition roots (outermost logical expressions) and count their operators.
fn collect_conditions(root: &Node<'_>, source: &[u8], line_count: u32) -> Vec<Condition> {
    let mut conditions = Vec::new();
    let mut stack = vec![(*root, false)];
    while let Some((node, inside_condition)) = stack.pop() {
        let logical = is_binary_like(node.kind()) && get_operator(&node, source).is_some();
        let transparent = matches!(
            node.kind(),
            "parenthesized_expression" | "not_operator" | "unary_expression" | "unary"
        );

        if logical && !inside_condition {
            conditions.push(Condition {
                line: line_of(node.start_position().row, line_count),
                operators: count_logical_operators(&node, source),
            });
        }

        // Children stay inside the condition until a non-logical node intervenes.
        let child_inside = logical || (inside_condition && transparent);
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push((child, child_inside));
        }
    }
    conditions.sort_by_key(|c| c.line);
    conditions
}

fn count_logical_operators(node: &Node<'_>, source: &[u8]) -> u32 {
    let mut count = 0;
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        let kind = current.kind();
        let logical = is_binary_like(kind) && get_operator(&current, source).is_some();
        let transparent = matches!(
            kind,
            "parenthesized_expression" | "not_operator" | "unary_expression" | "unary"
        );
        if logical {
            count += 1;
        }
        if logical || transparent {
            let mut cursor = current.walk();
            stack.extend(current.named_children(&mut cursor));
        }
    }
    count
}

static SINGLE_LETTER_ASSIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w.$])[a-z]\s*=[^=>]").expect("valid regex"));

static TIGHT_OPERATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9_)][=+\-*/%][a-zA-Z0-9_(]").expect("valid regex"));

static LOOP_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(for|foreach|while)\b").expect("valid regex"));

/// Line-oriented metrics that need no tree.
fn line_metrics(content: &str, summary: &AstSummary, options: MetricOptions) -> FileMetrics {
    let lines: Vec<&str> = content.lines().collect();
    let is_comment = |i: usize| summary.comment_lines.binary_search(&(i as u32 + 1)).is_ok();
    let import_spans: Vec<(u32, u32)> = summary
        .of_kind(DeclarationKind::Import)
        .map(|d| (d.start_line, d.end_line))
        .collect();
    let is_import = |i: usize| {
        let line = i as u32 + 1;
        import_spans.iter().any(|(s, e)| *s <= line && line <= *e)
    };

    let mut metrics = FileMetrics {
        total_lines: lines.len(),
        ..Default::default()
    };

    let mut tab_indented = false;
    let mut space_indented = false;
    let mut odd_indents = 0usize;
    let mut indented = 0usize;

    for (i, line) in lines.iter().enumerate() {
        let width = UnicodeWidthStr::width(*line);
        metrics.max_line_length = metrics.max_line_length.max(width);
        if width > options.long_line_length {
            metrics.long_lines += 1;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            metrics.blank_lines += 1;
            continue;
        }
        if is_comment(i) {
            metrics.comment_lines += 1;
            continue;
        }

        let indent: &str = &line[..line.len() - line.trim_start().len()];
        if !indent.is_empty() {
            indented += 1;
            if indent.contains('\t') {
                tab_indented = true;
            }
            if indent.starts_with(' ') {
                space_indented = true;
                let spaces = indent.chars().take_while(|c| *c == ' ').count();
                if spaces % 2 == 1 {
                    odd_indents += 1;
                }
            }
        }

        if is_import(i) {
            continue;
        }
        if SINGLE_LETTER_ASSIGN.is_match(trimmed) {
            let window = &lines[i.saturating_sub(2)..=i];
            if !window.iter().any(|l| LOOP_HEADER.is_match(l)) {
                metrics.naming_issues += 1;
            }
        }
        if TIGHT_OPERATOR.is_match(trimmed) && !trimmed.contains("//") && !trimmed.contains("->") {
            metrics.spacing_issues += 1;
        }
        if trimmed.contains("  ") && !trimmed.contains('"') && !trimmed.contains('\'') {
            metrics.spacing_issues += 1;
        }
    }

    if tab_indented && space_indented {
        metrics.indentation_issues += 1;
    }
    if indented > 0 && odd_indents * 10 > indented {
        metrics.indentation_issues += 1;
    }

    metrics.loc = metrics
        .total_lines
        .saturating_sub(metrics.blank_lines + metrics.comment_lines);
    if metrics.total_lines > 0 {
        metrics.comment_ratio = metrics.comment_lines as f64 / metrics.total_lines as f64;
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Language, SourceUnit};
    use crate::parser::{extract_declarations, parse_unit};
    use std::time::Duration;

    fn metrics_of(code: &str, lang: Language) -> FileMetrics {
        let unit = SourceUnit::with_language(None, lang, code.to_string());
        let parsed = parse_unit(&unit, Duration::from_secs(5)).unwrap();
        let summary = extract_declarations(&parsed);
        extract(&parsed, &summary, MetricOptions::default())
    }

    #[test]
    fn test_flat_function_has_cyclomatic_one() {
        let body: String = (0..9).map(|i| format!("    x{i} = {i}\n")).collect();
        let code = format!("def flat():\n{body}");
        let metrics = metrics_of(&code, Language::Python);
        assert_eq!(metrics.functions.len(), 1);
        let f = &metrics.functions[0];
        assert_eq!(f.lines, 10);
        assert_eq!(f.cyclomatic, 1);
        assert_eq!(f.cognitive, 0);
        assert_eq!(f.max_nesting, 0);
    }

    #[test]
    fn test_branches_and_logical_operators() {
        let code = r#"
function check(a, b) {
    if (a && b) {
        return 1;
    } else if (a || b) {
        return 2;
    }
    for (let i = 0; i < 3; i++) {
        while (a) {
            a--;
        }
    }
    return 0;
}
"#;
        let metrics = metrics_of(code, Language::JavaScript);
        let f = &metrics.functions[0];
        // 1 + if + if + for + while + && + ||
        assert_eq!(f.cyclomatic, 7);
        assert_eq!(f.max_nesting, 2);
        assert!(f.cognitive >= 6);
    }

    #[test]
    fn test_python_boolean_operators() {
        let code = "def f(a, b, c):\n    if a and b or c:\n        return 1\n    return 0\n";
        let metrics = metrics_of(code, Language::Python);
        let f = &metrics.functions[0];
        assert_eq!(f.cyclomatic, 4);
        assert_eq!(f.max_condition_operators, 2);
    }

    #[test]
    fn test_condition_operator_count_spans_parentheses() {
        let code = "int f(int a, int b, int c, int d, int e) {\n  if ((a && b) || (c && d) || e) {\n    return 1;\n  }\n  return 0;\n}\n";
        let metrics = metrics_of(code, Language::C);
        assert_eq!(metrics.max_condition_operators, 4);
        assert_eq!(metrics.conditions.len(), 1);
        assert_eq!(metrics.conditions[0].line, 2);
    }

    #[test]
    fn test_line_counts() {
        let code = "# comment\n\nimport os\n\n\ndef f():\n    \"\"\"Doc.\"\"\"\n    return os.getcwd()  # trailing\n";
        let metrics = metrics_of(code, Language::Python);
        assert_eq!(metrics.total_lines, 8);
        assert_eq!(metrics.blank_lines, 3);
        assert_eq!(metrics.comment_lines, 2);
        assert_eq!(metrics.loc, 3);
        assert!((metrics.comment_ratio - 0.25).abs() < 1e-9);
        assert_eq!(metrics.doc_coverage, Some(1.0));
    }

    #[test]
    fn test_long_lines_and_naming() {
        let long = "x".repeat(130);
        let code = format!("def f():\n    s = \"{long}\"\n    value = 1\n    return s\n");
        let metrics = metrics_of(&code, Language::Python);
        assert_eq!(metrics.long_lines, 1);
        assert!(metrics.max_line_length > 120);
        assert_eq!(metrics.naming_issues, 1);
    }

    #[test]
    fn test_script_without_functions_uses_module_complexity() {
        let code = "x = 1\nif x > 0:\n    print(x)\n";
        let metrics = metrics_of(code, Language::Python);
        assert!(metrics.functions.is_empty());
        assert_eq!(metrics.module_cyclomatic, 2);
        assert!((metrics.avg_cyclomatic - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let mut code = String::from("def f(x):\n");
        for depth in 1..=200 {
            code.push_str(&"    ".repeat(depth));
            code.push_str("if x:\n");
        }
        code.push_str(&"    ".repeat(201));
        code.push_str("return 1\n");
        let metrics = metrics_of(&code, Language::Python);
        assert_eq!(metrics.functions[0].max_nesting, 200);
        assert_eq!(metrics.functions[0].cyclomatic, 201);
    }

    #[test]
    fn test_function_lookup_by_declaration() {
        let code = "class A:\n    def m(self):\n        return 1\n\ndef g():\n    return 2\n";
        let metrics = metrics_of(code, Language::Python);
        assert_eq!(metrics.functions.len(), 2);
        assert_eq!(metrics.function(1).unwrap().name, "m");
        assert_eq!(metrics.function(2).unwrap().name, "g");
        assert!(metrics.function(0).is_none());
        assert_eq!(metrics.body_count(), 2);
    }

    #[test]
    fn test_callables_sharing_a_line_keep_their_own_bodies() {
        let code = "const a = () => 1; const b = (x) => { if (x) { return 1; } return 0; };\n";
        let metrics = metrics_of(code, Language::JavaScript);
        let by_name = |name: &str| {
            metrics
                .functions
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.cyclomatic)
        };
        assert_eq!(metrics.functions.len(), 2);
        assert_eq!(by_name("a"), Some(1));
        assert_eq!(by_name("b"), Some(2));
        assert_eq!(metrics.body_count(), 2);
    }
}
