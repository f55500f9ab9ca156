//! Tree-sitter based parsing into declaration summaries.
//!
//! Parsing is bounded by a per-parse timeout and never aborts on syntax
//! errors: tree-sitter recovers with `ERROR` nodes, the walk records their
//! lines and keeps extracting whatever declarations survive.

pub mod adapter;
pub mod grammar;

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser as TsParser, Tree};

use crate::core::{Error, Result, SourceUnit};

pub use adapter::{AdapterRegistry, GrammarAdapter, LanguageAdapter};
use grammar::{grammar_for, ts_language, ClassFilter, GrammarSpec, SelfFieldStyle};

/// A source unit together with its syntax tree.
pub struct ParsedSource<'u> {
    /// The unit that was parsed.
    pub unit: &'u SourceUnit,
    /// The parsed syntax tree.
    pub tree: Tree,
    /// Node kind tables for the unit's grammar.
    pub spec: &'static GrammarSpec,
}

impl<'u> ParsedSource<'u> {
    /// Get the root node of the tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Get text for a node.
    pub fn node_text(&self, node: &Node<'_>) -> &str {
        node.utf8_text(self.unit.bytes()).unwrap_or("")
    }

    /// Whether tree-sitter had to recover from syntax errors.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Line count of the underlying text.
    pub fn line_count(&self) -> u32 {
        self.unit.line_count() as u32
    }
}

/// Parse a unit with a fresh parser, bounded by `budget`.
///
/// A zero budget disables the timeout.
pub fn parse_unit(unit: &SourceUnit, budget: Duration) -> Result<ParsedSource<'_>> {
    let mut parser = TsParser::new();
    parser
        .set_language(&ts_language(unit.language))
        .map_err(|e| Error::internal(format!("grammar for {} failed to load: {e}", unit.language)))?;
    parser.set_timeout_micros(u64::try_from(budget.as_micros()).unwrap_or(u64::MAX));

    let tree = parser
        .parse(unit.bytes(), None)
        .ok_or_else(|| Error::timeout("parse", budget))?;

    Ok(ParsedSource {
        unit,
        tree,
        spec: grammar_for(unit.language),
    })
}

/// Kind of an extracted declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Class,
    Method,
    Field,
    Import,
}

/// A declaration and its location. Lines are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Index of the owning class in [`AstSummary::declarations`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    /// Parameter count, for functions and methods.
    pub parameters: u32,
    /// Whether a doc comment or docstring is attached.
    pub documented: bool,
    /// Start byte of the declaring node, unique per declaration site.
    #[serde(skip)]
    pub start_byte: usize,
}

impl Declaration {
    /// Number of lines spanned.
    pub fn line_span(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Functions and methods.
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, DeclarationKind::Function | DeclarationKind::Method)
    }
}

/// A numeric literal found in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericLiteral {
    pub line: u32,
    pub text: String,
    pub value: f64,
    /// Part of a named constant or enum definition.
    pub in_constant: bool,
}

/// Structural summary of one source unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AstSummary {
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
    #[serde(skip)]
    pub numeric_literals: Vec<NumericLiteral>,
    /// Lines covered by comments or docstrings, ascending.
    #[serde(skip)]
    pub comment_lines: Vec<u32>,
    /// Lines where tree-sitter recovered from a syntax error, ascending.
    pub error_lines: Vec<u32>,
    /// Named nodes in the tree.
    pub total_nodes: usize,
    pub line_count: u32,
}

impl AstSummary {
    /// Declarations of one kind, in source order.
    pub fn of_kind(&self, kind: DeclarationKind) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(move |d| d.kind == kind)
    }

    /// Names of declarations of one kind.
    pub fn names(&self, kind: DeclarationKind) -> Vec<String> {
        self.of_kind(kind).map(|d| d.name.clone()).collect()
    }

    /// Functions and methods.
    pub fn callables(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(|d| d.is_callable())
    }

    /// Members of kind `kind` owned by the class at `class_index`.
    pub fn member_count(&self, class_index: usize, kind: DeclarationKind) -> usize {
        self.declarations
            .iter()
            .filter(|d| d.kind == kind && d.parent == Some(class_index))
            .count()
    }

    /// Functions, methods and classes, the declarations expected to carry docs.
    pub fn documentable(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|d| d.is_callable() || d.kind == DeclarationKind::Class)
    }

    /// Whether the parse needed error recovery.
    pub fn is_partial(&self) -> bool {
        !self.error_lines.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    class: Option<usize>,
    in_function: bool,
}

/// Walk the tree and collect declarations and per-line facts.
///
/// Iterative so that pathologically nested input cannot overflow the stack.
pub fn extract_declarations(parsed: &ParsedSource<'_>) -> AstSummary {
    let spec = parsed.spec;
    let source = parsed.unit.bytes();
    let line_count = parsed.line_count();

    let mut summary = AstSummary {
        line_count,
        ..Default::default()
    };
    let mut comment_lines = BTreeSet::new();
    let mut error_lines = BTreeSet::new();
    let mut seen_fields: HashSet<(usize, String)> = HashSet::new();

    let mut stack = vec![(parsed.root_node(), Scope::default())];
    while let Some((node, scope)) = stack.pop() {
        let kind = node.kind();
        if node.is_named() {
            summary.total_nodes += 1;
        }
        if node.is_error() || node.is_missing() {
            error_lines.insert(line_of(node.start_position().row, line_count));
        }

        if spec.is_comment(kind) || (spec.docstrings && is_string_statement(&node)) {
            // A trailing comment does not make its line a comment line.
            let mut start = node.start_position().row;
            if !leads_line(source, node.start_byte()) {
                start += 1;
            }
            let end = end_row(&node);
            if start <= end {
                comment_lines.extend(line_of(start, line_count)..=line_of(end, line_count));
            }
            continue;
        }

        if spec.number_kinds.contains(&kind) {
            if let Some(literal) = numeric_literal(&node, parsed, line_count) {
                summary.numeric_literals.push(literal);
            }
            continue;
        }

        if let Some(name) = import_name(spec, &node, source) {
            summary.declarations.push(Declaration {
                kind: DeclarationKind::Import,
                name,
                start_line: line_of(node.start_position().row, line_count),
                end_line: line_of(end_row(&node), line_count),
                parent: None,
                parameters: 0,
                documented: false,
                start_byte: node.start_byte(),
            });
            continue;
        }

        let mut child_scope = scope;
        if !node.is_named() {
            // Keyword tokens share kind names such as `class` and `function`.
        } else if spec.is_class(kind) && passes_class_filter(spec, &node) {
            let index = push_class(&mut summary, spec, &node, source, scope, line_count);
            child_scope = Scope {
                class: Some(index),
                in_function: false,
            };
        } else if spec.is_function(kind) || spec.is_anonymous_function(kind) {
            if let Some(name) = function_name(spec, &node, source) {
                let (decl_kind, parent) = callable_owner(spec, &node, source, scope, &summary);
                summary.declarations.push(Declaration {
                    kind: decl_kind,
                    name,
                    start_line: line_of(node.start_position().row, line_count),
                    end_line: line_of(end_row(&node), line_count),
                    parent,
                    parameters: parameter_count(spec, &node, source),
                    documented: is_documented(spec, &node),
                    start_byte: node.start_byte(),
                });
            }
            child_scope.in_function = true;
        } else if let (Some(class), false) = (scope.class, scope.in_function) {
            if spec.field_kinds.contains(&kind) {
                push_fields(
                    &mut summary,
                    &mut seen_fields,
                    &node,
                    source,
                    class,
                    line_count,
                );
            }
        } else if let (Some(class), true) = (scope.class, scope.in_function) {
            if let Some(name) = self_field_name(spec.self_fields, &node, source) {
                if seen_fields.insert((class, name.clone())) {
                    let line = line_of(node.start_position().row, line_count);
                    summary
                        .declarations
                        .push(field(name, line, line, class, node.start_byte()));
                }
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push((child, child_scope));
        }
    }

    summary.comment_lines = comment_lines.into_iter().collect();
    summary.error_lines = error_lines.into_iter().collect();
    summary
}

/// Convert a 0-based row into a 1-based line inside `[1, line_count]`.
pub fn line_of(row: usize, line_count: u32) -> u32 {
    let line = u32::try_from(row).unwrap_or(u32::MAX).saturating_add(1);
    line.clamp(1, line_count.max(1))
}

/// Last row that holds text of the node. A node whose end sits at column 0
/// only swallowed the trailing newline of the previous row.
pub fn end_row(node: &Node<'_>) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    }
}

/// Whether only whitespace precedes `byte` on its line.
fn leads_line(source: &[u8], byte: usize) -> bool {
    source[..byte.min(source.len())]
        .iter()
        .rev()
        .take_while(|b| **b != b'\n')
        .all(|b| b.is_ascii_whitespace())
}

/// The full line of text containing `byte`.
fn line_around(source: &[u8], byte: usize) -> &str {
    let byte = byte.min(source.len());
    let start = source[..byte]
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);
    let end = source[byte..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(source.len(), |i| byte + i);
    std::str::from_utf8(&source[start..end]).unwrap_or("")
}

fn text<'a>(node: &Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn field(
    name: String,
    start_line: u32,
    end_line: u32,
    class: usize,
    start_byte: usize,
) -> Declaration {
    Declaration {
        kind: DeclarationKind::Field,
        name,
        start_line,
        end_line,
        parent: Some(class),
        parameters: 0,
        documented: false,
        start_byte,
    }
}

fn is_string_statement(node: &Node<'_>) -> bool {
    node.kind() == "expression_statement"
        && node.named_child_count() == 1
        && node.named_child(0).is_some_and(|c| c.kind() == "string")
}

fn passes_class_filter(spec: &GrammarSpec, node: &Node<'_>) -> bool {
    match spec.class_filter {
        ClassFilter::Any => true,
        ClassFilter::RequiresBody => node.child_by_field_name("body").is_some(),
        ClassFilter::GoStructOrInterface => node
            .child_by_field_name("type")
            .is_some_and(|t| matches!(t.kind(), "struct_type" | "interface_type")),
    }
}

fn push_class(
    summary: &mut AstSummary,
    spec: &GrammarSpec,
    node: &Node<'_>,
    source: &[u8],
    scope: Scope,
    line_count: u32,
) -> usize {
    let name = node
        .child_by_field_name("name")
        .or_else(|| node.child_by_field_name("type"))
        .map(|n| strip_generics(text(&n, source)).to_string())
        .or_else(|| binding_name(node, source))
        .unwrap_or_else(|| "<anonymous>".to_string());

    if spec.merge_class_kinds.contains(&node.kind()) {
        if let Some(index) = summary
            .declarations
            .iter()
            .position(|d| d.kind == DeclarationKind::Class && d.name == name)
        {
            return index;
        }
    }

    summary.declarations.push(Declaration {
        kind: DeclarationKind::Class,
        name,
        start_line: line_of(node.start_position().row, line_count),
        end_line: line_of(end_row(node), line_count),
        parent: scope.class,
        parameters: 0,
        documented: is_documented(spec, node),
        start_byte: node.start_byte(),
    });
    summary.declarations.len() - 1
}

fn strip_generics(name: &str) -> &str {
    name.split(['<', '[']).next().unwrap_or(name).trim()
}

fn function_name(spec: &GrammarSpec, node: &Node<'_>, source: &[u8]) -> Option<String> {
    if spec.is_anonymous_function(node.kind()) {
        return binding_name(node, source);
    }
    if let Some(name) = node.child_by_field_name("name") {
        return Some(text(&name, source).to_string());
    }
    node.child_by_field_name("declarator")
        .and_then(|d| declarator_name(d, source))
}

/// Follow C-style declarator chains down to the declared identifier.
fn declarator_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    let mut current = node;
    for _ in 0..8 {
        match current.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
            | "operator_name" | "type_identifier" => {
                return Some(text(&current, source).to_string());
            }
            _ => {
                current = current
                    .child_by_field_name("declarator")
                    .or_else(|| current.named_child(0))?;
            }
        }
    }
    None
}

/// Name an anonymous function or class after the binding it is assigned to.
fn binding_name(node: &Node<'_>, source: &[u8]) -> Option<String> {
    let parent = node.parent()?;
    let target = match parent.kind() {
        "variable_declarator" => parent.child_by_field_name("name"),
        "pair" => parent.child_by_field_name("key"),
        "assignment_expression" => parent.child_by_field_name("left"),
        "field_definition" => parent.child_by_field_name("property"),
        "public_field_definition" => parent.child_by_field_name("name"),
        _ => None,
    }?;
    let full = text(&target, source);
    Some(full.rsplit('.').next().unwrap_or(full).to_string())
}

fn callable_owner(
    spec: &GrammarSpec,
    node: &Node<'_>,
    source: &[u8],
    scope: Scope,
    summary: &AstSummary,
) -> (DeclarationKind, Option<usize>) {
    if let (Some(class), false) = (scope.class, scope.in_function) {
        return (DeclarationKind::Method, Some(class));
    }
    if let Some(field) = spec.receiver_field {
        if let Some(type_name) = node
            .child_by_field_name(field)
            .and_then(|r| receiver_type(&r, source))
        {
            let owner = summary
                .declarations
                .iter()
                .position(|d| d.kind == DeclarationKind::Class && d.name == type_name);
            if owner.is_some() {
                return (DeclarationKind::Method, owner);
            }
        }
    }
    (DeclarationKind::Function, None)
}

fn receiver_type(receiver: &Node<'_>, source: &[u8]) -> Option<String> {
    let mut cursor = receiver.walk();
    let param = receiver
        .named_children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    let ty = param.child_by_field_name("type")?;
    Some(strip_generics(text(&ty, source).trim_start_matches('*')).to_string())
}

fn parameter_list<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    if let Some(params) = node
        .child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"))
    {
        return Some(params);
    }
    // C and C++ keep parameters on the function declarator.
    let mut current = node.child_by_field_name("declarator")?;
    for _ in 0..8 {
        if current.kind() == "function_declarator" {
            return current.child_by_field_name("parameters");
        }
        current = current.child_by_field_name("declarator")?;
    }
    None
}

fn parameter_count(spec: &GrammarSpec, node: &Node<'_>, source: &[u8]) -> u32 {
    let Some(params) = parameter_list(node) else {
        return 0;
    };
    if params.kind() == "identifier" {
        return 1;
    }

    let mut count = 0;
    let mut cursor = params.walk();
    let children: Vec<Node<'_>> = params.named_children(&mut cursor).collect();
    for (i, child) in children.iter().enumerate() {
        if spec.is_comment(child.kind()) || child.kind() == "self_parameter" {
            continue;
        }
        let child_text = text(child, source).trim();
        if i == 0 && spec.implicit_parameters.contains(&child_text) {
            continue;
        }
        if child_text == "void" && children.len() == 1 {
            continue;
        }
        let mut name_cursor = child.walk();
        let names = child.children_by_field_name("name", &mut name_cursor).count();
        count += names.max(1) as u32;
    }
    count
}

fn is_documented(spec: &GrammarSpec, node: &Node<'_>) -> bool {
    if spec.docstrings
        && node
            .child_by_field_name("body")
            .and_then(|b| b.named_child(0))
            .is_some_and(|first| is_string_statement(&first))
    {
        return true;
    }

    let mut anchor = *node;
    while let Some(parent) = anchor.parent() {
        let wraps = spec.wrapper_kinds.contains(&parent.kind())
            || (spec.is_anonymous_function(node.kind())
                && matches!(
                    parent.kind(),
                    "variable_declarator" | "lexical_declaration" | "variable_declaration"
                ));
        if !wraps {
            break;
        }
        anchor = parent;
    }

    let mut prev = anchor.prev_sibling();
    while let Some(p) = prev {
        if spec.attribute_kinds.contains(&p.kind()) {
            prev = p.prev_sibling();
        } else {
            break;
        }
    }
    match prev {
        Some(p) if spec.is_comment(p.kind()) => end_row(&p) + 1 >= anchor.start_position().row,
        _ => false,
    }
}

fn push_fields(
    summary: &mut AstSummary,
    seen: &mut HashSet<(usize, String)>,
    node: &Node<'_>,
    source: &[u8],
    class: usize,
    line_count: u32,
) {
    let start = line_of(node.start_position().row, line_count);
    let end = line_of(end_row(node), line_count);

    // A C++ member prototype is a method, not a field.
    if node
        .child_by_field_name("declarator")
        .is_some_and(|d| d.kind() == "function_declarator")
    {
        if let Some(name) = node
            .child_by_field_name("declarator")
            .and_then(|d| declarator_name(d, source))
        {
            summary.declarations.push(Declaration {
                kind: DeclarationKind::Method,
                name,
                start_line: start,
                end_line: end,
                parent: Some(class),
                parameters: 0,
                documented: false,
                start_byte: node.start_byte(),
            });
        }
        return;
    }

    for name in field_names(node, source) {
        if seen.insert((class, name.clone())) {
            summary
                .declarations
                .push(field(name, start, end, class, node.start_byte()));
        }
    }
}

fn field_names(node: &Node<'_>, source: &[u8]) -> Vec<String> {
    match node.kind() {
        // Python class attribute: `name = value` or `name: type = value`.
        "assignment" => node
            .child_by_field_name("left")
            .filter(|l| l.kind() == "identifier")
            .map(|l| vec![text(&l, source).to_string()])
            .unwrap_or_default(),
        "field_definition" => node
            .child_by_field_name("property")
            .map(|p| vec![text(&p, source).to_string()])
            .unwrap_or_default(),
        _ => {
            if let Some(name) = node.child_by_field_name("name") {
                return vec![text(&name, source).trim_start_matches('$').to_string()];
            }
            let mut names = Vec::new();
            collect_field_identifiers(node, source, &mut names);
            names
        }
    }
}

/// Declared names below a field declaration: Java/C# declarators, C/Go/Rust
/// field identifiers, PHP property variables.
fn collect_field_identifiers(node: &Node<'_>, source: &[u8], names: &mut Vec<String>) {
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        match current.kind() {
            "variable_declarator" => {
                let name = current
                    .child_by_field_name("name")
                    .or_else(|| current.named_child(0));
                if let Some(name) = name {
                    names.push(text(&name, source).to_string());
                }
                continue;
            }
            "field_identifier" | "variable_name" | "const_element" => {
                names.push(text(&current, source).trim_start_matches('$').to_string());
                continue;
            }
            // Initializers and types never declare the field's own name.
            "type_identifier" | "generic_type" | "argument_list" | "object_creation_expression" => {
                continue
            }
            _ => {}
        }
        let mut cursor = current.walk();
        let children: Vec<Node<'_>> = current.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    names.sort_unstable();
    names.dedup();
}

fn self_field_name(style: SelfFieldStyle, node: &Node<'_>, source: &[u8]) -> Option<String> {
    match style {
        SelfFieldStyle::None => None,
        SelfFieldStyle::PythonSelf => {
            if node.kind() != "assignment" {
                return None;
            }
            let left = node.child_by_field_name("left")?;
            if left.kind() != "attribute" {
                return None;
            }
            let object = left.child_by_field_name("object")?;
            if text(&object, source) != "self" {
                return None;
            }
            left.child_by_field_name("attribute")
                .map(|a| text(&a, source).to_string())
        }
        SelfFieldStyle::RubyIvar => {
            if node.kind() != "assignment" {
                return None;
            }
            let left = node.child_by_field_name("left")?;
            (left.kind() == "instance_variable")
                .then(|| text(&left, source).trim_start_matches('@').to_string())
        }
        SelfFieldStyle::JsThis => {
            if node.kind() != "assignment_expression" {
                return None;
            }
            let left = node.child_by_field_name("left")?;
            if left.kind() != "member_expression" {
                return None;
            }
            let object = left.child_by_field_name("object")?;
            if object.kind() != "this" {
                return None;
            }
            left.child_by_field_name("property")
                .map(|p| text(&p, source).to_string())
        }
    }
}

fn import_name(spec: &GrammarSpec, node: &Node<'_>, source: &[u8]) -> Option<String> {
    let kind = node.kind();
    if spec.import_kinds.contains(&kind) {
        return Some(compact(text(node, source)));
    }
    if !spec.import_calls.is_empty() && spec.call_kinds.contains(&kind) {
        let method = node.child_by_field_name("method")?;
        if spec.import_calls.contains(&text(&method, source)) {
            return Some(compact(text(node, source)));
        }
    }
    None
}

fn compact(statement: &str) -> String {
    let joined = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = joined.trim_end_matches(';').trim();
    trimmed.chars().take(200).collect()
}

static CONSTANT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bconst\b|\bfinal\b|\breadonly\b|#define|^\s*(export\s+)?(pub(\([^)]*\))?\s+)?(static\s+)?[A-Z][A-Z0-9_]*\s*(:[^=]*)?=[^=]",
    )
    .expect("valid regex")
});

fn numeric_literal(
    node: &Node<'_>,
    parsed: &ParsedSource<'_>,
    line_count: u32,
) -> Option<NumericLiteral> {
    let raw = parsed.node_text(node);
    let value = parse_number(raw)?;
    let row = node.start_position().row;
    let line_text = line_around(parsed.unit.bytes(), node.start_byte());

    let mut in_constant = CONSTANT_LINE.is_match(line_text);
    let mut ancestor = node.parent();
    for _ in 0..4 {
        let Some(a) = ancestor else { break };
        let kind = a.kind();
        if kind.contains("enum")
            || matches!(
                kind,
                "const_item" | "static_item" | "const_declaration" | "preproc_def"
            )
        {
            in_constant = true;
            break;
        }
        ancestor = a.parent();
    }

    Some(NumericLiteral {
        line: line_of(row, line_count),
        text: raw.to_string(),
        value,
        in_constant,
    })
}

/// Parse a numeric literal, ignoring separators and type suffixes.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '_' && *c != '\'')
        .collect::<String>()
        .to_ascii_lowercase();
    if !cleaned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    for (prefix, radix) in [("0x", 16), ("0b", 2), ("0o", 8)] {
        if let Some(digits) = cleaned.strip_prefix(prefix) {
            let digits: String = digits.chars().take_while(|c| c.is_digit(radix)).collect();
            return u64::from_str_radix(&digits, radix).ok().map(|v| v as f64);
        }
    }
    (1..=cleaned.len())
        .rev()
        .filter(|end| cleaned.is_char_boundary(*end))
        .find_map(|end| cleaned[..end].parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Language;

    fn summarize(code: &str, lang: Language) -> AstSummary {
        let unit = SourceUnit::with_language(None, lang, code.to_string());
        let parsed = parse_unit(&unit, Duration::from_secs(5)).unwrap();
        extract_declarations(&parsed)
    }

    #[test]
    fn test_parse_over_budget_times_out() {
        let code: String = (0..200_000)
            .map(|i| format!("def f{i}(a):\n    return a + {i}\n"))
            .collect();
        let unit = SourceUnit::with_language(None, Language::Python, code);
        let err = parse_unit(&unit, Duration::from_micros(1)).err().unwrap();
        assert!(matches!(err, Error::Timeout { .. }), "unexpected error: {err}");
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_zero_budget_disables_timeout() {
        let unit = SourceUnit::with_language(None, Language::Python, "x = 1\n".to_string());
        assert!(parse_unit(&unit, Duration::ZERO).is_ok());
    }

    #[test]
    fn test_python_class_methods_and_fields() {
        let code = r#"import os
from typing import List


class Account:
    """A bank account."""
    currency = "EUR"

    def __init__(self, owner, balance):
        self.owner = owner
        self.balance = balance

    def deposit(self, amount):
        self.balance += amount


def helper(a, b, c):
    return a + b + c
"#;
        let summary = summarize(code, Language::Python);
        assert_eq!(
            summary.names(DeclarationKind::Import),
            vec!["import os", "from typing import List"]
        );
        assert_eq!(summary.names(DeclarationKind::Class), vec!["Account"]);
        assert_eq!(
            summary.names(DeclarationKind::Method),
            vec!["__init__", "deposit"]
        );
        assert_eq!(summary.names(DeclarationKind::Function), vec!["helper"]);
        assert_eq!(
            summary.names(DeclarationKind::Field),
            vec!["currency", "owner", "balance"]
        );

        let class = summary
            .of_kind(DeclarationKind::Class)
            .next()
            .unwrap()
            .clone();
        assert_eq!(class.start_line, 5);
        assert!(class.documented);

        let init = summary
            .declarations
            .iter()
            .find(|d| d.name == "__init__")
            .unwrap();
        assert_eq!(init.parameters, 2);
        assert_eq!(init.start_line, 9);
        assert_eq!(init.end_line, 11);

        let helper = summary
            .declarations
            .iter()
            .find(|d| d.name == "helper")
            .unwrap();
        assert_eq!(helper.parameters, 3);
        assert_eq!(helper.start_line, 17);
        assert!(!helper.documented);
        assert!(summary.error_lines.is_empty());
    }

    #[test]
    fn test_java_class_members() {
        let code = r#"import java.util.List;

/** Keeps orders. */
public class OrderService {
    private int count;
    private String a, b;

    public OrderService() {}

    /** Adds one. */
    public void add(int x, int y) {
        count += x;
    }
}
"#;
        let summary = summarize(code, Language::Java);
        assert_eq!(summary.names(DeclarationKind::Class), vec!["OrderService"]);
        assert_eq!(summary.names(DeclarationKind::Field), vec!["count", "a", "b"]);
        assert_eq!(
            summary.names(DeclarationKind::Method),
            vec!["OrderService", "add"]
        );
        let add = summary.declarations.iter().find(|d| d.name == "add").unwrap();
        assert_eq!(add.parameters, 2);
        assert!(add.documented);
        assert_eq!(summary.member_count(1, DeclarationKind::Method), 2);
        assert_eq!(
            summary.names(DeclarationKind::Import),
            vec!["import java.util.List"]
        );
    }

    #[test]
    fn test_javascript_arrow_functions_take_binding_names() {
        let code = "const add = (a, b) => a + b;\nfunction main() {\n  [1, 2].map(x => x * 2);\n}\nclass Cart {\n  constructor() {\n    this.items = [];\n  }\n}\n";
        let summary = summarize(code, Language::JavaScript);
        assert_eq!(
            summary.names(DeclarationKind::Function),
            vec!["add", "main"]
        );
        assert_eq!(summary.names(DeclarationKind::Method), vec!["constructor"]);
        assert_eq!(summary.names(DeclarationKind::Field), vec!["items"]);
        let add = &summary.declarations[0];
        assert_eq!(add.parameters, 2);
    }

    #[test]
    fn test_rust_impl_merges_into_struct() {
        let code = "/// A point.\n#[derive(Debug)]\npub struct Point {\n    x: i32,\n    y: i32,\n}\n\nimpl Point {\n    pub fn new(x: i32, y: i32) -> Self {\n        Self { x, y }\n    }\n\n    fn norm(&self) -> i32 {\n        self.x + self.y\n    }\n}\n";
        let summary = summarize(code, Language::Rust);
        assert_eq!(summary.names(DeclarationKind::Class), vec!["Point"]);
        assert_eq!(summary.member_count(0, DeclarationKind::Field), 2);
        assert_eq!(summary.member_count(0, DeclarationKind::Method), 2);
        assert!(summary.declarations[0].documented);
        let norm = summary.declarations.iter().find(|d| d.name == "norm").unwrap();
        assert_eq!(norm.parameters, 0);
    }

    #[test]
    fn test_go_methods_attach_to_receiver() {
        let code = "package main\n\nimport \"fmt\"\n\ntype Server struct {\n\taddr string\n\tport int\n}\n\nfunc (s *Server) Start() {\n\tfmt.Println(s.addr)\n}\n\nfunc main() {}\n";
        let summary = summarize(code, Language::Go);
        assert_eq!(summary.names(DeclarationKind::Class), vec!["Server"]);
        assert_eq!(summary.names(DeclarationKind::Method), vec!["Start"]);
        assert_eq!(summary.names(DeclarationKind::Function), vec!["main"]);
        assert_eq!(summary.member_count(1, DeclarationKind::Field), 2);
        assert_eq!(summary.member_count(1, DeclarationKind::Method), 1);
    }

    #[test]
    fn test_cpp_qualified_function_names() {
        let code = "#include <vector>\n\nclass Stack {\n  int size;\n  void push(int v);\n};\n\nvoid Stack::push(int v) {\n  size++;\n}\n";
        let summary = summarize(code, Language::Cpp);
        assert_eq!(summary.names(DeclarationKind::Class), vec!["Stack"]);
        assert!(summary
            .names(DeclarationKind::Function)
            .contains(&"Stack::push".to_string()));
        assert_eq!(summary.member_count(1, DeclarationKind::Field), 1);
        assert_eq!(summary.member_count(1, DeclarationKind::Method), 1);
    }

    #[test]
    fn test_c_void_parameters() {
        let code = "int main(void) {\n  return 0;\n}\n";
        let summary = summarize(code, Language::C);
        let main = &summary.declarations[0];
        assert_eq!(main.name, "main");
        assert_eq!(main.parameters, 0);
    }

    #[test]
    fn test_line_numbers_follow_blank_lines() {
        let code = "\n\n\ndef late():\n\n    return 1\n";
        let summary = summarize(code, Language::Python);
        let late = &summary.declarations[0];
        assert_eq!(late.start_line, 4);
        assert_eq!(late.end_line, 6);
    }

    #[test]
    fn test_malformed_input_is_partial_not_fatal() {
        let code = "def ok():\n    return 1\n\ndef broken(:\n    return (\n";
        let summary = summarize(code, Language::Python);
        assert!(summary.is_partial());
        assert!(summary.names(DeclarationKind::Function).contains(&"ok".to_string()));
        for line in &summary.error_lines {
            assert!(*line >= 1 && *line <= summary.line_count);
        }
    }

    #[test]
    fn test_numeric_literals_and_constants() {
        let code = "MAX_RETRIES = 42\n\ndef f(x):\n    return x * 86400\n";
        let summary = summarize(code, Language::Python);
        let literals: Vec<_> = summary
            .numeric_literals
            .iter()
            .map(|l| (l.line, l.value, l.in_constant))
            .collect();
        assert_eq!(literals, vec![(1, 42.0, true), (4, 86400.0, false)]);
    }

    #[test]
    fn test_comment_lines_include_docstrings() {
        let code = "# header\ndef f():\n    \"\"\"Doc\n    more.\"\"\"\n    return 1\n";
        let summary = summarize(code, Language::Python);
        assert_eq!(summary.comment_lines, vec![1, 3, 4]);
        assert!(summary.declarations[0].documented);
    }

    #[test]
    fn test_ruby_methods_and_ivars() {
        let code = "require 'json'\n\nclass User\n  def initialize(name)\n    @name = name\n  end\nend\n";
        let summary = summarize(code, Language::Ruby);
        assert_eq!(
            summary.names(DeclarationKind::Import),
            vec!["require 'json'"]
        );
        assert_eq!(summary.names(DeclarationKind::Method), vec!["initialize"]);
        assert_eq!(summary.names(DeclarationKind::Field), vec!["name"]);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("1_000"), Some(1000.0));
        assert_eq!(parse_number("0xFF"), Some(255.0));
        assert_eq!(parse_number("10u32"), Some(10.0));
        assert_eq!(parse_number("2.5f"), Some(2.5));
        assert_eq!(parse_number("100L"), Some(100.0));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_line_of_clamps() {
        assert_eq!(line_of(0, 3), 1);
        assert_eq!(line_of(10, 3), 3);
        assert_eq!(line_of(0, 0), 1);
    }
}
