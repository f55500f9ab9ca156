//! Per-grammar node kind tables.
//!
//! Each supported language is described by one static [`GrammarSpec`]. The
//! generic extraction and metric passes read these tables instead of matching
//! on the language, so adding a grammar means adding a table.

use tree_sitter::Language as TsLanguage;

use crate::core::Language;

/// Which class-like nodes count as declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassFilter {
    /// Every node of a class kind.
    Any,
    /// Only nodes with a `body` field (C `struct x;` references are skipped).
    RequiresBody,
    /// Go `type_spec` nodes whose type is a struct or interface.
    GoStructOrInterface,
}

/// How a language declares instance fields inside method bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfFieldStyle {
    /// Fields are only declared at class level.
    None,
    /// `self.name = ...` (Python).
    PythonSelf,
    /// `@name = ...` (Ruby).
    RubyIvar,
    /// `this.name = ...` (JavaScript, TypeScript).
    JsThis,
}

/// Node kinds and fields for one tree-sitter grammar.
#[derive(Debug)]
pub struct GrammarSpec {
    /// Named function and method declarations.
    pub function_kinds: &'static [&'static str],
    /// Function expressions that take their name from the enclosing binding.
    pub anonymous_function_kinds: &'static [&'static str],
    /// Class, struct, interface and module declarations.
    pub class_kinds: &'static [&'static str],
    /// Class kinds that extend an earlier declaration of the same name (Rust `impl`).
    pub merge_class_kinds: &'static [&'static str],
    pub class_filter: ClassFilter,
    /// Field declarations directly inside a class body.
    pub field_kinds: &'static [&'static str],
    pub self_fields: SelfFieldStyle,
    pub import_kinds: &'static [&'static str],
    /// Call targets that act as imports (Ruby `require`).
    pub import_calls: &'static [&'static str],
    pub comment_kinds: &'static [&'static str],
    pub number_kinds: &'static [&'static str],
    /// Nodes that wrap a declaration without changing it (decorators, `export`).
    pub wrapper_kinds: &'static [&'static str],
    /// Siblings skipped when looking for a preceding doc comment.
    pub attribute_kinds: &'static [&'static str],
    /// Whether a leading string statement documents a body (Python docstrings).
    pub docstrings: bool,
    /// Parameter names that do not count toward the parameter list.
    pub implicit_parameters: &'static [&'static str],
    /// Field holding a method receiver, for languages that declare methods outside the type.
    pub receiver_field: Option<&'static str>,
    /// Decision points for cyclomatic complexity.
    pub decision_kinds: &'static [&'static str],
    /// Constructs that add 1 + depth to cognitive complexity and nest their children.
    pub nesting_kinds: &'static [&'static str],
    /// Constructs that add 1 to cognitive complexity without nesting.
    pub flat_kinds: &'static [&'static str],
    pub loop_kinds: &'static [&'static str],
    pub if_kinds: &'static [&'static str],
    pub break_kinds: &'static [&'static str],
    pub call_kinds: &'static [&'static str],
}

impl GrammarSpec {
    pub fn is_function(&self, kind: &str) -> bool {
        self.function_kinds.contains(&kind)
    }

    pub fn is_anonymous_function(&self, kind: &str) -> bool {
        self.anonymous_function_kinds.contains(&kind)
    }

    pub fn is_class(&self, kind: &str) -> bool {
        self.class_kinds.contains(&kind)
    }

    pub fn is_comment(&self, kind: &str) -> bool {
        self.comment_kinds.contains(&kind)
    }

    /// Whether this kind opens a new nesting level for max-depth tracking.
    pub fn is_nesting(&self, kind: &str) -> bool {
        self.nesting_kinds.contains(&kind)
    }
}

/// Get tree-sitter language for a Language enum value.
pub fn ts_language(lang: Language) -> TsLanguage {
    let ts_lang = match lang {
        Language::Go => tree_sitter_go::LANGUAGE,
        Language::Rust => tree_sitter_rust::LANGUAGE,
        Language::Python => tree_sitter_python::LANGUAGE,
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX,
        Language::JavaScript | Language::Jsx => tree_sitter_javascript::LANGUAGE,
        Language::Java => tree_sitter_java::LANGUAGE,
        Language::C => tree_sitter_c::LANGUAGE,
        Language::Cpp => tree_sitter_cpp::LANGUAGE,
        Language::CSharp => tree_sitter_c_sharp::LANGUAGE,
        Language::Ruby => tree_sitter_ruby::LANGUAGE,
        Language::Php => tree_sitter_php::LANGUAGE_PHP,
        Language::Bash => tree_sitter_bash::LANGUAGE,
    };
    ts_lang.into()
}

/// Get the grammar table for a language.
pub fn grammar_for(lang: Language) -> &'static GrammarSpec {
    match lang {
        Language::Go => &GO,
        Language::Rust => &RUST,
        Language::Python => &PYTHON,
        Language::TypeScript | Language::Tsx => &TYPESCRIPT,
        Language::JavaScript | Language::Jsx => &JAVASCRIPT,
        Language::Java => &JAVA,
        Language::C => &C,
        Language::Cpp => &CPP,
        Language::CSharp => &CSHARP,
        Language::Ruby => &RUBY,
        Language::Php => &PHP,
        Language::Bash => &BASH,
    }
}

/// Check if a node type represents a logical operator.
pub fn is_logical_operator(node_type: &str) -> bool {
    matches!(node_type, "&&" | "||" | "and" | "or")
}

/// Node kinds that can carry a logical operator.
pub fn is_binary_like(kind: &str) -> bool {
    matches!(
        kind,
        "binary_expression" | "logical_expression" | "boolean_operator" | "binary"
    )
}

const PYTHON: GrammarSpec = GrammarSpec {
    function_kinds: &["function_definition"],
    anonymous_function_kinds: &[],
    class_kinds: &["class_definition"],
    merge_class_kinds: &[],
    class_filter: ClassFilter::Any,
    field_kinds: &["assignment"],
    self_fields: SelfFieldStyle::PythonSelf,
    import_kinds: &[
        "import_statement",
        "import_from_statement",
        "future_import_statement",
    ],
    import_calls: &[],
    comment_kinds: &["comment"],
    number_kinds: &["integer", "float"],
    wrapper_kinds: &["decorated_definition"],
    attribute_kinds: &[],
    docstrings: true,
    implicit_parameters: &["self", "cls"],
    receiver_field: None,
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "with_statement",
        "try_statement",
        "elif_clause",
        "except_clause",
        "comprehension",
        "conditional_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "with_statement",
        "try_statement",
    ],
    flat_kinds: &[
        "else_clause",
        "elif_clause",
        "except_clause",
        "break_statement",
        "continue_statement",
    ],
    loop_kinds: &["for_statement", "while_statement", "for_in_clause"],
    if_kinds: &["if_statement", "elif_clause", "conditional_expression"],
    break_kinds: &["break_statement"],
    call_kinds: &["call"],
};

const JAVASCRIPT: GrammarSpec = GrammarSpec {
    function_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
    ],
    anonymous_function_kinds: &[
        "arrow_function",
        "function_expression",
        "function",
        "generator_function",
    ],
    class_kinds: &["class_declaration", "class"],
    merge_class_kinds: &[],
    class_filter: ClassFilter::Any,
    field_kinds: &["field_definition"],
    self_fields: SelfFieldStyle::JsThis,
    import_kinds: &["import_statement"],
    import_calls: &[],
    comment_kinds: &["comment"],
    number_kinds: &["number"],
    wrapper_kinds: &["export_statement"],
    attribute_kinds: &["decorator"],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: None,
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "ternary_expression",
        "catch_clause",
        "switch_case",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "try_statement",
    ],
    flat_kinds: &[
        "else_clause",
        "catch_clause",
        "switch_case",
        "break_statement",
        "continue_statement",
    ],
    loop_kinds: &[
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
    ],
    if_kinds: &["if_statement", "ternary_expression"],
    break_kinds: &["break_statement"],
    call_kinds: &["call_expression"],
};

const TYPESCRIPT: GrammarSpec = GrammarSpec {
    function_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "abstract_method_signature",
    ],
    class_kinds: &[
        "class_declaration",
        "abstract_class_declaration",
        "class",
        "interface_declaration",
    ],
    field_kinds: &["public_field_definition", "property_signature"],
    ..JAVASCRIPT
};

const JAVA: GrammarSpec = GrammarSpec {
    function_kinds: &["method_declaration", "constructor_declaration"],
    anonymous_function_kinds: &[],
    class_kinds: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
    ],
    merge_class_kinds: &[],
    class_filter: ClassFilter::Any,
    field_kinds: &["field_declaration", "constant_declaration"],
    self_fields: SelfFieldStyle::None,
    import_kinds: &["import_declaration"],
    import_calls: &[],
    comment_kinds: &["line_comment", "block_comment"],
    number_kinds: &[
        "decimal_integer_literal",
        "hex_integer_literal",
        "octal_integer_literal",
        "binary_integer_literal",
        "decimal_floating_point_literal",
        "hex_floating_point_literal",
    ],
    wrapper_kinds: &[],
    attribute_kinds: &[],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: None,
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "switch_expression",
        "catch_clause",
        "ternary_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
        "switch_expression",
        "try_statement",
    ],
    flat_kinds: &[
        "else_clause",
        "catch_clause",
        "break_statement",
        "continue_statement",
    ],
    loop_kinds: &[
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
    ],
    if_kinds: &["if_statement", "ternary_expression"],
    break_kinds: &["break_statement"],
    call_kinds: &["method_invocation"],
};

const CSHARP: GrammarSpec = GrammarSpec {
    function_kinds: &[
        "method_declaration",
        "constructor_declaration",
        "local_function_statement",
    ],
    anonymous_function_kinds: &[],
    class_kinds: &[
        "class_declaration",
        "interface_declaration",
        "struct_declaration",
        "record_declaration",
        "enum_declaration",
    ],
    merge_class_kinds: &[],
    class_filter: ClassFilter::Any,
    field_kinds: &["field_declaration", "property_declaration"],
    self_fields: SelfFieldStyle::None,
    import_kinds: &["using_directive"],
    import_calls: &[],
    comment_kinds: &["comment"],
    number_kinds: &["integer_literal", "real_literal"],
    wrapper_kinds: &[],
    attribute_kinds: &[],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: None,
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "switch_expression",
        "catch_clause",
        "conditional_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
        "switch_expression",
        "try_statement",
    ],
    flat_kinds: &[
        "else_clause",
        "catch_clause",
        "break_statement",
        "continue_statement",
    ],
    loop_kinds: &[
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
    ],
    if_kinds: &["if_statement", "conditional_expression"],
    break_kinds: &["break_statement"],
    call_kinds: &["invocation_expression"],
};

const C: GrammarSpec = GrammarSpec {
    function_kinds: &["function_definition"],
    anonymous_function_kinds: &[],
    class_kinds: &["struct_specifier", "union_specifier"],
    merge_class_kinds: &[],
    class_filter: ClassFilter::RequiresBody,
    field_kinds: &["field_declaration"],
    self_fields: SelfFieldStyle::None,
    import_kinds: &["preproc_include"],
    import_calls: &[],
    comment_kinds: &["comment"],
    number_kinds: &["number_literal"],
    wrapper_kinds: &[],
    attribute_kinds: &[],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: None,
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "case_statement",
        "conditional_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
    ],
    flat_kinds: &[
        "else_clause",
        "case_statement",
        "break_statement",
        "continue_statement",
        "goto_statement",
    ],
    loop_kinds: &["for_statement", "while_statement", "do_statement"],
    if_kinds: &["if_statement", "conditional_expression"],
    break_kinds: &["break_statement"],
    call_kinds: &["call_expression"],
};

const CPP: GrammarSpec = GrammarSpec {
    class_kinds: &["class_specifier", "struct_specifier", "union_specifier"],
    import_kinds: &["preproc_include", "using_declaration"],
    wrapper_kinds: &["template_declaration"],
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "for_range_loop",
        "while_statement",
        "do_statement",
        "switch_statement",
        "case_statement",
        "catch_clause",
        "conditional_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "for_range_loop",
        "while_statement",
        "do_statement",
        "switch_statement",
        "try_statement",
    ],
    flat_kinds: &[
        "else_clause",
        "case_statement",
        "catch_clause",
        "break_statement",
        "continue_statement",
        "goto_statement",
    ],
    loop_kinds: &[
        "for_statement",
        "for_range_loop",
        "while_statement",
        "do_statement",
    ],
    ..C
};

const GO: GrammarSpec = GrammarSpec {
    function_kinds: &["function_declaration", "method_declaration"],
    anonymous_function_kinds: &[],
    class_kinds: &["type_spec"],
    merge_class_kinds: &[],
    class_filter: ClassFilter::GoStructOrInterface,
    field_kinds: &["field_declaration"],
    self_fields: SelfFieldStyle::None,
    import_kinds: &["import_spec"],
    import_calls: &[],
    comment_kinds: &["comment"],
    number_kinds: &["int_literal", "float_literal"],
    wrapper_kinds: &[],
    attribute_kinds: &[],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: Some("receiver"),
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "select_statement",
        "type_switch_statement",
        "expression_switch_statement",
        "expression_case",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "select_statement",
        "type_switch_statement",
        "expression_switch_statement",
    ],
    flat_kinds: &["else_clause", "break_statement", "continue_statement"],
    loop_kinds: &["for_statement"],
    if_kinds: &["if_statement"],
    break_kinds: &["break_statement"],
    call_kinds: &["call_expression"],
};

const RUST: GrammarSpec = GrammarSpec {
    function_kinds: &["function_item", "function_signature_item"],
    anonymous_function_kinds: &[],
    class_kinds: &[
        "struct_item",
        "enum_item",
        "union_item",
        "trait_item",
        "impl_item",
    ],
    merge_class_kinds: &["impl_item"],
    class_filter: ClassFilter::Any,
    field_kinds: &["field_declaration"],
    self_fields: SelfFieldStyle::None,
    import_kinds: &["use_declaration", "extern_crate_declaration"],
    import_calls: &[],
    comment_kinds: &["line_comment", "block_comment"],
    number_kinds: &["integer_literal", "float_literal"],
    wrapper_kinds: &[],
    attribute_kinds: &["attribute_item"],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: None,
    decision_kinds: &[
        "if_expression",
        "match_expression",
        "for_expression",
        "while_expression",
        "loop_expression",
    ],
    nesting_kinds: &[
        "if_expression",
        "match_expression",
        "for_expression",
        "while_expression",
        "loop_expression",
    ],
    flat_kinds: &["else_clause", "break_expression", "continue_expression"],
    loop_kinds: &["for_expression", "while_expression", "loop_expression"],
    if_kinds: &["if_expression"],
    break_kinds: &["break_expression"],
    call_kinds: &["call_expression"],
};

const RUBY: GrammarSpec = GrammarSpec {
    function_kinds: &["method", "singleton_method"],
    anonymous_function_kinds: &[],
    class_kinds: &["class", "module"],
    merge_class_kinds: &[],
    class_filter: ClassFilter::Any,
    field_kinds: &[],
    self_fields: SelfFieldStyle::RubyIvar,
    import_kinds: &[],
    import_calls: &["require", "require_relative"],
    comment_kinds: &["comment"],
    number_kinds: &["integer", "float"],
    wrapper_kinds: &[],
    attribute_kinds: &[],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: None,
    decision_kinds: &[
        "if",
        "unless",
        "while",
        "until",
        "for",
        "case",
        "when",
        "rescue",
        "elsif",
        "conditional",
        "if_modifier",
        "unless_modifier",
    ],
    nesting_kinds: &["if", "unless", "while", "until", "for", "case", "begin"],
    flat_kinds: &["elsif", "else", "when", "rescue", "break", "next", "redo"],
    loop_kinds: &["while", "until", "for", "while_modifier", "until_modifier"],
    if_kinds: &[
        "if",
        "unless",
        "elsif",
        "conditional",
        "if_modifier",
        "unless_modifier",
    ],
    break_kinds: &["break"],
    call_kinds: &["call"],
};

const PHP: GrammarSpec = GrammarSpec {
    function_kinds: &["function_definition", "method_declaration"],
    anonymous_function_kinds: &[],
    class_kinds: &[
        "class_declaration",
        "interface_declaration",
        "trait_declaration",
        "enum_declaration",
    ],
    merge_class_kinds: &[],
    class_filter: ClassFilter::Any,
    field_kinds: &["property_declaration", "const_declaration"],
    self_fields: SelfFieldStyle::None,
    import_kinds: &[
        "namespace_use_declaration",
        "require_expression",
        "require_once_expression",
        "include_expression",
        "include_once_expression",
    ],
    import_calls: &[],
    comment_kinds: &["comment"],
    number_kinds: &["integer", "float"],
    wrapper_kinds: &[],
    attribute_kinds: &["attribute_list"],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: None,
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "catch_clause",
        "else_if_clause",
        "elseif_clause",
        "conditional_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "try_statement",
    ],
    flat_kinds: &[
        "else_clause",
        "else_if_clause",
        "elseif_clause",
        "catch_clause",
        "break_statement",
        "continue_statement",
    ],
    loop_kinds: &[
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
    ],
    if_kinds: &[
        "if_statement",
        "else_if_clause",
        "elseif_clause",
        "conditional_expression",
    ],
    break_kinds: &["break_statement"],
    call_kinds: &["function_call_expression", "member_call_expression"],
};

const BASH: GrammarSpec = GrammarSpec {
    function_kinds: &["function_definition"],
    anonymous_function_kinds: &[],
    class_kinds: &[],
    merge_class_kinds: &[],
    class_filter: ClassFilter::Any,
    field_kinds: &[],
    self_fields: SelfFieldStyle::None,
    import_kinds: &[],
    import_calls: &[],
    comment_kinds: &["comment"],
    number_kinds: &["number"],
    wrapper_kinds: &[],
    attribute_kinds: &[],
    docstrings: false,
    implicit_parameters: &[],
    receiver_field: None,
    decision_kinds: &[
        "if_statement",
        "for_statement",
        "c_style_for_statement",
        "while_statement",
        "case_item",
        "elif_clause",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "c_style_for_statement",
        "while_statement",
        "case_statement",
    ],
    flat_kinds: &["elif_clause", "else_clause"],
    loop_kinds: &["for_statement", "c_style_for_statement", "while_statement"],
    if_kinds: &["if_statement", "elif_clause"],
    break_kinds: &[],
    call_kinds: &["command"],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_function_and_nesting_kinds() {
        for lang in Language::ALL {
            let spec = grammar_for(lang);
            assert!(!spec.function_kinds.is_empty(), "{lang} has no function kinds");
            assert!(!spec.nesting_kinds.is_empty(), "{lang} has no nesting kinds");
            assert!(!spec.comment_kinds.is_empty(), "{lang} has no comment kinds");
        }
    }

    #[test]
    fn test_every_grammar_loads() {
        for lang in Language::ALL {
            let mut parser = tree_sitter::Parser::new();
            assert!(
                parser.set_language(&ts_language(lang)).is_ok(),
                "{lang} grammar failed to load"
            );
        }
    }

    #[test]
    fn test_typescript_extends_javascript() {
        assert!(TYPESCRIPT.is_class("interface_declaration"));
        assert!(TYPESCRIPT.is_anonymous_function("arrow_function"));
        assert_eq!(TYPESCRIPT.decision_kinds, JAVASCRIPT.decision_kinds);
    }

    #[test]
    fn test_logical_operator() {
        assert!(is_logical_operator("&&"));
        assert!(is_logical_operator("or"));
        assert!(!is_logical_operator("+"));
    }

    #[test]
    fn test_merge_kinds_are_class_kinds() {
        for lang in Language::ALL {
            let spec = grammar_for(lang);
            for kind in spec.merge_class_kinds {
                assert!(spec.is_class(kind));
            }
        }
    }
}
