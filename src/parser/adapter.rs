//! Per-language adapters behind a common trait.

use std::path::Path;
use std::time::Duration;

use crate::core::{Error, Language, Result, SourceUnit};

use super::grammar::{grammar_for, GrammarSpec};
use super::{extract_declarations, parse_unit, AstSummary, ParsedSource};

/// Contract every supported language fulfils.
pub trait LanguageAdapter: Send + Sync {
    /// The language handled by this adapter.
    fn language(&self) -> Language;

    /// File extensions claimed by the adapter, without the leading dot.
    fn extensions(&self) -> &'static [&'static str] {
        self.language().extensions()
    }

    /// Whether the adapter should handle this input.
    fn detect(&self, path: Option<&Path>, content: &str) -> bool;

    /// Parse with a time budget. Syntax errors yield a partial tree, not an error.
    fn parse<'u>(&self, unit: &'u SourceUnit, budget: Duration) -> Result<ParsedSource<'u>>;

    /// Collect declarations and line facts from a parsed tree.
    fn extract_declarations(&self, parsed: &ParsedSource<'_>) -> AstSummary;
}

/// Adapter driven entirely by a grammar table.
#[derive(Debug, Clone, Copy)]
pub struct GrammarAdapter {
    language: Language,
    spec: &'static GrammarSpec,
}

impl GrammarAdapter {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            spec: grammar_for(language),
        }
    }

    /// Node kind tables used by this adapter.
    pub fn spec(&self) -> &'static GrammarSpec {
        self.spec
    }
}

impl LanguageAdapter for GrammarAdapter {
    fn language(&self) -> Language {
        self.language
    }

    fn detect(&self, path: Option<&Path>, content: &str) -> bool {
        match path.and_then(Language::detect) {
            Some(lang) => lang == self.language,
            None => Language::detect_content(content) == Some(self.language),
        }
    }

    fn parse<'u>(&self, unit: &'u SourceUnit, budget: Duration) -> Result<ParsedSource<'u>> {
        if unit.language != self.language {
            return Err(Error::internal(format!(
                "{} adapter asked to parse {} source",
                self.language, unit.language
            )));
        }
        parse_unit(unit, budget)
    }

    fn extract_declarations(&self, parsed: &ParsedSource<'_>) -> AstSummary {
        extract_declarations(parsed)
    }
}

/// Lookup table of adapters by language.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn LanguageAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    /// Registry with an adapter for every supported language.
    pub fn new() -> Self {
        let adapters = Language::ALL
            .iter()
            .map(|lang| Box::new(GrammarAdapter::new(*lang)) as Box<dyn LanguageAdapter>)
            .collect();
        Self { adapters }
    }

    /// Adapter for a known language.
    pub fn for_language(&self, language: Language) -> Result<&dyn LanguageAdapter> {
        self.adapters
            .iter()
            .find(|a| a.language() == language)
            .map(|a| a.as_ref())
            .ok_or_else(|| Error::unsupported(language.to_string()))
    }

    /// First adapter that claims the input, in registration order.
    pub fn detect(&self, path: Option<&Path>, content: &str) -> Result<&dyn LanguageAdapter> {
        if let Some(adapter) = self.adapters.iter().find(|a| a.detect(path, content)) {
            return Ok(adapter.as_ref());
        }
        let hint = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "content did not match any supported grammar".to_string());
        Err(Error::unsupported(hint))
    }

    /// Registry over a custom adapter set.
    pub fn with_adapters(adapters: Vec<Box<dyn LanguageAdapter>>) -> Self {
        Self { adapters }
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::DeclarationKind;

    #[test]
    fn test_registry_covers_every_language() {
        let registry = AdapterRegistry::new();
        assert_eq!(registry.len(), Language::ALL.len());
        for lang in Language::ALL {
            assert_eq!(registry.for_language(lang).unwrap().language(), lang);
        }
    }

    #[test]
    fn test_detect_by_extension_then_content() {
        let registry = AdapterRegistry::new();
        let adapter = registry
            .detect(Some(Path::new("app/models.py")), "")
            .unwrap();
        assert_eq!(adapter.language(), Language::Python);

        let adapter = registry
            .detect(None, "#!/usr/bin/env python3\nprint('hi')\n")
            .unwrap();
        assert_eq!(adapter.language(), Language::Python);
    }

    #[test]
    fn test_detect_unknown_is_unsupported() {
        let registry = AdapterRegistry::new();
        let err = registry
            .detect(Some(Path::new("notes.txt")), "hello there")
            .err()
            .unwrap();
        assert_eq!(err.kind(), "unsupported_language");
    }

    /// Claims every `.tmpl` file as Go, whatever the content says.
    struct TemplateAdapter;

    impl LanguageAdapter for TemplateAdapter {
        fn language(&self) -> Language {
            Language::Go
        }

        fn detect(&self, path: Option<&Path>, _content: &str) -> bool {
            path.and_then(|p| p.extension())
                .is_some_and(|ext| ext == "tmpl")
        }

        fn parse<'u>(&self, unit: &'u SourceUnit, budget: Duration) -> Result<ParsedSource<'u>> {
            parse_unit(unit, budget)
        }

        fn extract_declarations(&self, parsed: &ParsedSource<'_>) -> AstSummary {
            extract_declarations(parsed)
        }
    }

    #[test]
    fn test_detect_asks_each_adapter() {
        let registry = AdapterRegistry::with_adapters(vec![
            Box::new(TemplateAdapter),
            Box::new(GrammarAdapter::new(Language::Python)),
        ]);
        let adapter = registry
            .detect(Some(Path::new("page.tmpl")), "def f():\n    pass\n")
            .unwrap();
        assert_eq!(adapter.language(), Language::Go);

        let adapter = registry.detect(Some(Path::new("page.py")), "").unwrap();
        assert_eq!(adapter.language(), Language::Python);

        // Recognized extension of a language with no registered adapter.
        let err = registry
            .detect(Some(Path::new("main.rs")), "fn main() {}\n")
            .err()
            .unwrap();
        assert_eq!(err.kind(), "unsupported_language");
    }

    #[test]
    fn test_adapter_detect_matches_own_language() {
        let adapter = GrammarAdapter::new(Language::Go);
        assert!(adapter.detect(Some(Path::new("main.go")), ""));
        assert!(!adapter.detect(Some(Path::new("main.rs")), ""));
        assert!(adapter.extensions().contains(&"go"));
    }

    #[test]
    fn test_adapter_parse_and_extract() {
        let adapter = GrammarAdapter::new(Language::Rust);
        let unit = SourceUnit::with_language(
            None,
            Language::Rust,
            "fn answer() -> u32 { 42 }\n".to_string(),
        );
        let parsed = adapter.parse(&unit, Duration::from_secs(5)).unwrap();
        let summary = adapter.extract_declarations(&parsed);
        assert_eq!(summary.names(DeclarationKind::Function), vec!["answer"]);
    }

    #[test]
    fn test_adapter_rejects_foreign_units() {
        let adapter = GrammarAdapter::new(Language::Rust);
        let unit = SourceUnit::with_language(None, Language::Python, "x = 1\n".to_string());
        assert!(adapter.parse(&unit, Duration::from_secs(5)).is_err());
    }
}
