//! Language detection and enumeration.
//!
//! Detection runs in a fixed order: file extension, shebang line, PHP opener,
//! then keyword-density scoring over the content. Pasted snippets with no
//! usable filename rely entirely on the content heuristics.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Supported programming languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Rust,
    Python,
    TypeScript,
    JavaScript,
    Tsx,
    Jsx,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Bash,
}

/// Minimum keyword-density score before a content guess is trusted.
const MIN_CONTENT_EVIDENCE: f64 = 3.0;

/// Matches of a single signal beyond this count add nothing.
const MAX_SIGNAL_HITS: usize = 3;

impl Language {
    /// Every supported language, in tie-break order for content detection.
    pub const ALL: [Language; 14] = [
        Self::Python,
        Self::Java,
        Self::JavaScript,
        Self::TypeScript,
        Self::Cpp,
        Self::CSharp,
        Self::Php,
        Self::C,
        Self::Go,
        Self::Rust,
        Self::Ruby,
        Self::Bash,
        Self::Tsx,
        Self::Jsx,
    ];

    /// Detect language from file path based on extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::from_extension(extension)
    }

    /// Get language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "go" => Some(Self::Go),
            "rs" => Some(Self::Rust),
            "py" | "pyi" => Some(Self::Python),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "tsx" => Some(Self::Tsx),
            "jsx" => Some(Self::Jsx),
            "java" => Some(Self::Java),
            "c" | "h" => Some(Self::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Some(Self::Cpp),
            "cs" => Some(Self::CSharp),
            "rb" | "rake" | "gemspec" => Some(Self::Ruby),
            "php" => Some(Self::Php),
            "sh" | "bash" => Some(Self::Bash),
            _ => None,
        }
    }

    /// Guess the language from content alone.
    pub fn detect_content(content: &str) -> Option<Self> {
        if let Some(lang) = detect_shebang(content) {
            return Some(lang);
        }
        if content.trim_start().starts_with("<?php") {
            return Some(Self::Php);
        }
        detect_by_keywords(content)
    }

    /// Resolve the language of a source unit from its path and content.
    ///
    /// The extension wins when it is recognized; otherwise the content
    /// heuristics decide. Fails with [`Error::UnsupportedLanguage`] when
    /// nothing matches.
    pub fn resolve(path: Option<&Path>, content: &str) -> Result<Self> {
        if let Some(lang) = path.and_then(Self::detect) {
            return Ok(lang);
        }
        if let Some(lang) = Self::detect_content(content) {
            return Ok(lang);
        }
        let hint = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "content did not match any supported grammar".to_string());
        Err(Error::unsupported(hint))
    }

    /// Get the display name for the language.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Go => "Go",
            Self::Rust => "Rust",
            Self::Python => "Python",
            Self::TypeScript => "TypeScript",
            Self::JavaScript => "JavaScript",
            Self::Tsx => "TSX",
            Self::Jsx => "JSX",
            Self::Java => "Java",
            Self::C => "C",
            Self::Cpp => "C++",
            Self::CSharp => "C#",
            Self::Ruby => "Ruby",
            Self::Php => "PHP",
            Self::Bash => "Bash",
        }
    }

    /// File extensions (without the dot) claimed by this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Go => &["go"],
            Self::Rust => &["rs"],
            Self::Python => &["py", "pyi"],
            Self::TypeScript => &["ts", "mts", "cts"],
            Self::JavaScript => &["js", "mjs", "cjs"],
            Self::Tsx => &["tsx"],
            Self::Jsx => &["jsx"],
            Self::Java => &["java"],
            Self::C => &["c", "h"],
            Self::Cpp => &["cpp", "cc", "cxx", "hpp", "hxx", "hh"],
            Self::CSharp => &["cs"],
            Self::Ruby => &["rb", "rake", "gemspec"],
            Self::Php => &["php"],
            Self::Bash => &["sh", "bash"],
        }
    }

    /// Check if the language supports classes/OOP constructs.
    pub fn supports_classes(&self) -> bool {
        !matches!(self, Self::C | Self::Bash | Self::Go)
    }

    /// Whether comments use `#` rather than C-style markers.
    pub fn uses_hash_comments(&self) -> bool {
        matches!(self, Self::Python | Self::Ruby | Self::Bash)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Every supported extension with a leading dot, paired with its language name.
pub fn supported_extensions() -> Vec<(String, &'static str)> {
    let mut extensions: Vec<(String, &'static str)> = Language::ALL
        .iter()
        .flat_map(|lang| {
            lang.extensions()
                .iter()
                .map(move |ext| (format!(".{ext}"), lang.display_name()))
        })
        .collect();
    extensions.sort();
    extensions
}

fn detect_shebang(content: &str) -> Option<Language> {
    let first = content.lines().next()?.trim();
    let interpreter = first.strip_prefix("#!")?;
    let interpreter = interpreter.to_lowercase();
    if interpreter.contains("python") {
        Some(Language::Python)
    } else if interpreter.contains("node") || interpreter.contains("deno") {
        Some(Language::JavaScript)
    } else if interpreter.contains("ruby") {
        Some(Language::Ruby)
    } else if interpreter.contains("php") {
        Some(Language::Php)
    } else if interpreter.ends_with("sh") || interpreter.contains("bash") {
        Some(Language::Bash)
    } else {
        None
    }
}

struct Signal {
    pattern: Regex,
    weight: f64,
}

fn signals(specs: &[(&str, f64)]) -> Vec<Signal> {
    specs
        .iter()
        .filter_map(|(pattern, weight)| {
            Regex::new(pattern).ok().map(|pattern| Signal {
                pattern,
                weight: *weight,
            })
        })
        .collect()
}

static KEYWORD_SIGNALS: Lazy<Vec<(Language, Vec<Signal>)>> = Lazy::new(|| {
    vec![
        (
            Language::Python,
            signals(&[
                (r"(?m)^\s*def \w+\(.*\)\s*(->\s*[^:]+)?:\s*$", 2.0),
                (r"(?m)^\s*from [\w.]+ import ", 2.0),
                (r"(?m)^\s*import [\w.]+(\s+as\s+\w+)?\s*$", 1.0),
                (r"(?m)^\s*class \w+(\(.*\))?:\s*$", 2.0),
                (r"\bself\.", 1.0),
                (r"(?m)^\s*elif\b", 2.0),
                (r"__name__|__init__", 1.5),
            ]),
        ),
        (
            Language::Java,
            signals(&[
                (r"\bpublic\s+(static\s+)?(final\s+)?(class|interface|enum|void)\b", 2.0),
                (r"System\.out\.print", 2.0),
                (r"(?m)^\s*package\s+[\w.]+;", 2.0),
                (r"(?m)^\s*import\s+[\w.]+(\.\*)?;", 1.5),
                (r"\bString\[\]\s+\w+", 1.5),
                (r"@Override", 1.5),
            ]),
        ),
        (
            Language::CSharp,
            signals(&[
                (r"(?m)^\s*using\s+System", 2.5),
                (r"(?m)^\s*namespace\s+[\w.]+", 1.5),
                (r"Console\.Write", 2.5),
                (r"\{\s*get;\s*(set;)?\s*\}", 2.0),
                (r"\bstring\[\]\s+\w+", 1.0),
            ]),
        ),
        (
            Language::JavaScript,
            signals(&[
                (r"\bconst\s+\w+\s*=", 1.0),
                (r"\blet\s+\w+\s*=", 1.0),
                (r"=>", 1.0),
                (r"\bfunction\s*\w*\s*\(", 1.0),
                (r"console\.log", 2.0),
                (r"\brequire\(['\x22]", 1.5),
                (r"module\.exports|\bexport\s+(default|const|function|class)\b", 1.5),
                (r"\bdocument\.|\bwindow\.", 1.5),
            ]),
        ),
        (
            Language::TypeScript,
            signals(&[
                (r":\s*(string|number|boolean|any|void|unknown)\b", 1.5),
                (r"\binterface\s+\w+\s*\{", 1.5),
                (r"(?m)^\s*(export\s+)?type\s+\w+\s*=", 1.5),
                (r"\b(private|public|readonly)\s+\w+\s*:", 1.5),
            ]),
        ),
        (
            Language::Go,
            signals(&[
                (r"(?m)^\s*package\s+\w+\s*$", 2.0),
                (r"\bfunc\s+(\(\w+\s+\*?\w+\)\s*)?\w+\(", 2.0),
                (r":=", 1.0),
                (r"\bfmt\.", 2.0),
                (r"\bchan\b|\bgo\s+func\b", 1.5),
            ]),
        ),
        (
            Language::Rust,
            signals(&[
                (r"\bfn\s+\w+", 1.5),
                (r"\blet\s+mut\b", 2.0),
                (r"(?m)^\s*impl\b", 2.0),
                (r"\bprintln!|\bvec!|\bformat!", 2.0),
                (r"(?m)^\s*use\s+\w+::", 1.5),
                (r"\bpub\s+(fn|struct|enum|mod)\b", 2.0),
            ]),
        ),
        (
            Language::C,
            signals(&[
                (r"#include\s*<\w+\.h>", 2.0),
                (r"\bprintf\s*\(", 1.5),
                (r"\bmalloc\s*\(|\bfree\s*\(", 1.5),
                (r"\bint\s+main\s*\(", 1.0),
                (r"\bstruct\s+\w+\s*\{", 1.0),
            ]),
        ),
        (
            Language::Cpp,
            signals(&[
                (r"#include\s*<(iostream|vector|string|map|memory|algorithm)>", 2.5),
                (r"\bstd::", 2.0),
                (r"\bcout\b|\bcin\b", 1.5),
                (r"\btemplate\s*<", 1.5),
                (r"\bclass\s+\w+\s*(:\s*(public|private|protected)\s+\w+)?\s*\{", 1.0),
            ]),
        ),
        (
            Language::Ruby,
            signals(&[
                (r"(?m)^\s*def\s+\w+[?!]?\s*(\(.*\))?\s*$", 1.5),
                (r"(?m)^\s*end\s*$", 1.0),
                (r"\bputs\b", 1.5),
                (r"(?m)^\s*require\s+['\x22]", 1.5),
                (r"\battr_(accessor|reader|writer)\b", 2.0),
                (r"\bdo\s*\|\w+", 1.5),
            ]),
        ),
        (
            Language::Php,
            signals(&[
                (r"\$\w+\s*=", 1.0),
                (r"\becho\b", 1.0),
                (r"\$this->", 2.0),
                (r"\bfunction\s+\w+\s*\(\s*\$", 2.0),
            ]),
        ),
        (
            Language::Bash,
            signals(&[
                (r"(?m)^\s*(if|while)\s+\[", 2.0),
                (r"(?m)^\s*(fi|done|esac)\s*$", 2.0),
                (r"(?m)^\s*echo\s+", 1.0),
                (r"(?m)^\s*\w+\(\)\s*\{", 1.5),
                (r"\$\{\w+\}", 1.0),
            ]),
        ),
    ]
});

fn detect_by_keywords(content: &str) -> Option<Language> {
    let scores: Vec<(Language, f64)> = KEYWORD_SIGNALS
        .iter()
        .map(|(lang, signals)| {
            let score = signals
                .iter()
                .map(|s| s.pattern.find_iter(content).take(MAX_SIGNAL_HITS).count() as f64 * s.weight)
                .sum();
            (*lang, score)
        })
        .collect();

    let score_of = |lang: Language| {
        scores
            .iter()
            .find(|(l, _)| *l == lang)
            .map(|(_, s)| *s)
            .unwrap_or(0.0)
    };

    // Supersets: TypeScript is JavaScript with types, C++ usually reads as C.
    let combined = |lang: Language| match lang {
        Language::TypeScript if score_of(Language::TypeScript) > 0.0 => {
            score_of(Language::TypeScript) + score_of(Language::JavaScript)
        }
        Language::Cpp if score_of(Language::Cpp) > 0.0 => {
            score_of(Language::Cpp) + score_of(Language::C)
        }
        other => score_of(other),
    };

    let mut best: Option<(Language, f64)> = None;
    for lang in Language::ALL {
        let score = combined(lang);
        if score < MIN_CONTENT_EVIDENCE {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((lang, score)),
        }
    }
    best.map(|(lang, _)| lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(Language::detect(Path::new("main.go")), Some(Language::Go));
        assert_eq!(Language::detect(Path::new("lib.rs")), Some(Language::Rust));
        assert_eq!(
            Language::detect(Path::new("script.py")),
            Some(Language::Python)
        );
        assert_eq!(
            Language::detect(Path::new("component.tsx")),
            Some(Language::Tsx)
        );
        assert_eq!(
            Language::detect(Path::new("Main.java")),
            Some(Language::Java)
        );
        assert_eq!(Language::detect(Path::new("file.cpp")), Some(Language::Cpp));
        assert_eq!(
            Language::detect(Path::new("Program.cs")),
            Some(Language::CSharp)
        );
        assert_eq!(
            Language::detect(Path::new("index.php")),
            Some(Language::Php)
        );
        assert_eq!(Language::detect(Path::new("README.md")), None);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("go"), Some(Language::Go));
        assert_eq!(Language::from_extension("GO"), Some(Language::Go));
        assert_eq!(Language::from_extension(".py"), Some(Language::Python));
        assert_eq!(Language::from_extension("unknown"), None);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Language::Go.display_name(), "Go");
        assert_eq!(Language::Cpp.display_name(), "C++");
        assert_eq!(Language::CSharp.display_name(), "C#");
    }

    #[test]
    fn test_shebang_detection() {
        assert_eq!(
            Language::detect_content("#!/usr/bin/env python3\nprint('hi')\n"),
            Some(Language::Python)
        );
        assert_eq!(
            Language::detect_content("#!/bin/bash\necho hi\n"),
            Some(Language::Bash)
        );
        assert_eq!(
            Language::detect_content("#!/usr/bin/env node\nconsole.log(1)\n"),
            Some(Language::JavaScript)
        );
    }

    #[test]
    fn test_php_opener() {
        assert_eq!(
            Language::detect_content("<?php\necho 'x';\n"),
            Some(Language::Php)
        );
    }

    #[test]
    fn test_keyword_detection_python() {
        let code = "import os\n\nclass Greeter:\n    def greet(self, name):\n        return name\n";
        assert_eq!(Language::detect_content(code), Some(Language::Python));
    }

    #[test]
    fn test_keyword_detection_java() {
        let code = "package demo;\n\npublic class Main {\n    public static void main(String[] args) {\n        System.out.println(\"hi\");\n    }\n}\n";
        assert_eq!(Language::detect_content(code), Some(Language::Java));
    }

    #[test]
    fn test_keyword_detection_typescript_over_javascript() {
        let code = "interface User {\n  name: string;\n}\nconst greet = (u: User): string => u.name;\nexport const x: number = 1;\n";
        assert_eq!(Language::detect_content(code), Some(Language::TypeScript));
    }

    #[test]
    fn test_keyword_detection_cpp_over_c() {
        let code = "#include <iostream>\n#include <stdio.h>\nint main() {\n  std::cout << 1;\n  printf(\"x\");\n}\n";
        assert_eq!(Language::detect_content(code), Some(Language::Cpp));
    }

    #[test]
    fn test_prose_is_unsupported() {
        let result = Language::resolve(None, "just some meeting notes\nnothing here\n");
        assert!(matches!(result, Err(Error::UnsupportedLanguage { .. })));
    }

    #[test]
    fn test_resolve_prefers_extension() {
        let lang = Language::resolve(Some(Path::new("a.rb")), "def x():\n    pass\n").unwrap();
        assert_eq!(lang, Language::Ruby);
    }

    #[test]
    fn test_resolve_unknown_extension_falls_back_to_content() {
        let lang = Language::resolve(
            Some(Path::new("snippet.txt")),
            "def main():\n    if x:\n        pass\n    elif y:\n        pass\n",
        )
        .unwrap();
        assert_eq!(lang, Language::Python);
    }

    #[test]
    fn test_supported_extensions_sorted_with_dots() {
        let exts = supported_extensions();
        assert!(exts.iter().any(|(e, name)| e == ".java" && *name == "Java"));
        assert!(exts.iter().all(|(e, _)| e.starts_with('.')));
        let mut sorted = exts.clone();
        sorted.sort();
        assert_eq!(exts, sorted);
    }

    #[test]
    fn test_supports_classes() {
        assert!(Language::Java.supports_classes());
        assert!(Language::Python.supports_classes());
        assert!(!Language::Go.supports_classes());
        assert!(!Language::C.supports_classes());
    }
}
