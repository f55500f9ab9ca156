//! Source unit representation.

use std::path::{Path, PathBuf};

use super::{Error, Language, Result};

/// One file's worth of source text, ingested for a single analysis.
///
/// Immutable once built; every stage borrows it.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path or upload name, when the caller supplied one.
    pub path: Option<PathBuf>,
    /// Detected language.
    pub language: Language,
    /// Raw text. Invalid UTF-8 is replaced on ingest.
    pub content: String,
    /// blake3 digest of the content, hex encoded.
    pub fingerprint: String,
}

impl SourceUnit {
    /// Ingest content, resolving the language from the path or the content.
    pub fn ingest(path: Option<&Path>, content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        let language = Language::resolve(path, &content)?;
        Ok(Self::with_language(path.map(Path::to_path_buf), language, content))
    }

    /// Ingest raw bytes, replacing invalid UTF-8 sequences.
    pub fn ingest_bytes(path: Option<&Path>, bytes: &[u8]) -> Result<Self> {
        Self::ingest(path, String::from_utf8_lossy(bytes).into_owned())
    }

    /// Load a source file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        Self::ingest_bytes(Some(path), &bytes)
    }

    /// Create from content with an already-known language.
    pub fn with_language(path: Option<PathBuf>, language: Language, content: String) -> Self {
        let fingerprint = blake3::hash(content.as_bytes()).to_hex().to_string();
        Self {
            path,
            language,
            content,
            fingerprint,
        }
    }

    /// Display name for logs and reports.
    pub fn display_path(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<content>".to_string())
    }

    /// Whether the unit holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Count total lines. Never less than one.
    pub fn line_count(&self) -> usize {
        line_count(&self.content)
    }

    /// Source bytes, as handed to the parser.
    pub fn bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }
}

/// Number of lines in `text`, counting an empty text as one line.
pub fn line_count(text: &str) -> usize {
    text.lines().count().max(1)
}
