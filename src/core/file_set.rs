//! Source files collected for directory analysis.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use super::{Error, Language, Result};

/// A set of source files under a directory, respecting .gitignore.
#[derive(Debug, Clone)]
pub struct FileSet {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FileSet {
    /// Collect every supported source file under `path`.
    pub fn from_path(path: impl AsRef<Path>, exclude_patterns: &[String]) -> Result<Self> {
        let root = path.as_ref().canonicalize()?;
        let excludes = build_globset(exclude_patterns)?;
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();

            if path.is_dir() || Language::detect(path).is_none() {
                continue;
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            if excludes.is_match(relative) || excludes.is_match(path) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();

        Ok(Self { root, files })
    }

    /// Canonical directory the walk started from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths in sorted order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `path` relative to the root, or unchanged when it lies outside it.
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::InvalidArgument(format!("bad exclude pattern {pattern}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::InvalidArgument(e.to_string()))
}
