//! Structural fingerprints for duplicate-code detection.
//!
//! A function body is reduced to its token shape: identifiers and literals
//! are normalized, keywords and punctuation are kept. Exact clones share a
//! structural hash; near clones are found by Jaccard similarity over
//! shingles of that shape.

use std::collections::BTreeSet;

use tree_sitter::Node;
use xxhash_rust::xxh3::xxh3_64;

use crate::parser::grammar::GrammarSpec;

/// Tokens per shingle.
const SHINGLE_SIZE: usize = 5;

/// Token shape of one function body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyShape {
    /// Number of normalized tokens.
    pub tokens: usize,
    /// xxh3 hash of the normalized token stream.
    pub hash: u64,
    /// Sorted, deduplicated shingle hashes.
    pub shingles: Vec<u64>,
}

impl BodyShape {
    /// Fingerprint the leaves below `node`.
    pub fn of(node: &Node<'_>, spec: &GrammarSpec) -> Self {
        let tokens = normalized_tokens(node, spec);
        let stream = tokens.join("\u{1f}");
        let shingles: BTreeSet<u64> = if tokens.len() < SHINGLE_SIZE {
            std::iter::once(xxh3_64(stream.as_bytes())).collect()
        } else {
            tokens
                .windows(SHINGLE_SIZE)
                .map(|w| xxh3_64(w.join("\u{1f}").as_bytes()))
                .collect()
        };

        Self {
            tokens: tokens.len(),
            hash: xxh3_64(stream.as_bytes()),
            shingles: shingles.into_iter().collect(),
        }
    }

    /// Jaccard similarity of the shingle sets, in [0, 1].
    pub fn similarity(&self, other: &Self) -> f64 {
        if self.shingles.is_empty() && other.shingles.is_empty() {
            return 1.0;
        }
        let (mut i, mut j, mut shared) = (0, 0, 0usize);
        while i < self.shingles.len() && j < other.shingles.len() {
            match self.shingles[i].cmp(&other.shingles[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        let union = self.shingles.len() + other.shingles.len() - shared;
        shared as f64 / union as f64
    }

    /// Upper bound on [`similarity`](Self::similarity) from set sizes alone.
    pub fn similarity_bound(&self, other: &Self) -> f64 {
        let (a, b) = (self.shingles.len(), other.shingles.len());
        if a.max(b) == 0 {
            return 1.0;
        }
        a.min(b) as f64 / a.max(b) as f64
    }

    /// Whether two bodies are clones at the given similarity threshold.
    pub fn is_clone_of(&self, other: &Self, threshold: f64) -> bool {
        self.hash == other.hash
            || (self.similarity_bound(other) >= threshold && self.similarity(other) >= threshold)
    }
}

fn normalized_tokens(node: &Node<'_>, spec: &GrammarSpec) -> Vec<&'static str> {
    let mut tokens = Vec::new();
    let mut cursor = node.walk();
    'walk: loop {
        let current = cursor.node();
        let kind = current.kind();
        if spec.is_comment(kind) {
            // skip comment subtrees
        } else if current.child_count() == 0 || is_literal(kind) {
            tokens.push(normalize(kind, current.is_named()));
        } else if cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.node() == *node {
                break 'walk;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
    tokens
}

fn is_literal(kind: &str) -> bool {
    kind.contains("string")
        || kind.contains("number")
        || kind.contains("integer")
        || kind.contains("float")
        || kind.ends_with("_literal")
        || kind == "char"
}

fn normalize(kind: &'static str, named: bool) -> &'static str {
    if is_literal(kind) || matches!(kind, "true" | "false" | "null" | "nil" | "none" | "None") {
        "LIT"
    } else if named && (kind.contains("identifier") || kind.ends_with("name") || kind == "constant")
    {
        "ID"
    } else {
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Language, SourceUnit};
    use crate::parser::parse_unit;
    use std::time::Duration;

    fn shapes(code: &str, lang: Language) -> Vec<BodyShape> {
        let unit = SourceUnit::with_language(None, lang, code.to_string());
        let parsed = parse_unit(&unit, Duration::from_secs(5)).unwrap();
        let mut out = Vec::new();
        let mut stack = vec![parsed.root_node()];
        while let Some(node) = stack.pop() {
            if parsed.spec.is_function(node.kind()) {
                if let Some(body) = node.child_by_field_name("body") {
                    out.push(BodyShape::of(&body, parsed.spec));
                }
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    #[test]
    fn test_renamed_clone_has_same_hash() {
        let code = "def a(x):\n    total = 0\n    for v in x:\n        total += v * 2\n    return total\n\ndef b(items):\n    acc = 0\n    for it in items:\n        acc += it * 3\n    return acc\n";
        let s = shapes(code, Language::Python);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].hash, s[1].hash);
        assert!(s[0].is_clone_of(&s[1], 0.9));
    }

    #[test]
    fn test_different_bodies_are_not_clones() {
        let code = "def a(x):\n    return x + 1\n\ndef b(x):\n    while x > 0:\n        x -= 1\n        if x == 5:\n            break\n    return x\n";
        let s = shapes(code, Language::Python);
        assert_ne!(s[0].hash, s[1].hash);
        assert!(!s[0].is_clone_of(&s[1], 0.9));
    }

    #[test]
    fn test_comments_do_not_change_shape() {
        let code = "int a(int x) {\n  // note\n  return x * 2;\n}\nint b(int y) {\n  return y * 2;\n}\n";
        let s = shapes(code, Language::C);
        assert_eq!(s[0].hash, s[1].hash);
        assert_eq!(s[0].tokens, s[1].tokens);
    }

    #[test]
    fn test_similarity_bounds() {
        let a = BodyShape {
            tokens: 10,
            hash: 1,
            shingles: vec![1, 2, 3, 4],
        };
        let b = BodyShape {
            tokens: 10,
            hash: 2,
            shingles: vec![1, 2, 3, 5],
        };
        assert!((a.similarity(&b) - 3.0 / 5.0).abs() < 1e-9);
        assert!((a.similarity(&a) - 1.0).abs() < 1e-9);
        assert!(a.similarity_bound(&b) >= a.similarity(&b));
    }
}
