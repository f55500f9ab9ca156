//! Algorithmic feature extraction for the complexity predictor.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::parser::{AstSummary, ParsedSource};

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 10;

/// Maximum loop depth fed to the model.
pub const MAX_LOOP_DEPTH: u32 = 5;

/// Raw algorithmic features of a source unit. Flags are 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityFeatures {
    pub no_of_ifs: u32,
    pub no_of_loop: u32,
    pub no_of_break: u32,
    pub priority_queue_present: u32,
    pub no_of_sort: u32,
    pub hash_set_present: u32,
    pub hash_map_present: u32,
    pub recursion_present: u32,
    pub nested_loop_depth: u32,
    pub halving_present: u32,
}

impl ComplexityFeatures {
    /// Feature names in model order.
    pub const NAMES: [&'static str; FEATURE_COUNT] = [
        "no_of_ifs",
        "no_of_loop",
        "no_of_break",
        "priority_queue_present",
        "no_of_sort",
        "hash_set_present",
        "hash_map_present",
        "recursion_present",
        "nested_loop_depth",
        "halving_present",
    ];

    /// Normalized model input: counts through `ln(1+x)`, flags as-is, depth capped.
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        let count = |v: u32| (1.0 + f64::from(v)).ln();
        let flag = |v: u32| if v > 0 { 1.0 } else { 0.0 };
        [
            count(self.no_of_ifs),
            count(self.no_of_loop),
            count(self.no_of_break),
            flag(self.priority_queue_present),
            count(self.no_of_sort),
            flag(self.hash_set_present),
            flag(self.hash_map_present),
            flag(self.recursion_present),
            f64::from(self.nested_loop_depth.min(MAX_LOOP_DEPTH)),
            flag(self.halving_present),
        ]
    }
}

static PRIORITY_QUEUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(heapq|heappush|heappop|heapify|PriorityQueue|priority_queue|BinaryHeap|SplPriorityQueue|SplMinHeap|SplMaxHeap)\b|\bheap\.(Push|Pop|Init)\b",
    )
    .expect("valid regex")
});

static HASH_SET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(set|frozenset)\(|\b(HashSet|TreeSet|LinkedHashSet|BTreeSet|unordered_set|SortedSet)\b|\bnew Set\b|\bSet<",
    )
    .expect("valid regex")
});

static HASH_MAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(dict|defaultdict|Counter|OrderedDict)\(|\b(HashMap|TreeMap|LinkedHashMap|BTreeMap|Dictionary|unordered_map|Hashtable)\b|\bnew Map\b|\bMap<|\bmap\[|std::map\b",
    )
    .expect("valid regex")
});

static HALVING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"/{1,2}=?\s*2\b|>>=?\s*1\b|\b(bisect\w*|binary_search\w*|binarySearch|BinarySearch|lower_bound|upper_bound)\b",
    )
    .expect("valid regex")
});

const SORT_CALLS: &[&str] = &[
    "sort",
    "sorted",
    "sort_by",
    "sort_by_key",
    "sort_unstable",
    "sort_unstable_by",
    "sort_unstable_by_key",
    "stable_sort",
    "qsort",
    "usort",
    "uasort",
    "uksort",
    "ksort",
    "krsort",
    "asort",
    "arsort",
    "rsort",
    "sortBy",
    "sort_values",
    "Sort",
];

/// Name of the called function, without receivers or module paths.
pub fn callee_name<'a>(call: &Node<'_>, source: &'a [u8]) -> Option<&'a str> {
    let target = call
        .child_by_field_name("function")
        .or_else(|| call.child_by_field_name("method"))
        .or_else(|| call.child_by_field_name("name"))?;
    let text = target.utf8_text(source).ok()?;
    text.rsplit(['.', ':', '>']).next().map(str::trim)
}

/// Extract features from a parsed unit.
///
/// `functions` pairs each callable's short name with its syntax node and is
/// used for recursion detection.
pub fn extract_features(
    parsed: &ParsedSource<'_>,
    summary: &AstSummary,
    functions: &[(&str, Node<'_>)],
) -> ComplexityFeatures {
    let spec = parsed.spec;
    let source = parsed.unit.bytes();
    let mut features = ComplexityFeatures::default();

    let mut cursor = parsed.root_node().walk();
    let mut loop_depth_at_level: Vec<u32> = vec![0; 64];
    'walk: loop {
        let node = cursor.node();
        let level = cursor.depth() as usize;
        if level + 1 >= loop_depth_at_level.len() {
            loop_depth_at_level.resize(level + 16, 0);
        }
        let depth = loop_depth_at_level[level];
        let kind = node.kind();
        let named = node.is_named();

        let mut child_depth = depth;
        if named && spec.loop_kinds.contains(&kind) {
            features.no_of_loop += 1;
            features.nested_loop_depth = features.nested_loop_depth.max(depth + 1);
            child_depth = depth + 1;
        } else if named && spec.if_kinds.contains(&kind) {
            features.no_of_ifs += 1;
        } else if named && spec.break_kinds.contains(&kind) {
            features.no_of_break += 1;
        } else if named && spec.call_kinds.contains(&kind) {
            let is_sort = callee_name(&node, source).is_some_and(|n| SORT_CALLS.contains(&n))
                || parsed.node_text(&node).starts_with("sort.");
            if is_sort {
                features.no_of_sort += 1;
            }
        } else if named && matches!(kind, "set" | "set_comprehension") {
            features.hash_set_present = 1;
        } else if named && matches!(kind, "dictionary" | "dictionary_comprehension" | "hash") {
            features.hash_map_present = 1;
        }
        loop_depth_at_level[level + 1] = child_depth;

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    for line in code_lines(parsed.unit.content.as_str(), &summary.comment_lines) {
        if features.priority_queue_present == 0 && PRIORITY_QUEUE.is_match(line) {
            features.priority_queue_present = 1;
        }
        if features.hash_set_present == 0 && HASH_SET.is_match(line) {
            features.hash_set_present = 1;
        }
        if features.hash_map_present == 0 && HASH_MAP.is_match(line) {
            features.hash_map_present = 1;
        }
        if features.halving_present == 0 && HALVING.is_match(line) {
            features.halving_present = 1;
        }
    }

    if functions
        .iter()
        .any(|(name, node)| calls_itself(name, node, spec.call_kinds, source))
    {
        features.recursion_present = 1;
    }

    features
}

/// Lines that are not comment-only. `comment_lines` must be ascending.
fn code_lines<'a>(content: &'a str, comment_lines: &'a [u32]) -> impl Iterator<Item = &'a str> {
    content.lines().enumerate().filter_map(move |(i, line)| {
        let line_no = i as u32 + 1;
        comment_lines
            .binary_search(&line_no)
            .is_err()
            .then_some(line)
    })
}

fn calls_itself(name: &str, function: &Node<'_>, call_kinds: &[&str], source: &[u8]) -> bool {
    let short = name.rsplit(['.', ':']).next().unwrap_or(name);
    if short.is_empty() || short.starts_with('<') {
        return false;
    }
    let Some(body) = function.child_by_field_name("body") else {
        return false;
    };

    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if call_kinds.contains(&node.kind()) && callee_name(&node, source) == Some(short) {
            return true;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Language, SourceUnit};
    use crate::parser::{extract_declarations, parse_unit};
    use std::time::Duration;

    fn features_of(code: &str, lang: Language) -> ComplexityFeatures {
        let unit = SourceUnit::with_language(None, lang, code.to_string());
        let parsed = parse_unit(&unit, Duration::from_secs(5)).unwrap();
        let summary = extract_declarations(&parsed);

        let mut functions = Vec::new();
        let mut stack = vec![parsed.root_node()];
        while let Some(node) = stack.pop() {
            if parsed.spec.is_function(node.kind()) {
                if let Some(name) = node.child_by_field_name("name") {
                    functions.push((parsed.node_text(&name), node));
                }
            }
            let mut cursor = node.walk();
            stack.extend(node.named_children(&mut cursor));
        }
        extract_features(&parsed, &summary, &functions)
    }

    #[test]
    fn test_nested_loops_depth() {
        let code = "def f(a):\n    for i in a:\n        for j in a:\n            if i == j:\n                break\n";
        let features = features_of(code, Language::Python);
        assert_eq!(features.no_of_loop, 2);
        assert_eq!(features.nested_loop_depth, 2);
        assert_eq!(features.no_of_ifs, 1);
        assert_eq!(features.no_of_break, 1);
        assert_eq!(features.recursion_present, 0);
    }

    #[test]
    fn test_recursion_detected() {
        let code = "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\n";
        let features = features_of(code, Language::Python);
        assert_eq!(features.recursion_present, 1);
    }

    #[test]
    fn test_sort_and_collections() {
        let code = "import heapq\n\ndef f(items):\n    seen = set()\n    counts = dict()\n    items.sort()\n    return sorted(items)\n";
        let features = features_of(code, Language::Python);
        assert_eq!(features.no_of_sort, 2);
        assert_eq!(features.hash_set_present, 1);
        assert_eq!(features.hash_map_present, 1);
        assert_eq!(features.priority_queue_present, 1);
    }

    #[test]
    fn test_halving_in_binary_search() {
        let code = "def search(a, x):\n    lo, hi = 0, len(a)\n    while lo < hi:\n        mid = (lo + hi) // 2\n        if a[mid] < x:\n            lo = mid + 1\n        else:\n            hi = mid\n    return lo\n";
        let features = features_of(code, Language::Python);
        assert_eq!(features.halving_present, 1);
        assert_eq!(features.nested_loop_depth, 1);
    }

    #[test]
    fn test_comments_do_not_count() {
        let code = "// uses a HashMap and sort()\nint f(int x) {\n  return x;\n}\n";
        let features = features_of(code, Language::C);
        assert_eq!(features.hash_map_present, 0);
        assert_eq!(features.no_of_sort, 0);
    }

    #[test]
    fn test_to_vector_normalizes() {
        let features = ComplexityFeatures {
            no_of_loop: 3,
            nested_loop_depth: 9,
            recursion_present: 1,
            ..Default::default()
        };
        let v = features.to_vector();
        assert!((v[1] - 4.0_f64.ln()).abs() < 1e-9);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[7], 1.0);
        assert_eq!(v[8], 5.0);
    }
}
