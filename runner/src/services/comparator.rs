//! Structural comparator with line diffs of rendered values

use shared::Value;
use similar::{ChangeTag, TextDiff};

use crate::traits::{Comparator, Comparison};

/// Deep equality over [`Value`]s.
///
/// Numbers compare with identity semantics (`NaN` equals `NaN`, `0` differs
/// from `-0`). Unequal values carry a `-expected`/`+actual` line diff of
/// their bounded renderings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralComparator;

impl StructuralComparator {
    pub fn new() -> Self {
        Self
    }
}

impl Comparator for StructuralComparator {
    fn compare(&self, actual: &Value, expected: &Value) -> Comparison {
        if actual == expected {
            return Comparison::equal();
        }
        Comparison::different(line_diff(&expected.render(), &actual.render()))
    }
}

/// Unified-style diff, one sign column per line
pub fn line_diff(expected: &str, actual: &str) -> String {
    let expected = format!("{expected}\n");
    let actual = format!("{actual}\n");
    let diff = TextDiff::from_lines(&expected, &actual);

    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(sign);
        out.push_str(change.value());
    }
    out.trim_end().to_string()
}
