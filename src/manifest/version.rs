use std::cmp::Ordering;
use std::sync::Arc;

use super::Manifest;

/// Caller-supplied ordering between two version strings.
pub type VersionComparator = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// Whether `a` is at least as new as `b`, using `comparator` when given.
pub fn version_greater_or_equal(
    a: &Manifest,
    b: &Manifest,
    comparator: Option<&VersionComparator>,
) -> bool {
    let ordering = match comparator {
        Some(compare) => compare(a.version.as_str(), b.version.as_str()),
        None => compare_versions(&a.version, &b.version),
    };
    ordering != Ordering::Less
}

/// Normalize version string by removing 'v' prefix and cleaning up.
fn normalize_version(version: &str) -> &str {
    version.trim().trim_start_matches('v')
}

/// Compare two dotted versions numerically, segment by segment.
///
/// Missing segments count as zero. Versions that do not start with a number
/// fall back to plain string ordering.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = normalize_version(a);
    let b = normalize_version(b);
    let parts_a = parse_version_parts(a);
    let parts_b = parse_version_parts(b);
    if parts_a.is_empty() || parts_b.is_empty() {
        return a.cmp(b);
    }

    let max_len = parts_a.len().max(parts_b.len());
    for i in 0..max_len {
        let a_part = parts_a.get(i).copied().unwrap_or(0);
        let b_part = parts_b.get(i).copied().unwrap_or(0);
        match a_part.cmp(&b_part) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    Ordering::Equal
}

/// Parse the leading numeric segments ("1.2.3-beta" -> [1, 2, 3]).
fn parse_version_parts(version: &str) -> Vec<u64> {
    let mut parts = Vec::new();
    for segment in version.split('.') {
        let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
        match digits.parse::<u64>() {
            Ok(value) => parts.push(value),
            Err(_) => break,
        }
    }
    parts
}
