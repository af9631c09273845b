//! Endpoint set maintenance for cluster directory entries.
//!
//! Directory entries are ordered sequences of endpoint strings with no
//! duplicates; membership is exact string equality. Registration is
//! idempotent append, deregistration filters exact matches and keeps the
//! relative order of the rest.

/// Returns true when `endpoint` is already present in the entry.
pub fn contains(entry: &[String], endpoint: &str) -> bool {
    entry.iter().any(|e| e == endpoint)
}

/// Returns the entry without any occurrence of `endpoint`, preserving the
/// relative order of the remaining strings.
pub fn remove(entry: &[String], endpoint: &str) -> Vec<String> {
    entry
        .iter()
        .filter(|e| e.as_str() != endpoint)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_contains_is_exact_match() {
        let e = entry(&["10.0.0.5:8080", "tcp://10.0.0.5:80"]);
        assert!(contains(&e, "10.0.0.5:8080"));
        assert!(!contains(&e, "10.0.0.5:80"));
    }

    #[test]
    fn test_remove_filters_every_occurrence() {
        let e = entry(&["a", "b", "a"]);
        assert_eq!(remove(&e, "a"), entry(&["b"]));
    }

    #[test]
    fn test_remove_preserves_relative_order() {
        let e = entry(&["c", "a", "b", "a", "d"]);
        assert_eq!(remove(&e, "a"), entry(&["c", "b", "d"]));
    }

    #[test]
    fn test_remove_absent_endpoint_is_identity() {
        let e = entry(&["a", "b"]);
        assert_eq!(remove(&e, "x"), e);
    }
}
