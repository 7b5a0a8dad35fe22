//! Categorized diff result: the three buckets a comparison can produce.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One point of disagreement between the two sides.
///
/// A one-sided presence leaves the other field `None`; a value mismatch
/// carries both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry<O> {
    pub key: String,
    pub left: Option<O>,
    pub right: Option<O>,
}

/// Accumulated comparison outcome, owned by a single comparison attempt and
/// discarded after reporting.
///
/// Bucket order is insertion order; the diff engine feeds entries in sorted
/// key order, so renders are deterministic.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult<O> {
    pub only_in_left: Vec<DiffEntry<O>>,
    pub only_in_right: Vec<DiffEntry<O>>,
    pub value_mismatch: Vec<DiffEntry<O>>,
}

impl<O> Default for DiffResult<O> {
    fn default() -> Self {
        Self {
            only_in_left: Vec::new(),
            only_in_right: Vec::new(),
            value_mismatch: Vec::new(),
        }
    }
}

impl<O> DiffResult<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff any bucket is non-empty.
    pub fn has_difference(&self) -> bool {
        !self.only_in_left.is_empty()
            || !self.only_in_right.is_empty()
            || !self.value_mismatch.is_empty()
    }

    /// Record keys present only on the left side.
    pub fn add_only_in_left(&mut self, left: BTreeMap<String, O>) {
        for (key, value) in left {
            self.only_in_left.push(DiffEntry {
                key,
                left: Some(value),
                right: None,
            });
        }
    }

    /// Record keys present only on the right side.
    pub fn add_only_in_right(&mut self, right: BTreeMap<String, O>) {
        for (key, value) in right {
            self.only_in_right.push(DiffEntry {
                key,
                left: None,
                right: Some(value),
            });
        }
    }

    /// Record keys present on both sides whose values differ.
    pub fn add_value_mismatch(&mut self, differing: BTreeMap<String, (O, O)>) {
        for (key, (left, right)) in differing {
            self.value_mismatch.push(DiffEntry {
                key,
                left: Some(left),
                right: Some(right),
            });
        }
    }
}

impl<O: Serialize> fmt::Display for DiffResult<O> {
    /// Renders JSON; an empty result renders the explicit `DiffResult{}`
    /// marker so "no differences" stays greppable in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_difference() {
            return f.write_str("DiffResult{}");
        }
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("DiffResult{unserializable}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_has_no_difference() {
        let result: DiffResult<i64> = DiffResult::new();
        assert!(!result.has_difference());
    }

    #[test]
    fn test_empty_result_renders_marker() {
        let result: DiffResult<i64> = DiffResult::new();
        assert_eq!(result.to_string(), "DiffResult{}");
    }

    #[test]
    fn test_any_bucket_flips_has_difference() {
        let mut left_only: DiffResult<i64> = DiffResult::new();
        left_only.add_only_in_left(BTreeMap::from([("a".to_string(), 1)]));
        assert!(left_only.has_difference());

        let mut right_only: DiffResult<i64> = DiffResult::new();
        right_only.add_only_in_right(BTreeMap::from([("b".to_string(), 2)]));
        assert!(right_only.has_difference());

        let mut mismatch: DiffResult<i64> = DiffResult::new();
        mismatch.add_value_mismatch(BTreeMap::from([("c".to_string(), (1, 2))]));
        assert!(mismatch.has_difference());
    }

    #[test]
    fn test_non_empty_result_renders_json() {
        let mut result: DiffResult<i64> = DiffResult::new();
        result.add_value_mismatch(BTreeMap::from([("a".to_string(), (1, 2))]));

        let rendered = result.to_string();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["value_mismatch"][0]["key"], "a");
        assert_eq!(parsed["value_mismatch"][0]["left"], 1);
        assert_eq!(parsed["value_mismatch"][0]["right"], 2);
        assert!(parsed["only_in_left"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut result: DiffResult<i64> = DiffResult::new();
        result.add_only_in_left(BTreeMap::from([
            ("b".to_string(), 2),
            ("a".to_string(), 1),
        ]));
        // BTreeMap feeds entries in sorted key order.
        let keys: Vec<&str> = result.only_in_left.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
