//! Shape normalization for the diff engine.
//!
//! The engine compares exactly one thing: two keyed collections. Everything
//! else — lists, maps, scalars — is normalized into a `BTreeMap` once, at
//! the call boundary, through a [`Diffable`] impl. The shapes:
//!
//! - `Vec<O>`: list-shaped, keyed through the extractor; a duplicate key on
//!   one side fails fast rather than silently dropping an element.
//! - `BTreeMap<String, O>` / `HashMap<String, O>`: map-shaped, existing keys
//!   used as-is.
//! - `Option<O>`: scalar-shaped; `Some` becomes a single keyed entry, `None`
//!   an empty collection.

use std::collections::{BTreeMap, HashMap};

use crate::error::DiffError;

/// A value the diff engine can compare: anything that normalizes into a
/// deterministically ordered keyed collection.
pub trait Diffable {
    type Item;

    /// Normalize into a keyed collection. `key_extractor` is required by the
    /// list and scalar shapes and ignored by the map shapes.
    fn normalize(
        &self,
        key_extractor: Option<&dyn Fn(&Self::Item) -> String>,
    ) -> Result<BTreeMap<String, Self::Item>, DiffError>;
}

impl<O: Clone> Diffable for Vec<O> {
    type Item = O;

    fn normalize(
        &self,
        key_extractor: Option<&dyn Fn(&O) -> String>,
    ) -> Result<BTreeMap<String, O>, DiffError> {
        let extract = key_extractor.ok_or(DiffError::MissingKeyExtractor("list"))?;
        let mut map = BTreeMap::new();
        for item in self {
            let key = extract(item);
            if map.insert(key.clone(), item.clone()).is_some() {
                return Err(DiffError::DuplicateKey(key));
            }
        }
        Ok(map)
    }
}

impl<O: Clone> Diffable for BTreeMap<String, O> {
    type Item = O;

    fn normalize(
        &self,
        _key_extractor: Option<&dyn Fn(&O) -> String>,
    ) -> Result<BTreeMap<String, O>, DiffError> {
        Ok(self.clone())
    }
}

impl<O: Clone> Diffable for HashMap<String, O> {
    type Item = O;

    fn normalize(
        &self,
        _key_extractor: Option<&dyn Fn(&O) -> String>,
    ) -> Result<BTreeMap<String, O>, DiffError> {
        Ok(self
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl<O: Clone> Diffable for Option<O> {
    type Item = O;

    fn normalize(
        &self,
        key_extractor: Option<&dyn Fn(&O) -> String>,
    ) -> Result<BTreeMap<String, O>, DiffError> {
        let extract = key_extractor.ok_or(DiffError::MissingKeyExtractor("scalar"))?;
        let mut map = BTreeMap::new();
        if let Some(value) = self {
            map.insert(extract(value), value.clone());
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_key(v: &i64) -> String {
        v.to_string()
    }

    #[test]
    fn test_list_normalizes_by_extracted_key() {
        let list = vec![3_i64, 1, 2];
        let map = list.normalize(Some(&identity_key)).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["1"], 1);
        assert_eq!(map["3"], 3);
    }

    #[test]
    fn test_list_without_extractor_is_an_error() {
        let list = vec![1_i64];
        let err = list.normalize(None).unwrap_err();
        assert!(matches!(err, DiffError::MissingKeyExtractor("list")));
    }

    #[test]
    fn test_duplicate_key_fails_fast() {
        let list = vec![7_i64, 7];
        let err = list.normalize(Some(&identity_key)).unwrap_err();
        assert!(matches!(err, DiffError::DuplicateKey(k) if k == "7"));
    }

    #[test]
    fn test_hash_map_keys_used_as_is() {
        let map: HashMap<String, i64> =
            HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
        let normalized = map.normalize(None).unwrap();
        assert_eq!(normalized["a"], 1);
        assert_eq!(normalized["b"], 2);
    }

    #[test]
    fn test_absent_scalar_is_empty_not_error() {
        let scalar: Option<i64> = None;
        let map = scalar.normalize(Some(&identity_key)).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_present_scalar_wraps_single_entry() {
        let scalar = Some(42_i64);
        let map = scalar.normalize(Some(&identity_key)).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["42"], 42);
    }
}
