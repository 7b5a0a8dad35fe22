//! Structural diff engine.
//!
//! Pure symmetric difference between two values of the same shape, under a
//! caller-supplied equivalence. Both sides are normalized to keyed
//! collections (see [`input`]), then bucketed into only-left, only-right,
//! and value-mismatch.

pub mod input;
pub mod result;

use std::collections::BTreeMap;

pub use input::Diffable;
pub use result::{DiffEntry, DiffResult};

use crate::error::DiffError;

/// Compare two same-shaped values.
///
/// `equivalence` decides equality for values under the same key; native
/// `==` is never consulted. When `zero` is set, one-sided entries whose
/// value is equivalence-equal to it are suppressed — one backing store may
/// materialize an all-default record where the other stores nothing, and
/// without the filter every comparison reports that pair as a mismatch.
/// The value-mismatch bucket is never filtered: both sides exist and
/// disagree, which is always a genuine signal.
pub fn diff<E>(
    left: &E,
    right: &E,
    key_extractor: Option<&dyn Fn(&E::Item) -> String>,
    equivalence: &dyn Fn(&E::Item, &E::Item) -> bool,
    zero: Option<&E::Item>,
) -> Result<DiffResult<E::Item>, DiffError>
where
    E: Diffable,
    E::Item: Clone,
{
    let left_map = left.normalize(key_extractor)?;
    let right_map = right.normalize(key_extractor)?;
    Ok(diff_maps(left_map, right_map, equivalence, zero))
}

fn diff_maps<O: Clone>(
    left: BTreeMap<String, O>,
    right: BTreeMap<String, O>,
    equivalence: &dyn Fn(&O, &O) -> bool,
    zero: Option<&O>,
) -> DiffResult<O> {
    let mut only_in_left = BTreeMap::new();
    let mut only_in_right = BTreeMap::new();
    let mut value_mismatch = BTreeMap::new();

    let is_zero = |v: &O| zero.is_some_and(|z| equivalence(v, z));

    for (key, left_value) in &left {
        match right.get(key) {
            Some(right_value) => {
                if !equivalence(left_value, right_value) {
                    value_mismatch
                        .insert(key.clone(), (left_value.clone(), right_value.clone()));
                }
            }
            None => {
                if !is_zero(left_value) {
                    only_in_left.insert(key.clone(), left_value.clone());
                }
            }
        }
    }

    for (key, right_value) in &right {
        if !left.contains_key(key) && !is_zero(right_value) {
            only_in_right.insert(key.clone(), right_value.clone());
        }
    }

    let mut result = DiffResult::new();
    result.add_only_in_left(only_in_left);
    result.add_only_in_right(only_in_right);
    result.add_value_mismatch(value_mismatch);
    result
}
