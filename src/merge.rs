//! Deep merge of configuration trees
//!
//! This module combines two configuration trees so that a more specific
//! document can override scalars and extend lists of a less specific one.
//!
//! ## Rules
//!
//! For every key in the source mapping:
//!
//! - key absent in the target: the source value is copied in
//! - both values are mappings: merged recursively
//! - both values are sequences of strings: set-like union, target order first
//! - both values are any other sequences: source items appended
//! - anything else (type mismatch, scalars, null): the source value replaces
//!   the target value
//!
//! Merging a null source is a no-op, which makes [`merge`] safe to call
//! speculatively with a lookup result.
//!
//! Substructures taken from the source are always deep-cloned before being
//! attached to the target, so merged trees never share data with the
//! documents they were built from.

use log::{debug, trace};
use serde_json::map::Entry;

use crate::value::{type_name, Map, Value};

/// Merge `src` into `dst`, with `src` taking precedence.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use uniconf::merge::merge;
///
/// let mut dst = json!({"v": 1, "steps": ["build"], "params": {"a": 1}});
/// merge(&mut dst, &json!({"v": 2, "steps": ["build", "test"], "params": {"b": 2}}));
/// assert_eq!(dst, json!({"v": 2, "steps": ["build", "test"], "params": {"a": 1, "b": 2}}));
/// ```
pub fn merge(dst: &mut Value, src: &Value) {
    if src.is_null() {
        return;
    }
    merge_values(dst, src, "");
}

/// Consuming variant of [`merge`] for fold-style use.
pub fn merged(mut dst: Value, src: &Value) -> Value {
    merge(&mut dst, src);
    dst
}

/// Merge the entries of `src` into the mapping `dst`.
pub fn merge_maps(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    merge_entries(dst, src, "");
}

/// Recursively merge source into target
///
/// `path` is the dotted location of `target`, used for logging only.
fn merge_values(target: &mut Value, source: &Value, path: &str) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            merge_entries(target_map, source_map, path);
        }
        (Value::Array(target_seq), Value::Array(source_seq)) => {
            merge_sequences(target_seq, source_seq, path);
        }
        (target, source) => {
            if !target.is_null() && type_name(target) != type_name(source) {
                debug!(
                    "Type mismatch at path '{}': replacing {} with {}",
                    path,
                    type_name(target),
                    type_name(source)
                );
            } else {
                trace!("Overriding value at path '{}'", path);
            }
            *target = source.clone();
        }
    }
}

fn merge_entries(target: &mut Map<String, Value>, source: &Map<String, Value>, path: &str) {
    for (key, value) in source {
        let new_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };
        match target.entry(key.clone()) {
            Entry::Occupied(mut existing) => merge_values(existing.get_mut(), value, &new_path),
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
            }
        }
    }
}

fn merge_sequences(target: &mut Vec<Value>, source: &[Value], path: &str) {
    if is_string_list(target) && is_string_list(source) {
        for item in source {
            if !target.contains(item) {
                target.push(item.clone());
            }
        }
    } else {
        trace!(
            "Appending {} items to sequence at path '{}' (size {})",
            source.len(),
            path,
            target.len()
        );
        target.extend(source.iter().cloned());
    }
}

/// Whether every item of a sequence is a string.
///
/// Empty sequences count as string lists, so merging strings into an empty
/// list still deduplicates.
pub fn is_string_list(items: &[Value]) -> bool {
    items.iter().all(Value::is_string)
}
