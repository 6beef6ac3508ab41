// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deep merge for layered defaults.
//!
//! Defaults accumulate root -> child -> ... -> leaf -> agent; an inner
//! mapping merges key-by-key, anything else replaces wholesale.

use serde_yaml::Value;

/// Overlay `overlay` onto `base`, recursing through mappings.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_child) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_child) => deep_merge(base_child, overlay_child),
                    None => {
                        base_map.insert(key.clone(), overlay_child.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

/// Fold a defaults chain (outermost first) into one mapping.
pub fn fold_defaults(chain: &[Value]) -> Value {
    let mut merged = Value::Mapping(serde_yaml::Mapping::new());
    for layer in chain {
        deep_merge(&mut merged, layer);
    }
    merged
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
