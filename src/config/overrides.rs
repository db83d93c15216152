//! Deep-merge, schema filtering, and hashing for admin RUSLE overrides (C9).
//!
//! Overrides are represented as a recursive JSON object — "a recursive map
//! of scalars and maps" per the design notes — rather than a bespoke tree
//! type, so the deep-merge and key-sort logic is written once and is
//! trivially property-testable. `serde_json::Map` is backed by a
//! `BTreeMap` in this crate's configuration (the `preserve_order` feature
//! is never enabled), so every object is already key-sorted on
//! serialization; there is no separate sort step.

use super::defaults::RusleDefaults;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// An admin override dictionary: a JSON object nested to arbitrary depth,
/// scalars at the leaves.
pub type Overrides = Value;

/// Sentinel `config_hash` used when no overrides apply.
pub const DEFAULT_HASH_SENTINEL: &str = "default";

/// Removes keys from `overrides` that do not exist in `schema` at the same
/// nesting level. Returns an empty object if every key in `overrides` is
/// unknown or `overrides` itself is empty/non-object.
///
/// This mirrors C9's `filter(overrides, schema)`: unknown keys are
/// silently dropped rather than rejected, since the schema is the default
/// tree's own shape.
pub fn filter_overrides(overrides: &Value, schema: &Value) -> Value {
    match (overrides, schema) {
        (Value::Object(overrides_map), Value::Object(schema_map)) => {
            let mut filtered = serde_json::Map::new();
            for (key, value) in overrides_map {
                let Some(schema_value) = schema_map.get(key) else {
                    tracing::debug!(key = %key, "dropping unknown override key");
                    continue;
                };
                let filtered_value = filter_overrides(value, schema_value);
                // Only keep the key if it still carries a scalar or a
                // non-empty object after recursive filtering.
                let keep = match &filtered_value {
                    Value::Object(m) => !m.is_empty(),
                    _ => true,
                };
                if keep {
                    filtered.insert(key.clone(), filtered_value);
                }
            }
            Value::Object(filtered)
        }
        // Leaf override: if the schema side is not an object, the override
        // is a scalar replacing a scalar default — keep it as-is.
        (other, _) if !matches!(schema, Value::Object(_)) => other.clone(),
        _ => Value::Object(serde_json::Map::new()),
    }
}

/// Deep-merges `overrides` onto `base`, with override leaves winning.
/// Arrays and scalars in `overrides` replace the corresponding value in
/// `base` wholesale; only objects recurse.
pub fn deep_merge(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        (_, override_value) => override_value.clone(),
    }
}

/// Produces the effective configuration: the default tree with the
/// *filtered* overrides deep-merged on top (C9 `effective(overrides)`).
pub fn effective_config(raw_overrides: &Value) -> Value {
    let defaults = RusleDefaults::default().to_value();
    let filtered = filter_overrides(raw_overrides, &defaults);
    deep_merge(&defaults, &filtered)
}

/// Hashes the *filtered* overrides together with the defaults version
/// (C9 `hash(overrides, defaults_version)`).
///
/// Returns [`DEFAULT_HASH_SENTINEL`] when the filtered overrides are
/// empty, so anonymous/non-admin callers and admins with no active
/// overrides collapse onto the same fingerprint component (spec §3.1,
/// §4.9).
pub fn hash_overrides(filtered_overrides: &Value, defaults_version: &str) -> String {
    let is_empty = matches!(filtered_overrides, Value::Object(m) if m.is_empty())
        || filtered_overrides.is_null();
    if is_empty {
        return DEFAULT_HASH_SENTINEL.to_string();
    }

    let hashable = serde_json::json!({
        "version": defaults_version,
        "overrides": filtered_overrides,
    });
    // serde_json's Map is BTreeMap-backed here (no `preserve_order`
    // feature), so this serialization is already key-sorted at every
    // level.
    let encoded = serde_json::to_vec(&hashable).expect("hashable value always serializes");

    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Minimal hex encoding so we don't need a whole extra crate for this one
/// call site; `sha2`'s output is always a fixed-size byte array.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(bytes.as_ref().len() * 2);
        for byte in bytes.as_ref() {
            write!(&mut out, "{:02x}", byte).expect("writing to a String never fails");
        }
        out
    }
}
