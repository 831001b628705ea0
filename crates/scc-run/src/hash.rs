use std::collections::BTreeMap;

use scc_core::{ErrorInfo, SccError};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into JSON bytes with sorted object keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SccError> {
    let value = serde_json::to_value(value)
        .map_err(|err| SccError::Serde(ErrorInfo::new("json-encode", err.to_string())))?;
    serde_json::to_vec(&canonicalize(value))
        .map_err(|err| SccError::Serde(ErrorInfo::new("json-write", err.to_string())))
}

/// Computes a stable hexadecimal SHA-256 of the canonical JSON of `value`.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, SccError> {
    let digest = Sha256::digest(to_canonical_json_bytes(value)?);
    Ok(format!("{:x}", digest))
}
