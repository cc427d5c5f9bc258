//! SHA-256 fingerprint of a plan.
//!
//! Two runs over identical inputs produce the same fingerprint, so a report
//! can be compared against an earlier dry run of the same change.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use remsync_core::Operation;

/// Hex SHA-256 over each operation's kind, identity and written content.
pub fn plan_fingerprint(operations: &[Operation]) -> String {
    let mut h = Sha256::new();
    for op in operations {
        h.update(op.kind().to_string().as_bytes());
        h.update([0]);
        h.update(op.id().as_str().as_bytes());
        h.update([0]);
        if let Some(record) = op.record() {
            h.update(canonical(&record.without_metadata().to_value()).to_string().as_bytes());
        }
        h.update(b"\n");
    }
    hex::encode(h.finalize())
}

/// Objects rebuilt with sorted keys, so field order never reaches the hash.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), canonical(&map[k])))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
