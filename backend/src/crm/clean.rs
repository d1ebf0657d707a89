//! Removal of transport metadata from query results.
//!
//! Bulk results carry an `attributes` object (type + url) on every record and
//! on every nested relationship record. It is noise for the dataload, so it is
//! stripped at any depth before records are used.

use serde_json::Value;

/// Key the CRM attaches to every record node.
pub const TRANSPORT_METADATA_KEY: &str = "attributes";

/// Remove `key` from every object node in `value`, whatever the nesting.
///
/// Arrays are walked element by element; scalars are returned untouched.
pub fn strip_key(value: Value, key: &str) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| k != key)
                .map(|(k, v)| (k, strip_key(v, key)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| strip_key(v, key)).collect()),
        scalar => scalar,
    }
}

/// Strip [`TRANSPORT_METADATA_KEY`] from a list of records.
pub fn strip_metadata(records: Vec<Value>) -> Vec<Value> {
    records
        .into_iter()
        .map(|r| strip_key(r, TRANSPORT_METADATA_KEY))
        .collect()
}
