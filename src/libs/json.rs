//! Request bodies for the row endpoints.
//!
//! Every value is flattened to text (or NULL) before it reaches the row layer,
//! since the statements bind everything as text.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::libs::error::{EditorError, Result};

/// Column name to textual value; `None` is NULL.
pub type Row = BTreeMap<String, Option<String>>;

pub fn row_from_json(body: &[u8]) -> Result<Row> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Row::new());
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|_| EditorError::bad_request("invalid json"))?;
    match value {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, flatten(v))).collect()),
        _ => Err(EditorError::bad_request("invalid json")),
    }
}

fn flatten(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        // numbers, booleans and nested values pass through as their JSON text
        other => Some(other.to_string()),
    }
}

/// Picks a string field out of a JSON object body, e.g. the login password.
pub fn string_field(body: &[u8], key: &str) -> Option<String> {
    row_from_json(body).ok()?.remove(key).flatten()
}
