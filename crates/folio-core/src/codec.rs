//! Content decoding.
//!
//! Content is persisted as the raw string the client sent. Decoding only
//! decides how two snapshots are compared.

use serde_json::Value;

/// A content snapshot as seen by the diff engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Parsed JSON tree.
    Structured(Value),
    /// Anything that isn't valid JSON, kept verbatim.
    Opaque(String),
}

impl Content {
    /// Whether this is a JSON object or array.
    pub fn is_container(&self) -> bool {
        matches!(self, Content::Structured(Value::Object(_) | Value::Array(_)))
    }

    /// The value recorded for this side of a whole-value replacement.
    pub fn into_value(self) -> Value {
        match self {
            Content::Structured(value) => value,
            Content::Opaque(raw) => Value::String(raw),
        }
    }
}

/// Decode a raw snapshot. Never fails.
pub fn decode(raw: &str) -> Content {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Content::Structured(value),
        Err(_) => Content::Opaque(raw.to_string()),
    }
}
