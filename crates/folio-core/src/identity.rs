//! Object identity strategies for matching array elements across snapshots.

use serde_json::Value;

/// Produces a stable key for an array element.
///
/// Elements with equal keys in the old and new array are treated as the same
/// element, so inserting or reordering identified objects shows up as
/// additions, moves and changes rather than a wholesale replacement.
pub trait ObjectIdentity: Send + Sync {
    fn identify(&self, value: &Value) -> String;
}

impl<F> ObjectIdentity for F
where
    F: Fn(&Value) -> String + Send + Sync,
{
    fn identify(&self, value: &Value) -> String {
        self(value)
    }
}

/// Uses the first configured field holding a scalar, else the canonical
/// serialization of the whole element.
#[derive(Debug, Clone)]
pub struct DefaultIdentity {
    fields: Vec<String>,
}

impl DefaultIdentity {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl Default for DefaultIdentity {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_IDENTITY_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl ObjectIdentity for DefaultIdentity {
    fn identify(&self, value: &Value) -> String {
        if let Value::Object(map) = value {
            for field in &self.fields {
                match map.get(field) {
                    Some(Value::String(s)) => return format!("{field}={s}"),
                    Some(v @ (Value::Number(_) | Value::Bool(_))) => {
                        return format!("{field}={v}")
                    }
                    _ => {}
                }
            }
        }
        canonical(value)
    }
}

/// Serialize with object keys sorted at every level.
pub fn canonical(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
