//! Typed request inputs parsed from untyped JSON bodies.
//!
//! Every type check happens here, before any record is read or written.

use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};

/// Body of `POST /documents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDocumentInput {
    pub name: String,
    pub content: String,
}

impl CreateDocumentInput {
    pub fn from_json(body: &Value) -> CoreResult<Self> {
        let fields = object(body)?;
        Ok(Self {
            name: name(fields)?,
            content: optional_string(fields, "content")?.unwrap_or_default(),
        })
    }
}

/// Body of `POST /documents/:id/versions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVersionInput {
    pub content: String,
    pub is_auto_save: bool,
}

impl CreateVersionInput {
    pub fn from_json(body: &Value) -> CoreResult<Self> {
        let fields = object(body)?;
        Ok(Self {
            content: required_string(fields, "content")?,
            is_auto_save: optional_bool(fields, "isAutoSave")?.unwrap_or(false),
        })
    }
}

/// Body of `PATCH /documents/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameDocumentInput {
    pub name: String,
}

impl RenameDocumentInput {
    pub fn from_json(body: &Value) -> CoreResult<Self> {
        Ok(Self {
            name: name(object(body)?)?,
        })
    }
}

/// Body of the in-place version edit routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateContentInput {
    pub content: String,
}

impl UpdateContentInput {
    pub fn from_json(body: &Value) -> CoreResult<Self> {
        Ok(Self {
            content: required_string(object(body)?, "content")?,
        })
    }
}

fn object(body: &Value) -> CoreResult<&Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| CoreError::validation("request body must be a JSON object"))
}

fn name(fields: &Map<String, Value>) -> CoreResult<String> {
    let name = required_string(fields, "name")?;
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn required_string(fields: &Map<String, Value>, key: &str) -> CoreResult<String> {
    optional_string(fields, key)?
        .ok_or_else(|| CoreError::validation(format!("{key} is required")))
}

/// `null` counts as absent.
fn optional_string(fields: &Map<String, Value>, key: &str) -> CoreResult<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CoreError::validation(format!("{key} must be a string"))),
    }
}

fn optional_bool(fields: &Map<String, Value>, key: &str) -> CoreResult<Option<bool>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(CoreError::validation(format!("{key} must be a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn kind<T: std::fmt::Debug>(result: CoreResult<T>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    #[test]
    fn test_create_document() {
        let input =
            CreateDocumentInput::from_json(&json!({"name": "  Plan ", "content": "{}"})).unwrap();
        assert_eq!(input.name, "Plan");
        assert_eq!(input.content, "{}");

        let no_content = CreateDocumentInput::from_json(&json!({"name": "Plan"})).unwrap();
        assert_eq!(no_content.content, "");
    }

    #[test]
    fn test_create_document_rejects_bad_name() {
        for body in [
            json!({}),
            json!({"name": ""}),
            json!({"name": "   "}),
            json!({"name": 5}),
            json!("Plan"),
        ] {
            assert_eq!(
                kind(CreateDocumentInput::from_json(&body)),
                ErrorKind::Validation
            );
        }
    }

    #[test]
    fn test_create_version() {
        let input =
            CreateVersionInput::from_json(&json!({"content": "x", "isAutoSave": true})).unwrap();
        assert_eq!(input.content, "x");
        assert!(input.is_auto_save);

        let default = CreateVersionInput::from_json(&json!({"content": ""})).unwrap();
        assert!(!default.is_auto_save);
    }

    #[test]
    fn test_create_version_type_errors() {
        assert_eq!(
            kind(CreateVersionInput::from_json(&json!({"content": {"a": 1}}))),
            ErrorKind::Validation
        );
        assert_eq!(
            kind(CreateVersionInput::from_json(
                &json!({"content": "x", "isAutoSave": "yes"})
            )),
            ErrorKind::Validation
        );
        assert_eq!(
            kind(CreateVersionInput::from_json(&json!({"isAutoSave": true}))),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_update_content() {
        let input = UpdateContentInput::from_json(&json!({"content": "draft"})).unwrap();
        assert_eq!(input.content, "draft");
        assert_eq!(
            kind(UpdateContentInput::from_json(&json!({"content": null}))),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_rename() {
        let input = RenameDocumentInput::from_json(&json!({"name": "New"})).unwrap();
        assert_eq!(input.name, "New");
        assert_eq!(
            kind(RenameDocumentInput::from_json(&json!([]))),
            ErrorKind::Validation
        );
    }
}
