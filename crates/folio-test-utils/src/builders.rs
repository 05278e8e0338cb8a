//! Builder patterns for constructing test records.

use chrono::{DateTime, Duration, Utc};
use folio_storage::{Document, Version};
use folio_util::Identifier;
use serde_json::Value;

/// Builder for [`Document`] records.
///
/// # Example
///
/// ```rust
/// use folio_test_utils::builders::DocumentBuilder;
///
/// let doc = DocumentBuilder::new().name("Plan").owner("alice").build();
/// assert_eq!(doc.owner_id, "alice");
/// assert!(doc.id.starts_with("doc_"));
/// ```
pub struct DocumentBuilder {
    id: String,
    name: String,
    content: String,
    owner_id: String,
    version_count: u64,
    created_at: DateTime<Utc>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            id: Identifier::document(),
            name: "Untitled".to_string(),
            content: String::new(),
            owner_id: "user_test".to_string(),
            version_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    pub fn version_count(mut self, count: u64) -> Self {
        self.version_count = count;
        self
    }

    /// Shift creation time relative to now.
    pub fn created_ago(mut self, ago: Duration) -> Self {
        self.created_at = Utc::now() - ago;
        self
    }

    pub fn build(self) -> Document {
        Document {
            id: self.id,
            name: self.name,
            content: self.content,
            owner_id: self.owner_id,
            version_count: self.version_count,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Version`] records.
///
/// # Example
///
/// ```rust
/// use folio_test_utils::builders::VersionBuilder;
///
/// let v = VersionBuilder::for_document("doc_1").number(2).auto_save().build();
/// assert!(v.is_auto_save);
/// assert_eq!(v.number, 2);
/// ```
pub struct VersionBuilder {
    id: String,
    document_id: String,
    number: u64,
    content: String,
    is_auto_save: bool,
    diff: Value,
    merged_from_version_id: Option<String>,
    author_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl VersionBuilder {
    pub fn for_document(document_id: impl Into<String>) -> Self {
        Self {
            id: Identifier::version(),
            document_id: document_id.into(),
            number: 1,
            content: String::new(),
            is_auto_save: false,
            diff: serde_json::json!({"type": "unchanged"}),
            merged_from_version_id: None,
            author_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn number(mut self, number: u64) -> Self {
        self.number = number;
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn auto_save(mut self) -> Self {
        self.is_auto_save = true;
        self
    }

    pub fn diff(mut self, diff: Value) -> Self {
        self.diff = diff;
        self
    }

    pub fn merged_from(mut self, version_id: impl Into<String>) -> Self {
        self.merged_from_version_id = Some(version_id.into());
        self
    }

    pub fn author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn build(self) -> Version {
        Version {
            id: self.id,
            document_id: self.document_id,
            number: self.number,
            content: self.content,
            is_auto_save: self.is_auto_save,
            diff: self.diff,
            merged_from_version_id: self.merged_from_version_id,
            author_id: self.author_id,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
