//! Persisted record shapes.
//!
//! Records serialize with camelCase field names so the stored JSON matches
//! what API clients see.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named document with a live content snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    /// Current snapshot. Not required to be valid JSON.
    pub content: String,
    pub owner_id: String,
    /// Number of versions in the chain; also the head version's `number`.
    #[serde(default)]
    pub version_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a document that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub content: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl NewDocument {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            owner_id: owner_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Materialize the record under the given id.
    pub fn into_document(self, id: String) -> Document {
        Document {
            id,
            name: self.name,
            content: self.content,
            owner_id: self.owner_id,
            version_count: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// A full content snapshot in a document's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub document_id: String,
    /// 1-based position in the document's chain.
    pub number: u64,
    pub content: String,
    pub is_auto_save: bool,
    /// Serialized diff from the previous version's content.
    pub diff: serde_json::Value,
    #[serde(default)]
    pub merged_from_version_id: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Version {
    /// Whether this version was created by restoring an earlier one.
    pub fn is_restore(&self) -> bool {
        self.merged_from_version_id.is_some()
    }
}

/// Fields for a version that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub document_id: String,
    pub number: u64,
    pub content: String,
    pub is_auto_save: bool,
    pub diff: serde_json::Value,
    pub merged_from_version_id: Option<String>,
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewVersion {
    /// Materialize the record under the given id.
    pub fn into_version(self, id: String) -> Version {
        Version {
            id,
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
