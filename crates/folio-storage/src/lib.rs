//! Persistence layer for folio.
//!
//! This crate defines the record shapes for documents and versions and the
//! repository traits the version-history engine consumes, with two backends:
//! - JSON file storage (default)
//! - In-memory storage (for tests and ephemeral servers)

pub mod error;
pub mod json;
pub mod memory;
pub mod query;
pub mod record;

pub use error::{StorageError, StorageResult};
pub use json::{default_store, JsonStore};
pub use memory::MemoryStore;
pub use query::{DocumentFilter, DocumentSort, DocumentSortField, SortOrder, VersionFilter};
pub use record::{Document, NewDocument, NewVersion, Version};

use async_trait::async_trait;

/// Document persistence.
#[async_trait]
pub trait DocumentRepo: Send + Sync {
    /// Insert a new document, assigning its id.
    async fn create(&self, fields: NewDocument) -> StorageResult<Document>;

    /// Look up a document by id. Returns `None` if it doesn't exist.
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Document>>;

    /// Overwrite an existing document.
    ///
    /// Fails with [`StorageError::NotFound`] if the document was never created.
    async fn save(&self, document: &Document) -> StorageResult<()>;

    /// Query documents matching `filter`, sorted, skipping `skip` and returning
    /// at most `limit` (all remaining when `None`).
    async fn find(
        &self,
        filter: &DocumentFilter,
        sort: DocumentSort,
        skip: usize,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Document>>;

    /// Count documents matching `filter`.
    async fn count(&self, filter: &DocumentFilter) -> StorageResult<usize>;

    /// Remove a document. Only used to undo a creation that could not be
    /// completed; removing a missing document is not an error.
    async fn delete(&self, id: &str) -> StorageResult<()>;
}

/// Version persistence. Versions are never deleted.
#[async_trait]
pub trait VersionRepo: Send + Sync {
    /// Insert a new version, assigning its id.
    async fn create(&self, fields: NewVersion) -> StorageResult<Version>;

    /// Look up a version by id.
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Version>>;

    /// First version matching `filter`.
    async fn find_one(&self, filter: &VersionFilter) -> StorageResult<Option<Version>>;

    /// All versions matching `filter`, ordered by `(created_at, number)`.
    async fn find(&self, filter: &VersionFilter, order: SortOrder) -> StorageResult<Vec<Version>>;

    /// Overwrite an existing version.
    async fn save(&self, version: &Version) -> StorageResult<()>;
}
