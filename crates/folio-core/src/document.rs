//! Document identity, naming, and the live content pointer.

use crate::error::{CoreError, CoreResult};
use crate::lock::DocumentLocks;
use chrono::Utc;
use folio_storage::{Document, DocumentFilter, DocumentRepo, DocumentSort, NewDocument};
use folio_util::{IdPrefix, Identifier};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads and writes documents through a [`DocumentRepo`].
#[derive(Clone)]
pub struct DocumentStore {
    repo: Arc<dyn DocumentRepo>,
    locks: Arc<DocumentLocks>,
}

impl DocumentStore {
    pub fn new(repo: Arc<dyn DocumentRepo>, locks: Arc<DocumentLocks>) -> Self {
        Self { repo, locks }
    }

    pub fn locks(&self) -> &Arc<DocumentLocks> {
        &self.locks
    }

    /// Resolve a document. Malformed ids are not found without a lookup.
    pub async fn get(&self, id: &str) -> CoreResult<Document> {
        if !Identifier::is_valid(id, IdPrefix::Document) {
            debug!(document_id = %id, "Malformed document id");
            return Err(CoreError::document_not_found(id));
        }
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::document_not_found(id))
    }

    /// Insert a document with no versions yet.
    pub(crate) async fn insert(&self, fields: NewDocument) -> CoreResult<Document> {
        Ok(self.repo.create(fields).await?)
    }

    pub(crate) async fn save(&self, document: &Document) -> CoreResult<()> {
        Ok(self.repo.save(document).await?)
    }

    /// Undo an [`insert`](Self::insert) whose first version could not be written.
    pub(crate) async fn discard(&self, id: &str) {
        if let Err(e) = self.repo.delete(id).await {
            warn!(document_id = %id, error = %e, "Failed to discard incomplete document");
        }
    }

    /// Change a document's name. Content and history are untouched.
    pub async fn rename(&self, id: &str, name: &str) -> CoreResult<Document> {
        let _guard = self.locks.lock(id).await;
        let mut document = self.get(id).await?;
        document.name = name.to_string();
        document.updated_at = Utc::now();
        self.save(&document).await?;
        debug!(document_id = %id, "Renamed document");
        Ok(document)
    }

    pub async fn list(
        &self,
        filter: &DocumentFilter,
        sort: DocumentSort,
        skip: usize,
        limit: usize,
    ) -> CoreResult<Vec<Document>> {
        Ok(self.repo.find(filter, sort, skip, Some(limit)).await?)
    }

    pub async fn count(&self, filter: &DocumentFilter) -> CoreResult<usize> {
        Ok(self.repo.count(filter).await?)
    }
}
