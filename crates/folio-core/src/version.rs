//! The per-document version chain.
//!
//! Versions are append-only full snapshots. Appending a version diffs the new
//! content against the document's live content, moves the live pointer, and
//! records the diff on the version. All of that happens under the document's
//! lock with the document re-read inside it.

use crate::diff::{Diff, DiffEngine};
use crate::document::DocumentStore;
use crate::error::{CoreError, CoreResult};
use crate::lock::DocumentGuard;
use chrono::{DateTime, Duration, Utc};
use folio_storage::{
    Document, NewDocument, NewVersion, SortOrder, Version, VersionFilter, VersionRepo,
};
use folio_util::{IdPrefix, Identifier, TimingGuard};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to append to a chain.
pub(crate) struct Append {
    pub content: String,
    pub is_auto_save: bool,
    pub merged_from_version_id: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Clone)]
pub struct VersionChain {
    documents: DocumentStore,
    versions: Arc<dyn VersionRepo>,
    engine: DiffEngine,
}

impl VersionChain {
    pub fn new(documents: DocumentStore, versions: Arc<dyn VersionRepo>, engine: DiffEngine) -> Self {
        Self {
            documents,
            versions,
            engine,
        }
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Create a document together with its first version.
    ///
    /// The first version carries the document's content and an empty diff.
    /// If it can't be written the document is removed again.
    pub async fn initialize(
        &self,
        fields: NewDocument,
        author_id: Option<String>,
    ) -> CoreResult<(Document, Version)> {
        let mut document = self.documents.insert(fields).await?;
        let _guard = self.documents.locks().lock(&document.id).await;

        let first = NewVersion {
            document_id: document.id.clone(),
            number: 1,
            content: document.content.clone(),
            is_auto_save: false,
            diff: Diff::empty().to_value()?,
            merged_from_version_id: None,
            author_id,
            created_at: document.created_at,
        };

        let version = match self.versions.create(first).await {
            Ok(version) => version,
            Err(e) => {
                self.documents.discard(&document.id).await;
                return Err(e.into());
            }
        };

        document.version_count = 1;
        if let Err(e) = self.documents.save(&document).await {
            // The version is already written; the count is recoverable from it
            warn!(document_id = %document.id, error = %e, "Failed to record version count");
        }

        info!(document_id = %document.id, version_id = %version.id, "Created document");
        Ok((document, version))
    }

    /// Append a version with new content to `document`.
    ///
    /// The diff baseline is the document's content as committed when the
    /// lock is acquired, which may be newer than `document.content`.
    pub async fn create_version(
        &self,
        document: &Document,
        content: String,
        is_auto_save: bool,
        author_id: Option<String>,
    ) -> CoreResult<Version> {
        let guard = self.documents.locks().lock(&document.id).await;
        let current = self.documents.get(&document.id).await?;
        let (_, version) = self
            .append(
                &guard,
                current,
                Append {
                    content,
                    is_auto_save,
                    merged_from_version_id: None,
                    author_id,
                },
            )
            .await?;
        Ok(version)
    }

    /// Append under an already-held lock. Returns the updated document.
    ///
    /// The document is saved before the version is created; if the version
    /// can't be written the previous document is restored.
    pub(crate) async fn append(
        &self,
        guard: &DocumentGuard,
        mut document: Document,
        append: Append,
    ) -> CoreResult<(Document, Version)> {
        debug_assert_eq!(guard.document_id(), document.id);
        let _timing = TimingGuard::write(&document.id);
        let previous = document.clone();

        let diff = {
            let _timing = TimingGuard::diff(&document.id);
            self.engine.diff(&document.content, &append.content)
        };

        let head = self.head(&document.id).await?;
        let created_at = next_timestamp(head.as_ref().map(|v| v.created_at));
        let number = head
            .as_ref()
            .map_or(document.version_count, |v| v.number.max(document.version_count))
            + 1;

        document.content = append.content.clone();
        document.version_count = number;
        document.updated_at = created_at;
        self.documents.save(&document).await?;

        let fields = NewVersion {
            document_id: document.id.clone(),
            number,
            content: append.content,
            is_auto_save: append.is_auto_save,
            diff: diff.to_value()?,
            merged_from_version_id: append.merged_from_version_id,
            author_id: append.author_id,
            created_at,
        };

        match self.versions.create(fields).await {
            Ok(version) => {
                debug!(
                    document_id = %document.id,
                    version_id = %version.id,
                    number,
                    changes = diff.changes().len(),
                    "Appended version"
                );
                Ok((document, version))
            }
            Err(e) => {
                if let Err(rollback) = self.documents.save(&previous).await {
                    warn!(
                        document_id = %previous.id,
                        error = %rollback,
                        "Failed to roll back document after version write failed"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// All versions of a document, newest first.
    pub async fn list_versions(&self, document_id: &str) -> CoreResult<Vec<Version>> {
        Ok(self
            .versions
            .find(&VersionFilter::for_document(document_id), SortOrder::Descending)
            .await?)
    }

    /// The latest version of a document.
    pub async fn head(&self, document_id: &str) -> CoreResult<Option<Version>> {
        Ok(self.list_versions(document_id).await?.into_iter().next())
    }

    /// A version of `document_id`. Versions of other documents are not found.
    pub async fn get_version(&self, document_id: &str, version_id: &str) -> CoreResult<Version> {
        if !Identifier::is_valid(version_id, IdPrefix::Version) {
            return Err(CoreError::version_not_found(version_id));
        }
        self.versions
            .find_one(&VersionFilter::version_of(document_id, version_id))
            .await?
            .ok_or_else(|| CoreError::version_not_found(version_id))
    }

    /// A version by id alone.
    pub async fn find_version(&self, version_id: &str) -> CoreResult<Version> {
        if !Identifier::is_valid(version_id, IdPrefix::Version) {
            return Err(CoreError::version_not_found(version_id));
        }
        self.versions
            .find_by_id(version_id)
            .await?
            .ok_or_else(|| CoreError::version_not_found(version_id))
    }

    /// Overwrite a version's content in place.
    ///
    /// Only the version's `content` and `updated_at` change. The stored diff
    /// is left as it was and the owning document's content is not touched.
    pub async fn update_version_content(
        &self,
        version_id: &str,
        content: String,
    ) -> CoreResult<Version> {
        let document_id = self.find_version(version_id).await?.document_id;
        let _guard = self.documents.locks().lock(&document_id).await;

        let version = self.find_version(version_id).await?;
        self.overwrite(version, content).await
    }

    /// Overwrite the head version's content in place.
    ///
    /// The head is resolved under the document lock, so a version appended
    /// concurrently is either the one edited or appended afterwards.
    pub async fn update_head_content(
        &self,
        document_id: &str,
        content: String,
    ) -> CoreResult<Version> {
        let _guard = self.documents.locks().lock(document_id).await;

        let head = self
            .head(document_id)
            .await?
            .ok_or_else(|| CoreError::version_not_found(document_id))?;
        self.overwrite(head, content).await
    }

    async fn overwrite(&self, mut version: Version, content: String) -> CoreResult<Version> {
        version.content = content;
        version.updated_at = Utc::now();
        self.versions.save(&version).await?;

        debug!(
            document_id = %version.document_id,
            version_id = %version.id,
            "Updated version content in place"
        );
        Ok(version)
    }
}

/// `now`, nudged past the previous head so order within a chain is strict.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if prev >= now => prev + Duration::microseconds(1),
        _ => now,
    }
}
