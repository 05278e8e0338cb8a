//! Restoring an earlier version onto a document.
//!
//! A merge copies a past snapshot forward: the document's live content
//! becomes the source version's content and a new version records the
//! restore. There is no three-way merge and no conflict detection; edits
//! made after the source version are simply superseded.

use crate::error::CoreResult;
use crate::version::{Append, VersionChain};
use folio_storage::{Document, Version};
use tracing::info;

#[derive(Clone)]
pub struct MergeCoordinator {
    chain: VersionChain,
}

impl MergeCoordinator {
    pub fn new(chain: VersionChain) -> Self {
        Self { chain }
    }

    /// Restore version `source_id` onto `document`.
    ///
    /// The source is read under the document lock, so an in-place edit that
    /// lands before the restore is what gets copied. Returns the updated
    /// document and the new version, whose `merged_from_version_id` is
    /// `source_id`. A version of another document is not found.
    pub async fn merge(
        &self,
        document: &Document,
        source_id: &str,
        author_id: Option<String>,
    ) -> CoreResult<(Document, Version)> {
        let guard = self.chain.documents().locks().lock(&document.id).await;
        let source = self.chain.get_version(&document.id, source_id).await?;
        let current = self.chain.documents().get(&document.id).await?;
        let (document, version) = self
            .chain
            .append(
                &guard,
                current,
                Append {
                    content: source.content,
                    is_auto_save: false,
                    merged_from_version_id: Some(source.id.clone()),
                    author_id,
                },
            )
            .await?;

        info!(
            document_id = %document.id,
            source_version_id = %source.id,
            version_id = %version.id,
            "Restored version"
        );
        Ok((document, version))
    }
}
