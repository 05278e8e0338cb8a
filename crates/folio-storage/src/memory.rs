//! In-memory storage implementation.
//!
//! Nothing is persisted; used by tests and `folio serve --memory`.

use crate::query::{sort_documents, sort_versions};
use crate::{
    Document, DocumentFilter, DocumentRepo, DocumentSort, NewDocument, NewVersion, SortOrder,
    StorageError, StorageResult, Version, VersionFilter, VersionRepo,
};
use async_trait::async_trait;
use folio_util::Identifier;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory document and version store.
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Document>>,
    versions: RwLock<HashMap<String, Version>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            versions: RwLock::new(HashMap::new()),
        }
    }

    fn read<T>(lock: &RwLock<T>) -> StorageResult<RwLockReadGuard<'_, T>> {
        lock.read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn write<T>(lock: &RwLock<T>) -> StorageResult<RwLockWriteGuard<'_, T>> {
        lock.write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepo for MemoryStore {
    async fn create(&self, fields: NewDocument) -> StorageResult<Document> {
        let document = fields.into_document(Identifier::document());
        let mut documents = Self::write(&self.documents)?;
        if documents.contains_key(&document.id) {
            return Err(StorageError::AlreadyExists(document.id));
        }
        documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Document>> {
        Ok(Self::read(&self.documents)?.get(id).cloned())
    }

    async fn save(&self, document: &Document) -> StorageResult<()> {
        let mut documents = Self::write(&self.documents)?;
        match documents.get_mut(&document.id) {
            Some(existing) => {
                *existing = document.clone();
                Ok(())
            }
            None => Err(StorageError::not_found("documents", &document.id)),
        }
    }

    async fn find(
        &self,
        filter: &DocumentFilter,
        sort: DocumentSort,
        skip: usize,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Document>> {
        let mut matching: Vec<Document> = Self::read(&self.documents)?
            .values()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();
        sort_documents(&mut matching, sort);

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count(&self, filter: &DocumentFilter) -> StorageResult<usize> {
        Ok(Self::read(&self.documents)?
            .values()
            .filter(|doc| filter.matches(doc))
            .count())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        Self::write(&self.documents)?.remove(id);
        Ok(())
    }
}

#[async_trait]
impl VersionRepo for MemoryStore {
    async fn create(&self, fields: NewVersion) -> StorageResult<Version> {
        let version = fields.into_version(Identifier::version());
        let mut versions = Self::write(&self.versions)?;
        if versions.contains_key(&version.id) {
            return Err(StorageError::AlreadyExists(version.id));
        }
        versions.insert(version.id.clone(), version.clone());
        Ok(version)
    }

    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Version>> {
        Ok(Self::read(&self.versions)?.get(id).cloned())
    }

    async fn find_one(&self, filter: &VersionFilter) -> StorageResult<Option<Version>> {
        if let Some(id) = &filter.id {
            let found = VersionRepo::find_by_id(self, id).await?;
            return Ok(found.filter(|v| filter.matches(v)));
        }
        let mut matching = VersionRepo::find(self, filter, SortOrder::Ascending).await?;
        Ok(if matching.is_empty() {
            None
        } else {
            Some(matching.swap_remove(0))
        })
    }

    async fn find(&self, filter: &VersionFilter, order: SortOrder) -> StorageResult<Vec<Version>> {
        let mut matching: Vec<Version> = Self::read(&self.versions)?
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        sort_versions(&mut matching, order);
        Ok(matching)
    }

    async fn save(&self, version: &Version) -> StorageResult<()> {
        let mut versions = Self::write(&self.versions)?;
        match versions.get_mut(&version.id) {
            Some(existing) => {
                *existing = version.clone();
                Ok(())
            }
            None => Err(StorageError::not_found("versions", &version.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentSortField;
    use chrono::{Duration, Utc};

    fn new_version(document_id: &str, number: u64, offset_ms: i64) -> NewVersion {
        NewVersion {
            document_id: document_id.to_string(),
            number,
            content: format!("content {number}"),
            is_auto_save: false,
            diff: serde_json::json!({"type": "unchanged"}),
            merged_from_version_id: None,
            author_id: Some("user_1".to_string()),
            created_at: Utc::now() + Duration::milliseconds(offset_ms),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_document() {
        let store = MemoryStore::new();
        let doc = DocumentRepo::create(&store, NewDocument::new("Notes", "{}", "alice"))
            .await
            .unwrap();

        assert!(doc.id.starts_with("doc_"));
        let found = DocumentRepo::find_by_id(&store, &doc.id).await.unwrap();
        assert_eq!(found, Some(doc));
    }

    #[tokio::test]
    async fn test_save_unknown_document_fails() {
        let store = MemoryStore::new();
        let doc = NewDocument::new("Ghost", "", "alice").into_document("doc_missing".into());
        let result = DocumentRepo::save(&store, &doc).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_documents_paginates_and_counts() {
        let store = MemoryStore::new();
        for name in ["c", "a", "b"] {
            DocumentRepo::create(&store, NewDocument::new(name, "", "alice"))
                .await
                .unwrap();
        }
        DocumentRepo::create(&store, NewDocument::new("z", "", "bob"))
            .await
            .unwrap();

        let filter = DocumentFilter::owned_by("alice");
        let sort = DocumentSort::new(DocumentSortField::Name, SortOrder::Ascending);
        let page = DocumentRepo::find(&store, &filter, sort, 1, Some(1))
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "b");
        assert_eq!(DocumentRepo::count(&store, &filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_document_is_idempotent() {
        let store = MemoryStore::new();
        let doc = DocumentRepo::create(&store, NewDocument::new("Notes", "", "alice"))
            .await
            .unwrap();
        store.delete(&doc.id).await.unwrap();
        store.delete(&doc.id).await.unwrap();
        assert!(DocumentRepo::find_by_id(&store, &doc.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_versions_sorted_by_created_at() {
        let store = MemoryStore::new();
        VersionRepo::create(&store, new_version("doc_1", 2, 10))
            .await
            .unwrap();
        VersionRepo::create(&store, new_version("doc_1", 1, 0))
            .await
            .unwrap();
        VersionRepo::create(&store, new_version("doc_2", 1, 5))
            .await
            .unwrap();

        let versions = VersionRepo::find(
            &store,
            &VersionFilter::for_document("doc_1"),
            SortOrder::Descending,
        )
        .await
        .unwrap();

        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].number, 2);
        assert_eq!(versions[1].number, 1);
    }

    #[tokio::test]
    async fn test_find_one_respects_document_scope() {
        let store = MemoryStore::new();
        let version = VersionRepo::create(&store, new_version("doc_1", 1, 0))
            .await
            .unwrap();

        let hit = store
            .find_one(&VersionFilter::version_of("doc_1", &version.id))
            .await
            .unwrap();
        assert_eq!(hit.map(|v| v.id), Some(version.id.clone()));

        let miss = store
            .find_one(&VersionFilter::version_of("doc_2", &version.id))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_save_version_overwrites_content() {
        let store = MemoryStore::new();
        let mut version = VersionRepo::create(&store, new_version("doc_1", 1, 0))
            .await
            .unwrap();
        version.content = "edited".to_string();
        VersionRepo::save(&store, &version).await.unwrap();

        let stored = VersionRepo::find_by_id(&store, &version.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.content, "edited");
    }
}
