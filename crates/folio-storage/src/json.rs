//! JSON file-based storage implementation.
//!
//! Each record is stored as its own JSON file:
//! - documents: `documents/<doc_id>.json`
//! - versions: `versions/<doc_id>/<ver_id>.json`

use crate::query::{sort_documents, sort_versions};
use crate::{
    Document, DocumentFilter, DocumentRepo, DocumentSort, NewDocument, NewVersion, SortOrder,
    StorageError, StorageResult, Version, VersionFilter, VersionRepo,
};
use async_trait::async_trait;
use folio_util::Identifier;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const DOCUMENTS: &str = "documents";
const VERSIONS: &str = "versions";

/// JSON file-based document and version store.
#[derive(Clone)]
pub struct JsonStore {
    base_path: PathBuf,
}

impl JsonStore {
    /// Create a new store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a key.
    fn key_to_path(&self, key: &[&str]) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::invalid_key("Key cannot be empty"));
        }

        // No path traversal
        for component in key {
            if component.is_empty()
                || component.contains('/')
                || component.contains('\\')
                || *component == "."
                || *component == ".."
            {
                return Err(StorageError::invalid_key(format!(
                    "Invalid key component: {}",
                    component
                )));
            }
        }

        let mut path = self.base_path.clone();
        for component in key {
            path.push(component);
        }
        path.set_extension("json");

        Ok(path)
    }

    async fn read<T: DeserializeOwned>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        let path = self.key_to_path(key)?;
        read_file(&path).await
    }

    async fn write<T: Serialize + Sync>(&self, key: &[&str], value: &T) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Writing to storage");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(value)?;

        // Write atomically (write to temp file, then rename)
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    async fn exists(&self, key: &[&str]) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Every record stored directly under `dir`.
    async fn read_all<T: DeserializeOwned>(&self, dir: &Path) -> StorageResult<Vec<T>> {
        let mut records = Vec::new();
        for path in json_files(dir).await? {
            if let Some(record) = read_file(&path).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Subdirectory names of `versions/`, one per document with history.
    async fn version_dirs(&self) -> StorageResult<Vec<String>> {
        let dir = self.base_path.join(VERSIONS);
        let mut names = Vec::new();
        match fs::read_dir(&dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    if entry.file_type().await?.is_dir() {
                        if let Some(name) = entry.file_name().to_str() {
                            names.push(name.to_string());
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }
        Ok(names)
    }

    async fn all_documents(&self) -> StorageResult<Vec<Document>> {
        self.read_all(&self.base_path.join(DOCUMENTS)).await
    }
}

async fn read_file<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    debug!(path = %path.display(), "Reading from storage");
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}

async fn json_files(dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    match fs::read_dir(dir).await {
        Ok(mut entries) => {
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                // Only include .json files; skips leftover .json.tmp
                if path.extension().is_some_and(|ext| ext == "json") {
                    files.push(path);
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StorageError::Io(e)),
    }
    Ok(files)
}

#[async_trait]
impl DocumentRepo for JsonStore {
    async fn create(&self, fields: NewDocument) -> StorageResult<Document> {
        let document = fields.into_document(Identifier::document());
        if self.exists(&[DOCUMENTS, &document.id]).await? {
            return Err(StorageError::AlreadyExists(document.id));
        }
        self.write(&[DOCUMENTS, &document.id], &document).await?;
        Ok(document)
    }

    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Document>> {
        match self.read(&[DOCUMENTS, id]).await {
            // Ids that can't be a file name can't name a stored document
            Err(StorageError::InvalidKey(_)) => Ok(None),
            other => other,
        }
    }

    async fn save(&self, document: &Document) -> StorageResult<()> {
        if !self.exists(&[DOCUMENTS, &document.id]).await? {
            return Err(StorageError::not_found(DOCUMENTS, &document.id));
        }
        self.write(&[DOCUMENTS, &document.id], document).await
    }

    async fn find(
        &self,
        filter: &DocumentFilter,
        sort: DocumentSort,
        skip: usize,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Document>> {
        let mut matching: Vec<Document> = self
            .all_documents()
            .await?
            .into_iter()
            .filter(|doc| filter.matches(doc))
            .collect();
        sort_documents(&mut matching, sort);

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count(&self, filter: &DocumentFilter) -> StorageResult<usize> {
        Ok(self
            .all_documents()
            .await?
            .iter()
            .filter(|doc| filter.matches(doc))
            .count())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.key_to_path(&[DOCUMENTS, id])?;
        debug!(path = %path.display(), "Removing from storage");

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[async_trait]
impl VersionRepo for JsonStore {
    async fn create(&self, fields: NewVersion) -> StorageResult<Version> {
        let version = fields.into_version(Identifier::version());
        let key = [VERSIONS, version.document_id.as_str(), version.id.as_str()];
        if self.exists(&key).await? {
            return Err(StorageError::AlreadyExists(version.id));
        }
        self.write(&key, &version).await?;
        Ok(version)
    }

    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Version>> {
        for document_id in self.version_dirs().await? {
            match self.read(&[VERSIONS, document_id.as_str(), id]).await {
                Ok(Some(version)) => return Ok(Some(version)),
                Ok(None) => {}
                Err(StorageError::InvalidKey(_)) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn find_one(&self, filter: &VersionFilter) -> StorageResult<Option<Version>> {
        if let (Some(document_id), Some(id)) = (&filter.document_id, &filter.id) {
            let key = [VERSIONS, document_id.as_str(), id.as_str()];
            let found: Option<Version> = match self.read(&key).await {
                Err(StorageError::InvalidKey(_)) => None,
                other => other?,
            };
            return Ok(found.filter(|v| filter.matches(v)));
        }
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
        let document_ids = match &filter.document_id {
            Some(document_id) => vec![document_id.clone()],
            None => self.version_dirs().await?,
        };

        let mut matching = Vec::new();
        for document_id in document_ids {
            let dir = self.base_path.join(VERSIONS).join(&document_id);
            let versions: Vec<Version> = self.read_all(&dir).await?;
            matching.extend(versions.into_iter().filter(|v| filter.matches(v)));
        }
        sort_versions(&mut matching, order);
        Ok(matching)
    }

    async fn save(&self, version: &Version) -> StorageResult<()> {
        let key = [VERSIONS, version.document_id.as_str(), version.id.as_str()];
        if !self.exists(&key).await? {
            return Err(StorageError::not_found(VERSIONS, &version.id));
        }
        self.write(&key, version).await
    }
}

/// Create a store at the default data directory.
pub fn default_store() -> JsonStore {
    JsonStore::new(folio_util::path::default_store_dir())
}
