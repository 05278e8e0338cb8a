//! Actor-facing history service.
//!
//! Every call runs in the same order: resolve the document (or version, then
//! its document), authorize the actor against it, then run the operation.
//! Inputs arrive already type-checked (see [`crate::input`]).

use crate::auth::{Actor, Authorizer, OwnerAuthorizer};
use crate::bus::{Bus, DocumentCreated, DocumentRenamed, VersionCreated, VersionUpdated};
use crate::config::Config;
use crate::diff::DiffEngine;
use crate::document::DocumentStore;
use crate::error::CoreResult;
use crate::input::{
    CreateDocumentInput, CreateVersionInput, RenameDocumentInput, UpdateContentInput,
};
use crate::lock::DocumentLocks;
use crate::merge::MergeCoordinator;
use crate::page::{Page, Paged};
use crate::version::VersionChain;
use folio_storage::{Document, DocumentFilter, DocumentRepo, DocumentSort, Version, VersionRepo};
use std::sync::Arc;

/// Documents, their version chains, and restores, scoped to an actor.
#[derive(Clone)]
pub struct History {
    documents: DocumentStore,
    chain: VersionChain,
    merger: MergeCoordinator,
    authorizer: Arc<dyn Authorizer>,
    bus: Bus,
}

impl History {
    /// Wire the service over the given repositories.
    pub fn new(
        documents: Arc<dyn DocumentRepo>,
        versions: Arc<dyn VersionRepo>,
        config: &Config,
        bus: Bus,
    ) -> Self {
        let store = DocumentStore::new(documents, Arc::new(DocumentLocks::new()));
        let chain = VersionChain::new(store.clone(), versions, DiffEngine::from_config(config));
        Self {
            documents: store,
            merger: MergeCoordinator::new(chain.clone()),
            chain,
            authorizer: Arc::new(OwnerAuthorizer),
            bus,
        }
    }

    /// Replace the default owner-only authorizer.
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Resolve and authorize.
    async fn document_for(&self, actor: &Actor, id: &str) -> CoreResult<Document> {
        let document = self.documents.get(id).await?;
        self.authorizer.authorize(actor, &document)?;
        Ok(document)
    }

    pub async fn create_document(
        &self,
        actor: &Actor,
        input: CreateDocumentInput,
    ) -> CoreResult<(Document, Version)> {
        let fields = folio_storage::NewDocument::new(input.name, input.content, actor.id.clone());
        let (document, version) = self.chain.initialize(fields, Some(actor.id.clone())).await?;

        self.bus.publish(DocumentCreated {
            document_id: document.id.clone(),
            owner_id: document.owner_id.clone(),
            name: document.name.clone(),
            version_id: version.id.clone(),
        });
        Ok((document, version))
    }

    /// The actor's documents, most recently updated first.
    pub async fn list_documents(&self, actor: &Actor, page: Page) -> CoreResult<Paged<Document>> {
        let filter = DocumentFilter::owned_by(actor.id.clone());
        let total = self.documents.count(&filter).await?;
        let items = self
            .documents
            .list(&filter, DocumentSort::default(), page.skip(), page.limit)
            .await?;
        Ok(Paged::new(items, total, page))
    }

    pub async fn get_document(&self, actor: &Actor, id: &str) -> CoreResult<Document> {
        self.document_for(actor, id).await
    }

    pub async fn rename_document(
        &self,
        actor: &Actor,
        id: &str,
        input: RenameDocumentInput,
    ) -> CoreResult<Document> {
        self.document_for(actor, id).await?;
        let document = self.documents.rename(id, &input.name).await?;

        self.bus.publish(DocumentRenamed {
            document_id: document.id.clone(),
            owner_id: document.owner_id.clone(),
            name: document.name.clone(),
        });
        Ok(document)
    }

    pub async fn create_version(
        &self,
        actor: &Actor,
        id: &str,
        input: CreateVersionInput,
    ) -> CoreResult<Version> {
        let document = self.document_for(actor, id).await?;
        let version = self
            .chain
            .create_version(
                &document,
                input.content,
                input.is_auto_save,
                Some(actor.id.clone()),
            )
            .await?;

        self.publish_created(&document, &version);
        Ok(version)
    }

    pub async fn list_versions(&self, actor: &Actor, id: &str) -> CoreResult<Vec<Version>> {
        self.document_for(actor, id).await?;
        self.chain.list_versions(id).await
    }

    pub async fn get_version(
        &self,
        actor: &Actor,
        id: &str,
        version_id: &str,
    ) -> CoreResult<Version> {
        self.document_for(actor, id).await?;
        self.chain.get_version(id, version_id).await
    }

    /// Restore `version_id` onto document `id`.
    pub async fn merge(
        &self,
        actor: &Actor,
        id: &str,
        version_id: &str,
    ) -> CoreResult<(Document, Version)> {
        let document = self.document_for(actor, id).await?;
        let (document, version) = self
            .merger
            .merge(&document, version_id, Some(actor.id.clone()))
            .await?;

        self.publish_created(&document, &version);
        Ok((document, version))
    }

    /// Edit a version's content in place. The document's content is unchanged.
    pub async fn update_version_content(
        &self,
        actor: &Actor,
        version_id: &str,
        input: UpdateContentInput,
    ) -> CoreResult<Version> {
        let version = self.chain.find_version(version_id).await?;
        let document = self.document_for(actor, &version.document_id).await?;
        let version = self
            .chain
            .update_version_content(&version.id, input.content)
            .await?;

        self.publish_updated(&document, &version);
        Ok(version)
    }

    /// Edit the document's head version in place.
    pub async fn update_current_version(
        &self,
        actor: &Actor,
        id: &str,
        input: UpdateContentInput,
    ) -> CoreResult<Version> {
        let document = self.document_for(actor, id).await?;
        let version = self.chain.update_head_content(id, input.content).await?;

        self.publish_updated(&document, &version);
        Ok(version)
    }

    fn publish_created(&self, document: &Document, version: &Version) {
        self.bus.publish(VersionCreated {
            document_id: document.id.clone(),
            owner_id: document.owner_id.clone(),
            version_id: version.id.clone(),
            number: version.number,
            is_auto_save: version.is_auto_save,
            merged_from_version_id: version.merged_from_version_id.clone(),
        });
    }

    fn publish_updated(&self, document: &Document, version: &Version) {
        self.bus.publish(VersionUpdated {
            document_id: document.id.clone(),
            owner_id: document.owner_id.clone(),
            version_id: version.id.clone(),
        });
    }
}
