//! Authorization capability.
//!
//! Identity is resolved outside the core (the server verifies a bearer
//! token). The core only decides whether a resolved [`Actor`] may act on a
//! document.

use crate::error::{CoreError, CoreResult};
use folio_storage::Document;
use serde::{Deserialize, Serialize};

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Decides whether an actor may access a document.
pub trait Authorizer: Send + Sync {
    /// `Ok(())` to allow, [`CoreError::AccessDenied`] to refuse.
    fn authorize(&self, actor: &Actor, document: &Document) -> CoreResult<()>;
}

/// Only the document's owner may access it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerAuthorizer;

impl Authorizer for OwnerAuthorizer {
    fn authorize(&self, actor: &Actor, document: &Document) -> CoreResult<()> {
        if document.owner_id == actor.id {
            Ok(())
        } else {
            tracing::debug!(
                actor = %actor.id,
                document_id = %document.id,
                "Access denied"
            );
            Err(CoreError::access_denied(&document.id))
        }
    }
}
