//! Version-history engine for folio.
//!
//! This crate provides:
//! - Content decoding and structural diffs between snapshots
//! - Append-only version chains with per-document write serialization
//! - Restoring earlier versions onto a document
//! - The actor-facing [`History`] service with pluggable authorization
//! - Configuration management (multi-source, JSONC support)
//! - Event bus for change notifications

pub mod auth;
pub mod bus;
pub mod codec;
pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod history;
pub mod identity;
pub mod input;
pub mod lock;
pub mod merge;
pub mod page;
pub mod version;

pub use auth::{Actor, Authorizer, OwnerAuthorizer};
pub use bus::{Bus, BusEvent};
pub use config::Config;
pub use diff::{Change, Diff, DiffEngine, DiffSummary, Op, Segment};
pub use document::DocumentStore;
pub use error::{CoreError, CoreResult, ErrorKind, Failure};
pub use history::History;
pub use identity::{DefaultIdentity, ObjectIdentity};
pub use input::{
    CreateDocumentInput, CreateVersionInput, RenameDocumentInput, UpdateContentInput,
};
pub use merge::MergeCoordinator;
pub use page::{Page, Paged};
pub use version::VersionChain;
