//! Testing utilities, builders, and fixtures for folio.
//!
//! - **Builders**: fluent construction of `Document` and `Version` records
//! - **Fixtures**: sample content snapshots and temporary data directories
//! - **Assertions**: readable failures for strings, JSON and version ordering
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use folio_test_utils::{builders::DocumentBuilder, fixtures};
//!
//! let doc = DocumentBuilder::new()
//!     .owner("alice")
//!     .content(fixtures::blocks(&[("a", "first")]))
//!     .build();
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use builders::{DocumentBuilder, VersionBuilder};
pub use fixtures::TestDataDir;
