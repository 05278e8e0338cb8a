//! Shared utilities for folio.
//!
//! This crate provides common utilities used across the folio workspace:
//! - ULID-based identifier generation for documents and versions
//! - Logging setup with tracing
//! - Platform config/data/log directories
//! - RAII-based timing for operation measurement

pub mod id;
pub mod log;
pub mod path;
pub mod timing;

pub use id::{IdPrefix, Identifier};
pub use timing::TimingGuard;
