//! Error types for the core crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or missing input field.
    #[error("{0}")]
    Validation(String),

    /// Document does not resolve (missing or malformed id).
    #[error("document not found: {id}")]
    DocumentNotFound { id: String },

    /// Version does not resolve, or resolves under another document.
    #[error("version not found: {id}")]
    VersionNotFound { id: String },

    /// Actor does not own the resource.
    #[error("access denied to document {document_id}")]
    AccessDenied { document_id: String },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] folio_storage::StorageError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn document_not_found(id: impl Into<String>) -> Self {
        Self::DocumentNotFound { id: id.into() }
    }

    pub fn version_not_found(id: impl Into<String>) -> Self {
        Self::VersionNotFound { id: id.into() }
    }

    pub fn access_denied(document_id: impl Into<String>) -> Self {
        Self::AccessDenied {
            document_id: document_id.into(),
        }
    }

    /// Classify into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::DocumentNotFound { .. } | Self::VersionNotFound { .. } => ErrorKind::NotFound,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::Config(_) | Self::Storage(_) | Self::Io(_) | Self::Json(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Structured failure safe to hand to a client.
    ///
    /// Internal causes are logged here and replaced with a generic message.
    pub fn failure(&self) -> Failure {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "Internal failure");
                "internal error".to_string()
            }
            ErrorKind::NotFound => "not found".to_string(),
            ErrorKind::AccessDenied => "access denied".to_string(),
            ErrorKind::Validation => self.to_string(),
        };
        Failure { kind, message }
    }
}

/// Error taxonomy visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    AccessDenied,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AccessDenied => "ACCESS_DENIED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind plus human-readable message. Carries no internal identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON/JSONC syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Config validation failed.
    #[error("config validation failed: {message}")]
    Validation { message: String },

    /// Explicitly requested config file is missing.
    #[error("config file not found: {path}")]
    NotFound { path: String },

    /// Environment variable not found during substitution.
    #[error("environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    /// File reference not found during substitution.
    #[error("file reference not found: {path}")]
    FileRefNotFound { path: String },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
