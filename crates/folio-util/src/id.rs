//! ULID-based identifier generation with prefixes.
//!
//! Identifiers in folio follow the pattern: `prefix_ulid`
//! For example: `doc_01hqxyz...` for documents, `ver_01hqxyz...` for versions.

use ulid::Ulid;

/// Known identifier prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    Document,
    Version,
}

impl IdPrefix {
    /// Get the string prefix for this identifier type.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Document => "doc",
            IdPrefix::Version => "ver",
        }
    }

    /// Parse a prefix from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "doc" => Some(IdPrefix::Document),
            "ver" => Some(IdPrefix::Version),
            _ => None,
        }
    }
}

/// Identifier generation and parsing utilities.
pub struct Identifier;

impl Identifier {
    /// Generate a new ascending identifier (newer = larger).
    pub fn ascending(prefix: IdPrefix) -> String {
        let ulid = Ulid::new();
        format!("{}_{}", prefix.as_str(), ulid.to_string().to_lowercase())
    }

    /// Generate an identifier with a specific ULID (for testing or imports).
    pub fn with_ulid(prefix: IdPrefix, ulid: Ulid) -> String {
        format!("{}_{}", prefix.as_str(), ulid.to_string().to_lowercase())
    }

    /// Parse an identifier into its prefix and ULID parts.
    pub fn parse(id: &str) -> Option<(IdPrefix, Ulid)> {
        let (prefix, rest) = id.split_once('_')?;
        let prefix = IdPrefix::parse(prefix)?;
        let ulid = Ulid::from_string(rest).ok()?;
        Some((prefix, ulid))
    }

    /// Check that an identifier is well-formed and carries the expected prefix.
    ///
    /// Anything arriving from outside (URL segments, request bodies) should pass
    /// through this before it is used as a storage key.
    pub fn is_valid(id: &str, prefix: IdPrefix) -> bool {
        matches!(Self::parse(id), Some((p, _)) if p == prefix)
    }

    /// Generate a document ID.
    pub fn document() -> String {
        Self::ascending(IdPrefix::Document)
    }

    /// Generate a version ID.
    pub fn version() -> String {
        Self::ascending(IdPrefix::Version)
    }
}
