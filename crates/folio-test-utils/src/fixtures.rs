//! Content fixtures and temporary data directories.

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A block-structured document: `{"title": ..., "blocks": [{"id", "text"}]}`.
pub fn blocks(items: &[(&str, &str)]) -> String {
    let blocks: Vec<Value> = items
        .iter()
        .map(|(id, text)| json!({"id": id, "text": text}))
        .collect();
    json!({"title": "Fixture", "blocks": blocks}).to_string()
}

/// Same as [`blocks`] with a presentation hint the diff engine ignores.
pub fn blocks_with_display(items: &[(&str, &str)], collapsed: bool) -> String {
    let mut value: Value = serde_json::from_str(&blocks(items)).unwrap_or(Value::Null);
    value["_display"] = json!({"collapsed": collapsed});
    value.to_string()
}

/// Content that does not parse as JSON.
pub const PLAIN_TEXT: &str = "Meeting notes: ship on Friday";

/// A temporary directory for JSON stores and config files.
///
/// Removed when dropped.
pub struct TestDataDir {
    temp_dir: TempDir,
}

impl TestDataDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory to root a JSON store at.
    pub fn store_dir(&self) -> PathBuf {
        self.path().join("data")
    }

    /// Write a config file and return its path.
    pub fn write_config(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).expect("Failed to write config file");
        path
    }
}

impl Default for TestDataDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_shape() {
        let value: Value = serde_json::from_str(&blocks(&[("a", "one")])).unwrap();
        assert_eq!(value["blocks"][0]["id"], "a");
    }

    #[test]
    fn test_display_hint_added() {
        let value: Value =
            serde_json::from_str(&blocks_with_display(&[("a", "one")], true)).unwrap();
        assert_eq!(value["_display"]["collapsed"], true);
    }

    #[test]
    fn test_plain_text_is_not_json() {
        assert!(serde_json::from_str::<Value>(PLAIN_TEXT).is_err());
    }

    #[test]
    fn test_write_config() {
        let dir = TestDataDir::new();
        let path = dir.write_config("folio.json", "{}");
        assert!(path.exists());
    }
}
