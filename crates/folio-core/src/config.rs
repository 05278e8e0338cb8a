//! Configuration management for folio.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/folio/config.json`
//! 2. Environment variable: `FOLIO_CONFIG_CONTENT`
//! 3. Project config: `folio.jsonc` or `folio.json` in the working directory
//! 4. An explicit file passed on the command line
//!
//! Supports JSONC (JSON with comments) and variable substitution:
//! - `{env:VAR_NAME}` - Substitute environment variable
//! - `{file:path}` - Substitute file contents

use crate::error::{ConfigError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const DEFAULT_MAX_PAGE_LIMIT: usize = 100;
pub const DEFAULT_IGNORED_KEYS: &[&str] = &["_display"];
pub const DEFAULT_IDENTITY_FIELDS: &[&str] = &["id", "_id"];

/// Static regex for variable substitution, compiled once.
static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{(env|file):([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Main configuration structure. Every field is optional; accessors supply
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationConfig>,
}

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for folio_util::log::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// HS256 secret for bearer tokens.
    ///
    /// Supports variable substitution: `{env:FOLIO_JWT_SECRET}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    /// Lifetime of tokens issued by `folio token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_ttl_secs: Option<u64>,

    /// Accept the built-in development secret when `jwt_secret` is unset.
    /// Never enable this on a shared deployment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_mode: Option<bool>,
}

impl ServerConfig {
    fn merge(self, other: Self) -> Self {
        Self {
            address: other.address.or(self.address),
            jwt_secret: other.jwt_secret.or(self.jwt_secret),
            token_ttl_secs: other.token_ttl_secs.or(self.token_ttl_secs),
            dev_mode: other.dev_mode.or(self.dev_mode),
        }
    }
}

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<StorageBackend>,

    /// Root directory for the JSON backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    fn merge(self, other: Self) -> Self {
        Self {
            backend: other.backend.or(self.backend),
            path: other.path.or(self.path),
        }
    }
}

/// Diff engine policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Presentation keys excluded from comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_keys: Option<Vec<String>>,

    /// Fields that identify an object inside an array, tried in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_fields: Option<Vec<String>>,
}

impl DiffConfig {
    fn merge(self, other: Self) -> Self {
        Self {
            ignored_keys: other.ignored_keys.or(self.ignored_keys),
            identity_fields: other.identity_fields.or(self.identity_fields),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<usize>,
}

impl PaginationConfig {
    fn merge(self, other: Self) -> Self {
        Self {
            default_limit: other.default_limit.or(self.default_limit),
            max_limit: other.max_limit.or(self.max_limit),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/folio/`
    /// 2. `FOLIO_CONFIG_CONTENT` environment variable
    /// 3. Project config from `project_dir`
    /// 4. `explicit`, which must exist when given
    pub async fn load(
        project_dir: Option<&Path>,
        explicit: Option<&Path>,
    ) -> CoreResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = folio_util::path::config_dir() {
            for name in &["config.json", "folio.jsonc", "folio.json"] {
                let path = global_dir.join(name);
                if path.exists() {
                    config = config.merge(Self::load_file(&path).await?);
                    sources.push(path);
                    break;
                }
            }
        }

        if let Ok(content) = std::env::var("FOLIO_CONFIG_CONTENT") {
            config = config.merge(Self::parse_jsonc(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            for name in &["folio.jsonc", "folio.json"] {
                let path = dir.join(name);
                if path.exists() {
                    config = config.merge(Self::load_file(&path).await?);
                    sources.push(path);
                    break;
                }
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            config = config.merge(Self::load_file(path).await?);
            sources.push(path.to_path_buf());
        }

        config.validate()?;
        Ok((config, sources))
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let content = Self::substitute_variables(&content, path)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    fn parse_jsonc(content: &str, source: &str) -> CoreResult<Self> {
        let stripped = strip_comments(content);
        serde_json::from_str(&stripped).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Replace `{env:NAME}` and `{file:path}` references.
    ///
    /// `file` paths are relative to the config file.
    fn substitute_variables(content: &str, config_path: &Path) -> CoreResult<String> {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        let mut result = content.to_string();

        for cap in var_regex().captures_iter(content) {
            let (Some(full), Some(kind), Some(value)) = (cap.get(0), cap.get(1), cap.get(2))
            else {
                continue;
            };
            let value = value.as_str();

            let replacement = match kind.as_str() {
                "env" => std::env::var(value).map_err(|_| ConfigError::EnvVarNotFound {
                    name: value.to_string(),
                })?,
                "file" => {
                    let file_path = config_dir.join(value);
                    std::fs::read_to_string(&file_path)
                        .map(|v| v.trim().to_string())
                        .map_err(|_| ConfigError::FileRefNotFound {
                            path: file_path.display().to_string(),
                        })?
                }
                _ => continue,
            };

            result = result.replace(full.as_str(), &replacement);
        }

        Ok(result)
    }

    /// Reject settings no component could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_limit() == 0 || self.max_page_limit() == 0 {
            return Err(ConfigError::Validation {
                message: "pagination limits must be positive".to_string(),
            });
        }
        if self.default_page_limit() > self.max_page_limit() {
            return Err(ConfigError::Validation {
                message: "pagination.default_limit exceeds pagination.max_limit".to_string(),
            });
        }
        if matches!(self.jwt_secret(), Some("")) {
            return Err(ConfigError::Validation {
                message: "server.jwt_secret must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }

        self.server = merge_with(self.server, other.server, ServerConfig::merge);
        self.storage = merge_with(self.storage, other.storage, StorageConfig::merge);
        self.diff = merge_with(self.diff, other.diff, DiffConfig::merge);
        self.pagination = merge_with(self.pagination, other.pagination, PaginationConfig::merge);

        self
    }

    pub fn address(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.address.clone())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string())
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        self.server.as_ref().and_then(|s| s.jwt_secret.as_deref())
    }

    pub fn dev_mode(&self) -> bool {
        self.server
            .as_ref()
            .and_then(|s| s.dev_mode)
            .unwrap_or(false)
    }

    /// Turn on development mode, as `--dev` does.
    pub fn enable_dev_mode(&mut self) {
        self.server.get_or_insert_with(ServerConfig::default).dev_mode = Some(true);
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.server
            .as_ref()
            .and_then(|s| s.token_ttl_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS)
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage
            .as_ref()
            .and_then(|s| s.backend)
            .unwrap_or_default()
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(folio_util::path::default_store_dir)
    }

    pub fn ignored_keys(&self) -> Vec<String> {
        self.diff
            .as_ref()
            .and_then(|d| d.ignored_keys.clone())
            .unwrap_or_else(|| to_strings(DEFAULT_IGNORED_KEYS))
    }

    pub fn identity_fields(&self) -> Vec<String> {
        self.diff
            .as_ref()
            .and_then(|d| d.identity_fields.clone())
            .unwrap_or_else(|| to_strings(DEFAULT_IDENTITY_FIELDS))
    }

    pub fn default_page_limit(&self) -> usize {
        self.pagination
            .as_ref()
            .and_then(|p| p.default_limit)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    pub fn max_page_limit(&self) -> usize {
        self.pagination
            .as_ref()
            .and_then(|p| p.max_limit)
            .unwrap_or(DEFAULT_MAX_PAGE_LIMIT)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn merge_with<T>(base: Option<T>, other: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (base, other) {
        (Some(b), Some(o)) => Some(merge(b, o)),
        (b, None) => b,
        (None, o) => o,
    }
}

/// Strip `//` and `/* */` comments outside of string literals.
///
/// Newlines inside comments are kept so parse errors report the right line.
fn strip_comments(input: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        Str,
        StrEscape,
        Line,
        Block,
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Code;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        state = match state {
            State::Code => match (c, chars.peek()) {
                ('/', Some('/')) => {
                    chars.next();
                    State::Line
                }
                ('/', Some('*')) => {
                    chars.next();
                    State::Block
                }
                ('"', _) => {
                    out.push(c);
                    State::Str
                }
                _ => {
                    out.push(c);
                    State::Code
                }
            },
            State::Str => {
                out.push(c);
                match c {
                    '\\' => State::StrEscape,
                    '"' => State::Code,
                    _ => State::Str,
                }
            }
            State::StrEscape => {
                out.push(c);
                State::Str
            }
            State::Line => {
                if c == '\n' {
                    out.push(c);
                    State::Code
                } else {
                    State::Line
                }
            }
            State::Block => {
                if c == '\n' {
                    out.push(c);
                }
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    State::Code
                } else {
                    State::Block
                }
            }
        };
    }

    out
}
