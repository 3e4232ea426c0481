//! Indexer configuration.
//!
//! Three layers, each overriding the one before it:
//!
//! ```text
//! stock defaults  →  --config <file>  →  environment
//! ```
//!
//! The file is sparse: it only needs the keys it wants to change. Tables are
//! deep-merged as raw TOML before deserializing, so `[catalog] url = …` leaves
//! `catalog.timeout_secs` at its default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [catalog]
//! url = ""                  # Catalog API base; items go to <url>/image
//! # image_url = "..."       # Full image endpoint, used as-is; wins over url
//! timeout_secs = 30         # Per-request timeout
//!
//! [storage]
//! backend = "gcs"           # "gcs" or "local"
//! endpoint = "https://storage.googleapis.com"
//! local_root = "."          # Used by the local backend: <root>/<bucket>/<key>
//! # access_token = "..."    # Static bearer token for the gcs backend
//!
//! [logging]
//! format = "console"        # "console" or "json"
//! level = "info"            # Ignored when RUST_LOG is set
//!
//! [server]
//! bind = "0.0.0.0:8080"
//! ```
//!
//! ## Environment
//!
//! | Variable | Effect |
//! |---|---|
//! | `IMAGE_API_URL` | `catalog.image_url` (the full endpoint, e.g. `https://api/image`) |
//! | `APP_ENV=production` | `logging.format = "json"` |
//! | `PORT` | `server.bind = "0.0.0.0:$PORT"` |
//!
//! Unknown keys are rejected to catch typos early.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Indexer configuration.
///
/// All fields have defaults; a config file need only specify overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerConfig {
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

/// Where catalog requests go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// API base URL. Empty until configured; commands that talk to the
    /// catalog refuse to start without it.
    pub url: String,
    /// Full image endpoint. When set it is used unchanged and `url` is
    /// ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            image_url: None,
            timeout_secs: 30,
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Gcs,
    Local,
}

/// Where object bytes are downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// JSON API endpoint of the gcs backend.
    pub endpoint: String,
    /// Directory holding one subdirectory per bucket, for the local backend.
    pub local_root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Gcs,
            endpoint: "https://storage.googleapis.com".into(),
            local_root: PathBuf::from("."),
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `photosub_indexer=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Console,
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
        }
    }
}

impl IndexerConfig {
    /// Validate values that do not depend on the command being run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "catalog.timeout_secs must be greater than 0".into(),
            ));
        }
        self.bind_addr()?;
        if self.storage.backend == StorageBackend::Gcs {
            Url::parse(&self.storage.endpoint).map_err(|e| {
                ConfigError::Validation(format!(
                    "storage.endpoint {:?} is not a URL: {e}",
                    self.storage.endpoint
                ))
            })?;
        }
        Ok(())
    }

    /// The URL images are POSTed to and DELETEd from, for commands that send
    /// to the catalog: `catalog.image_url` as given, else `<catalog.url>/image`.
    pub fn catalog_endpoint(&self) -> Result<Url, ConfigError> {
        if let Some(image_url) = self.catalog.image_url.as_deref().filter(|u| !u.is_empty()) {
            return http_url("catalog.image_url", image_url);
        }
        if self.catalog.url.is_empty() {
            return Err(ConfigError::Validation(
                "catalog.url is not set (config file, or IMAGE_API_URL for the full endpoint)"
                    .into(),
            ));
        }
        let base = self.catalog.url.trim_end_matches('/');
        http_url("catalog.url", &format!("{base}/image"))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|e| {
            ConfigError::Validation(format!("server.bind {:?}: {e}", self.server.bind))
        })
    }

    /// Apply environment overrides. `var` looks a variable up by name.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("IMAGE_API_URL").filter(|v| !v.is_empty()) {
            self.catalog.image_url = Some(url);
        }
        if var("APP_ENV").as_deref() == Some("production") {
            self.logging.format = LogFormat::Json;
        }
        if let Some(port) = var("PORT").filter(|v| !v.is_empty()) {
            self.server.bind = format!("0.0.0.0:{port}");
        }
    }
}

fn http_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{key} {value:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "{key} must be http or https, got {:?}",
            url.scheme()
        )));
    }
    Ok(url)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer that user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(IndexerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. The file must exist.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value and deserialize it.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<IndexerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Load the effective configuration: defaults, then `path` if given, then
/// the process environment. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<IndexerConfig, ConfigError> {
    let overlay = path.map(load_raw_config).transpose()?;
    let mut config = resolve_config(stock_defaults_value()?, overlay)?;
    config.apply_env(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photosub-indexer configuration
# ===============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Environment variables override the file:
#   IMAGE_API_URL        -> catalog.image_url (full endpoint, used as-is)
#   APP_ENV=production   -> logging.format = "json"
#   PORT                 -> server.bind = "0.0.0.0:$PORT"
#   RUST_LOG             -> replaces logging.level entirely

# ---------------------------------------------------------------------------
# Catalog API
# ---------------------------------------------------------------------------
[catalog]
# Base URL of the catalog. New images are POSTed to <url>/image and removed
# with DELETE <url>/image. Required by serve, finalize and delete, unless
# image_url is set.
url = ""

# Full image endpoint, used exactly as written instead of <url>/image.
# image_url = "https://api.example.com/image"

# Per-request timeout in seconds. Requests are never retried.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Object storage
# ---------------------------------------------------------------------------
[storage]
# "gcs" downloads through the storage JSON API at `endpoint`.
# "local" reads <local_root>/<bucket>/<key> from disk.
backend = "gcs"
endpoint = "https://storage.googleapis.com"
local_root = "."

# Static bearer token sent with gcs downloads.
# access_token = ""

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# "console" for humans, "json" for log collectors.
format = "console"

# Filter directive, e.g. "debug" or "photosub_indexer=debug,info".
level = "info"

# ---------------------------------------------------------------------------
# Event receiver (serve)
# ---------------------------------------------------------------------------
[server]
bind = "0.0.0.0:8080"
"##
}
