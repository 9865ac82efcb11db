//! Configuration file
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/docvault",
//!   "fsync": true,
//!   "log_format": "text",
//!   "max_content_bytes": 268435456
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::DEFAULT_MAX_CONTENT_BYTES;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Log output format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: String,

    /// Sync journal and audit log after every write.
    #[serde(default = "default_fsync")]
    pub fsync: bool,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: u64,
}

fn default_fsync() -> bool {
    true
}

fn default_max_content_bytes() -> u64 {
    DEFAULT_MAX_CONTENT_BYTES
}

impl Config {
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            fsync: default_fsync(),
            log_format: LogFormat::default(),
            max_content_bytes: default_max_content_bytes(),
        }
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".to_string()));
        }
        if self.max_content_bytes == 0 {
            return Err(ConfigError::Invalid("max_content_bytes must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_path().join("journal").join("documents.journal")
    }

    pub fn audit_path(&self) -> PathBuf {
        self.data_path().join("audit").join("audit.log")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_path().join("blobs")
    }

    /// A data directory counts as initialized once its journal directory
    /// exists.
    pub fn is_initialized(&self) -> bool {
        self.data_path().join("journal").is_dir()
    }
}
