//! CLI error types
//!
//! Errors from `exec` requests are reported per request on stdout. Anything
//! returned from a command itself is fatal: printed to stderr, exit code 1.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::audit::AuditError;
use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::store::StoreError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Data directory already initialized: {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("Data directory not initialized: {}. Run 'docvault init' first.", .0.display())]
    NotInitialized(PathBuf),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "VAULT_CLI_CONFIG_ERROR",
            CliError::AlreadyInitialized(_) => "VAULT_CLI_ALREADY_INITIALIZED",
            CliError::NotInitialized(_) => "VAULT_CLI_NOT_INITIALIZED",
            CliError::InvalidRequest(_) => "VAULT_CLI_INVALID_REQUEST",
            CliError::Document(e) => e.code(),
            CliError::Store(e) => e.code(),
            CliError::Audit(e) => e.code(),
            CliError::Logging(_) => "VAULT_CLI_LOGGING_ERROR",
            CliError::Io(_) => "VAULT_CLI_IO_ERROR",
            CliError::Json(_) => "VAULT_CLI_INVALID_REQUEST",
        }
    }
}
