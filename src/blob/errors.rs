//! # Blob Store Errors

use thiserror::Error;

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid content reference: {0}")]
    InvalidReference(String),

    #[error("Checksum mismatch for {0}")]
    ChecksumMismatch(String),

    #[error("Blob I/O error: {0}")]
    Io(String),

    #[error("Blob store lock poisoned")]
    Poisoned,
}

impl BlobError {
    pub fn code(&self) -> &'static str {
        match self {
            BlobError::NotFound(_) => "VAULT_BLOB_NOT_FOUND",
            BlobError::InvalidReference(_) => "VAULT_BLOB_INVALID_REFERENCE",
            BlobError::ChecksumMismatch(_) => "VAULT_BLOB_CHECKSUM_MISMATCH",
            BlobError::Io(_) => "VAULT_BLOB_IO_ERROR",
            BlobError::Poisoned => "VAULT_BLOB_POISONED",
        }
    }
}

impl From<std::io::Error> for BlobError {
    fn from(e: std::io::Error) -> Self {
        BlobError::Io(e.to_string())
    }
}
