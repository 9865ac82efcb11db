//! Store error types
//!
//! Error codes:
//! - VAULT_STORE_NOT_FOUND
//! - VAULT_STORE_ALREADY_EXISTS
//! - VAULT_STORE_CONFLICT (stale concurrency token)
//! - VAULT_STORE_INVALID_COMMIT (commit violates chain or token invariants)
//! - VAULT_STORE_AUDIT_FAILED (audit emission failed; nothing was applied)
//! - VAULT_STORE_IO_ERROR
//! - VAULT_STORE_CORRUPTION (FATAL)
//! - VAULT_STORE_HALTED (FATAL; store refuses writes after an unrecoverable failure)

use thiserror::Error;

use crate::audit::AuditError;
use crate::types::DocumentId;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Document already exists: {0}")]
    AlreadyExists(DocumentId),

    #[error("Concurrency conflict on {document_id}: expected token {expected}, store has {actual}")]
    Conflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid commit: {0}")]
    InvalidCommit(String),

    #[error("Audit emission failed, commit not applied: {0}")]
    Audit(#[from] AuditError),

    #[error("Store I/O error: {0}")]
    Io(String),

    #[error("Journal corruption at line {line}: {reason}")]
    Corruption { line: usize, reason: String },

    #[error("Store halted: {0}")]
    Halted(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "VAULT_STORE_NOT_FOUND",
            StoreError::AlreadyExists(_) => "VAULT_STORE_ALREADY_EXISTS",
            StoreError::Conflict { .. } => "VAULT_STORE_CONFLICT",
            StoreError::InvalidCommit(_) => "VAULT_STORE_INVALID_COMMIT",
            StoreError::Audit(_) => "VAULT_STORE_AUDIT_FAILED",
            StoreError::Io(_) => "VAULT_STORE_IO_ERROR",
            StoreError::Corruption { .. } => "VAULT_STORE_CORRUPTION",
            StoreError::Halted(_) => "VAULT_STORE_HALTED",
            StoreError::Poisoned => "VAULT_STORE_POISONED",
        }
    }

    /// Fatal errors mean the store can no longer be trusted to accept writes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Corruption { .. } | StoreError::Halted(_) | StoreError::Poisoned
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(StoreError::Corruption { line: 3, reason: "crc".into() }.is_fatal());
        assert!(StoreError::Halted("revoke failed".into()).is_fatal());
        assert!(!StoreError::Conflict {
            document_id: DocumentId::new(),
            expected: 1,
            actual: 2
        }
        .is_fatal());
        assert!(!StoreError::Audit(AuditError::Poisoned).is_fatal());
    }

    #[test]
    fn test_conflict_message_names_tokens() {
        let err = StoreError::Conflict {
            document_id: DocumentId::new(),
            expected: 1,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected token 1"));
        assert!(msg.contains("store has 2"));
        assert_eq!(err.code(), "VAULT_STORE_CONFLICT");
    }
}
