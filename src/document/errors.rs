//! Document error types
//!
//! Error codes:
//! - VAULT_VALIDATION_BLANK_FIELD
//! - VAULT_VALIDATION_EMPTY_CONTENT
//! - VAULT_VALIDATION_CONTENT_TOO_LARGE
//! - VAULT_VALIDATION_CONTENT_TYPE
//! - VAULT_VALIDATION_STATUS_TRANSITION
//! - VAULT_CONCURRENCY_CONFLICT (reload and retry)
//! - VAULT_DOCUMENT_LOCKED (wait for the holder to release)
//! - VAULT_HARD_DELETE_NOT_ALLOWED (FATAL)
//! - VAULT_IMMUTABLE_RECORD (FATAL)
//! - VAULT_NOT_FOUND / VAULT_VERSION_NOT_FOUND
//! - VAULT_ALREADY_DELETED / VAULT_NOT_DELETED / VAULT_DOCUMENT_DELETED / VAULT_NOT_LOCKED
//! - VAULT_AUDIT_FAILED
//! - VAULT_BLOB_* / VAULT_STORE_*

use std::fmt;

use thiserror::Error;

use crate::audit::AuditError;
use crate::blob::BlobError;
use crate::store::StoreError;
use crate::types::{ActorRef, DocumentId, VersionId};

use super::status::DocumentStatus;

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Broad category of a [`DocumentError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    ConcurrencyConflict,
    DocumentLocked,
    HardDeleteNotAllowed,
    ImmutableRecord,
    NotFound,
    InvalidState,
    Audit,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ConcurrencyConflict => "concurrency_conflict",
            ErrorKind::DocumentLocked => "document_locked",
            ErrorKind::HardDeleteNotAllowed => "hard_delete_not_allowed",
            ErrorKind::ImmutableRecord => "immutable_record",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Audit => "audit",
            ErrorKind::Storage => "storage",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    // Validation
    #[error("Validation error: {0} must not be blank")]
    BlankField(&'static str),

    #[error("Validation error: content must not be empty")]
    EmptyContent,

    #[error("Validation error: content is {size} bytes, limit is {limit}")]
    ContentTooLarge { size: u64, limit: u64 },

    #[error("Validation error: invalid content type '{0}'")]
    InvalidContentType(String),

    #[error("Validation error: status cannot change from {from} to {to}")]
    InvalidStatusTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    // Concurrency
    #[error("Concurrency conflict on {document_id}: expected token {expected}, current is {actual}")]
    ConcurrencyConflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },

    #[error("Document {document_id} is locked by {holder}")]
    DocumentLocked {
        document_id: DocumentId,
        holder: ActorRef,
    },

    // Policy
    #[error("Hard delete is not allowed for document {0}")]
    HardDeleteNotAllowed(DocumentId),

    #[error("Version {0} is immutable and cannot be modified or deleted")]
    ImmutableRecord(VersionId),

    // Lookup and state
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("Document {0} is already deleted")]
    AlreadyDeleted(DocumentId),

    #[error("Document {0} is not deleted")]
    NotDeleted(DocumentId),

    #[error("Document {0} is deleted; restore it before adding versions")]
    DocumentDeleted(DocumentId),

    #[error("Document {0} is not locked")]
    NotLocked(DocumentId),

    // Collaborators
    #[error("Audit emission failed: {0}")]
    Audit(AuditError),

    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl DocumentError {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentError::BlankField(_) => "VAULT_VALIDATION_BLANK_FIELD",
            DocumentError::EmptyContent => "VAULT_VALIDATION_EMPTY_CONTENT",
            DocumentError::ContentTooLarge { .. } => "VAULT_VALIDATION_CONTENT_TOO_LARGE",
            DocumentError::InvalidContentType(_) => "VAULT_VALIDATION_CONTENT_TYPE",
            DocumentError::InvalidStatusTransition { .. } => "VAULT_VALIDATION_STATUS_TRANSITION",
            DocumentError::ConcurrencyConflict { .. } => "VAULT_CONCURRENCY_CONFLICT",
            DocumentError::DocumentLocked { .. } => "VAULT_DOCUMENT_LOCKED",
            DocumentError::HardDeleteNotAllowed(_) => "VAULT_HARD_DELETE_NOT_ALLOWED",
            DocumentError::ImmutableRecord(_) => "VAULT_IMMUTABLE_RECORD",
            DocumentError::NotFound(_) => "VAULT_NOT_FOUND",
            DocumentError::VersionNotFound(_) => "VAULT_VERSION_NOT_FOUND",
            DocumentError::AlreadyDeleted(_) => "VAULT_ALREADY_DELETED",
            DocumentError::NotDeleted(_) => "VAULT_NOT_DELETED",
            DocumentError::DocumentDeleted(_) => "VAULT_DOCUMENT_DELETED",
            DocumentError::NotLocked(_) => "VAULT_NOT_LOCKED",
            DocumentError::Audit(_) => "VAULT_AUDIT_FAILED",
            DocumentError::Blob(e) => e.code(),
            DocumentError::Storage(e) => e.code(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::BlankField(_)
            | DocumentError::EmptyContent
            | DocumentError::ContentTooLarge { .. }
            | DocumentError::InvalidContentType(_)
            | DocumentError::InvalidStatusTransition { .. } => ErrorKind::Validation,
            DocumentError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            DocumentError::DocumentLocked { .. } => ErrorKind::DocumentLocked,
            DocumentError::HardDeleteNotAllowed(_) => ErrorKind::HardDeleteNotAllowed,
            DocumentError::ImmutableRecord(_) => ErrorKind::ImmutableRecord,
            DocumentError::NotFound(_) | DocumentError::VersionNotFound(_) => ErrorKind::NotFound,
            DocumentError::AlreadyDeleted(_)
            | DocumentError::NotDeleted(_)
            | DocumentError::DocumentDeleted(_)
            | DocumentError::NotLocked(_) => ErrorKind::InvalidState,
            DocumentError::Audit(_) => ErrorKind::Audit,
            DocumentError::Blob(_) | DocumentError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether a caller can act on the error and try again.
    ///
    /// Policy violations and store corruption are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            DocumentError::HardDeleteNotAllowed(_) | DocumentError::ImmutableRecord(_) => false,
            DocumentError::Storage(e) => !e.is_fatal(),
            _ => true,
        }
    }
}

impl From<StoreError> for DocumentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict {
                document_id,
                expected,
                actual,
            } => DocumentError::ConcurrencyConflict {
                document_id,
                expected,
                actual,
            },
            StoreError::NotFound(id) => DocumentError::NotFound(id),
            StoreError::Audit(e) => DocumentError::Audit(e),
            other => DocumentError::Storage(other),
        }
    }
}

impl From<AuditError> for DocumentError {
    fn from(e: AuditError) -> Self {
        DocumentError::Audit(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_concurrency_conflict() {
        let id = DocumentId::new();
        let err: DocumentError = StoreError::Conflict {
            document_id: id,
            expected: 1,
            actual: 2,
        }
        .into();

        assert_eq!(
            err,
            DocumentError::ConcurrencyConflict {
                document_id: id,
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_store_audit_failure_maps_to_audit() {
        let err: DocumentError = StoreError::Audit(AuditError::Rejected("x".into())).into();
        assert_eq!(err.code(), "VAULT_AUDIT_FAILED");
        assert_eq!(err.kind(), ErrorKind::Audit);
    }

    #[test]
    fn test_policy_violations_are_fatal() {
        let hard = DocumentError::HardDeleteNotAllowed(DocumentId::new());
        let immutable = DocumentError::ImmutableRecord(VersionId::new());

        assert!(!hard.is_recoverable());
        assert!(!immutable.is_recoverable());
        assert_eq!(hard.code(), "VAULT_HARD_DELETE_NOT_ALLOWED");
        assert_eq!(immutable.kind(), ErrorKind::ImmutableRecord);
    }

    #[test]
    fn test_corruption_is_fatal() {
        let err: DocumentError = StoreError::Corruption {
            line: 3,
            reason: "bad crc".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_validation_kind() {
        assert_eq!(DocumentError::EmptyContent.kind(), ErrorKind::Validation);
        assert_eq!(
            DocumentError::BlankField("file_name").to_string(),
            "Validation error: file_name must not be blank"
        );
    }
}
