//! # Audit Errors

use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    #[error("Audit I/O error: {0}")]
    Io(String),

    #[error("Audit serialization error: {0}")]
    Serialization(String),

    #[error("Audit sink rejected events: {0}")]
    Rejected(String),

    #[error("Audit sink lock poisoned")]
    Poisoned,

    #[error("Audit sink disabled: {0}")]
    Disabled(String),

    #[error("Audit chain broken at record {index}: expected hash {expected}, found {found}")]
    ChainBroken {
        index: usize,
        expected: String,
        found: String,
    },
}

impl AuditError {
    pub fn code(&self) -> &'static str {
        match self {
            AuditError::Io(_) => "VAULT_AUDIT_IO_ERROR",
            AuditError::Serialization(_) => "VAULT_AUDIT_SERIALIZATION",
            AuditError::Rejected(_) => "VAULT_AUDIT_REJECTED",
            AuditError::Poisoned => "VAULT_AUDIT_POISONED",
            AuditError::Disabled(_) => "VAULT_AUDIT_DISABLED",
            AuditError::ChainBroken { .. } => "VAULT_AUDIT_CHAIN_BROKEN",
        }
    }
}

impl From<std::io::Error> for AuditError {
    fn from(e: std::io::Error) -> Self {
        AuditError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::Serialization(e.to_string())
    }
}
