//! Tamper-evident hash chain over audit records.
//!
//! Each record stores the hash of its predecessor and its own
//! `sha256(prev_hash | event_json)`. The first record chains from a fixed
//! seed. Removing, reordering or editing any record breaks every hash after
//! it.

use serde::{Deserialize, Serialize};

use crate::version::checksum::compute_checksum;

use super::errors::{AuditError, AuditResult};
use super::event::AuditEvent;

/// Predecessor hash of the first record in a chain.
pub const CHAIN_SEED: &str = "DOCVAULT_AUDIT_CHAIN_SEED_V1";

/// An audit event as stored by a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event: AuditEvent,
    pub prev_hash: String,
    pub integrity_hash: String,
}

pub fn compute_integrity_hash(prev_hash: &str, event_json: &str) -> String {
    let combined = format!("{prev_hash}|{event_json}");
    compute_checksum(combined.as_bytes())
}

/// Running head of a chain.
#[derive(Debug, Clone, Default)]
pub struct HashChain {
    last: Option<String>,
}

impl HashChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes after a record whose integrity hash is `last`.
    pub fn resume(last: Option<String>) -> Self {
        Self { last }
    }

    pub fn head(&self) -> &str {
        self.last.as_deref().unwrap_or(CHAIN_SEED)
    }

    /// Links `event` onto the chain and advances the head.
    pub fn seal(&mut self, event: AuditEvent) -> AuditResult<AuditRecord> {
        let prev_hash = self.head().to_string();
        let event_json = serde_json::to_string(&event)?;
        let integrity_hash = compute_integrity_hash(&prev_hash, &event_json);
        self.last = Some(integrity_hash.clone());

        Ok(AuditRecord {
            event,
            prev_hash,
            integrity_hash,
        })
    }
}

/// Recomputes the chain and fails on the first record that does not link.
pub fn verify_chain(records: &[AuditRecord]) -> AuditResult<()> {
    let mut expected_prev = CHAIN_SEED.to_string();

    for (index, record) in records.iter().enumerate() {
        if record.prev_hash != expected_prev {
            return Err(AuditError::ChainBroken {
                index,
                expected: expected_prev,
                found: record.prev_hash.clone(),
            });
        }

        let event_json = serde_json::to_string(&record.event)?;
        let recomputed = compute_integrity_hash(&record.prev_hash, &event_json);
        if recomputed != record.integrity_hash {
            return Err(AuditError::ChainBroken {
                index,
                expected: recomputed,
                found: record.integrity_hash.clone(),
            });
        }

        expected_prev = record.integrity_hash.clone();
    }

    Ok(())
}
