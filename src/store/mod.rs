//! Document persistence.
//!
//! A [`DocumentStore`] holds envelopes and their version chains and applies
//! writes as compare-and-swap commits: a commit names the token it expects,
//! and the store rejects it with [`StoreError::Conflict`] when the stored
//! token differs. Token comparison, audit emission and the write happen
//! as one atomic step.
//!
//! Two implementations share the same validation:
//! - [`MemoryStore`]: volatile, used by tests and embedders
//! - [`JournalStore`]: crc-framed append-only journal replayed on open

mod errors;
mod journal;
mod memory;
mod record;
mod state;

pub use errors::{StoreError, StoreResult};
pub use journal::{JournalStore, ReplayStats};
pub use memory::MemoryStore;
pub use record::JournalRecord;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink};
use crate::document::{DocumentStatus, Envelope};
use crate::types::{DocumentId, OrganizationId, VersionId};
use crate::version::VersionEntry;

/// One compare-and-swap write.
///
/// `envelope` is the full replacement and must carry
/// `expected_token + 1`. `version`, when present, is appended to the chain
/// and must be the envelope's new current version.
#[derive(Debug, Clone)]
pub struct Commit {
    pub expected_token: u64,
    pub envelope: Envelope,
    pub version: Option<VersionEntry>,
    pub events: Vec<AuditEvent>,
}

/// Filter for [`DocumentStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentQuery {
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub include_deleted: bool,
}

impl DocumentQuery {
    pub fn matches(&self, envelope: &Envelope) -> bool {
        if !self.include_deleted && envelope.is_deleted() {
            return false;
        }
        if let Some(org) = self.organization_id {
            if envelope.organization_id() != org {
                return false;
            }
        }
        if let Some(folder) = self.folder_id {
            if envelope.folder().map(|f| f.id) != Some(folder) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if envelope.status() != status {
                return false;
            }
        }
        true
    }
}

pub trait DocumentStore: Send + Sync {
    /// Stores a new envelope at token 0, emitting `events` atomically.
    fn insert(
        &self,
        envelope: Envelope,
        events: &[AuditEvent],
        audit: &dyn AuditSink,
    ) -> StoreResult<Envelope>;

    /// Applies a compare-and-swap commit and returns the stored envelope.
    fn commit(&self, commit: Commit, audit: &dyn AuditSink) -> StoreResult<Envelope>;

    /// Loads an envelope. Soft-deleted ones are hidden unless asked for.
    fn load(&self, id: DocumentId, include_deleted: bool) -> StoreResult<Option<Envelope>>;

    /// The full chain, ordered by sequence number.
    fn versions(&self, id: DocumentId) -> StoreResult<Vec<VersionEntry>>;

    fn version(&self, id: VersionId) -> StoreResult<Option<VersionEntry>>;

    fn list(&self, query: &DocumentQuery) -> StoreResult<Vec<Envelope>>;
}
