//! Volatile document store.
//!
//! One `RwLock` guards all state. Readers share the read lock; each write
//! takes the write lock for its compare, audit emission and apply, so a
//! commit is one atomic step and concurrent writers serialize on it.

use std::sync::RwLock;

use tracing::debug;

use crate::audit::{AuditEvent, AuditSink};
use crate::document::Envelope;
use crate::types::{DocumentId, VersionId};
use crate::version::VersionEntry;

use super::errors::{StoreError, StoreResult};
use super::state::StoreState;
use super::{Commit, DocumentQuery, DocumentStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn insert(
        &self,
        envelope: Envelope,
        events: &[AuditEvent],
        audit: &dyn AuditSink,
    ) -> StoreResult<Envelope> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.check_insert(&envelope)?;
        audit.append_all(events)?;
        state.apply_insert(envelope.clone());
        debug!(document_id = %envelope.id(), "document inserted");
        Ok(envelope)
    }

    fn commit(&self, commit: Commit, audit: &dyn AuditSink) -> StoreResult<Envelope> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.check_commit(&commit)?;
        audit.append_all(&commit.events)?;
        Ok(state.apply_commit(commit))
    }

    fn load(&self, id: DocumentId, include_deleted: bool) -> StoreResult<Option<Envelope>> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.load(id, include_deleted))
    }

    fn versions(&self, id: DocumentId) -> StoreResult<Vec<VersionEntry>> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        state.versions(id)
    }

    fn version(&self, id: VersionId) -> StoreResult<Option<VersionEntry>> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.version(id))
    }

    fn list(&self, query: &DocumentQuery) -> StoreResult<Vec<Envelope>> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.list(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, AuditError, AuditResult, AuditTarget, MemoryAuditSink};
    use crate::document::test_envelope;
    use crate::types::ActorRef;

    struct RejectingSink;

    impl AuditSink for RejectingSink {
        fn append_all(&self, _events: &[AuditEvent]) -> AuditResult<()> {
            Err(AuditError::Rejected("sink offline".to_string()))
        }
    }

    fn created_event(env: &Envelope) -> AuditEvent {
        AuditEvent::new(
            AuditAction::DocumentCreated,
            AuditTarget::Document(env.id()),
            &ActorRef::new("author"),
        )
    }

    #[test]
    fn test_insert_emits_and_stores() {
        let store = MemoryStore::new();
        let sink = MemoryAuditSink::new();
        let env = test_envelope();

        store.insert(env.clone(), &[created_event(&env)], &sink).unwrap();

        assert_eq!(store.load(env.id(), false).unwrap(), Some(env));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_audit_failure_leaves_store_untouched() {
        let store = MemoryStore::new();
        let env = test_envelope();

        let err = store
            .insert(env.clone(), &[created_event(&env)], &RejectingSink)
            .unwrap_err();

        assert!(matches!(err, StoreError::Audit(_)));
        assert_eq!(store.load(env.id(), true).unwrap(), None);
    }

    #[test]
    fn test_conflict_emits_nothing() {
        let store = MemoryStore::new();
        let sink = MemoryAuditSink::new();
        let env = test_envelope();
        store.insert(env.clone(), &[], &sink).unwrap();

        let mut next = env.next_revision();
        next.title = "Renamed".to_string();
        let stale = Commit {
            expected_token: 7,
            envelope: next,
            version: None,
            events: vec![created_event(&env)],
        };

        assert!(matches!(
            store.commit(stale, &sink),
            Err(StoreError::Conflict { expected: 7, actual: 0, .. })
        ));
        assert!(sink.is_empty());
        assert_eq!(store.load(env.id(), false).unwrap().unwrap().title(), env.title());
    }

    #[test]
    fn test_versions_of_unknown_document() {
        let store = MemoryStore::new();
        let id = DocumentId::new();
        assert_eq!(store.versions(id), Err(StoreError::NotFound(id)));
    }
}
