//! In-memory store state shared by every `DocumentStore` implementation.
//!
//! Writes are split into `check_*` (pure validation against current state)
//! and `apply_*` (infallible mutation). Implementations run both under one
//! exclusive lock, with audit emission in between, which makes the
//! token comparison and the write a single atomic step.

use std::collections::HashMap;

use crate::document::Envelope;
use crate::types::{DocumentId, VersionId};
use crate::version::VersionEntry;

use super::errors::{StoreError, StoreResult};
use super::{Commit, DocumentQuery};

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    documents: HashMap<DocumentId, Envelope>,
    chains: HashMap<DocumentId, Vec<VersionEntry>>,
    version_index: HashMap<VersionId, (DocumentId, usize)>,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn version_count(&self) -> usize {
        self.version_index.len()
    }

    pub fn check_insert(&self, envelope: &Envelope) -> StoreResult<()> {
        if self.documents.contains_key(&envelope.id()) {
            return Err(StoreError::AlreadyExists(envelope.id()));
        }
        if envelope.concurrency_token() != 0
            || envelope.version_count() != 0
            || envelope.current_version_ref().is_some()
        {
            return Err(StoreError::InvalidCommit(format!(
                "new document {} must start at token 0 with no versions",
                envelope.id()
            )));
        }
        Ok(())
    }

    pub fn apply_insert(&mut self, envelope: Envelope) {
        self.chains.insert(envelope.id(), Vec::new());
        self.documents.insert(envelope.id(), envelope);
    }

    /// Validates a compare-and-swap commit.
    ///
    /// Fails with `Conflict` when the stored token differs from the expected
    /// one; every other failure means the commit itself is malformed.
    pub fn check_commit(&self, commit: &Commit) -> StoreResult<()> {
        let id = commit.envelope.id();
        let current = self.documents.get(&id).ok_or(StoreError::NotFound(id))?;

        if current.concurrency_token() != commit.expected_token {
            return Err(StoreError::Conflict {
                document_id: id,
                expected: commit.expected_token,
                actual: current.concurrency_token(),
            });
        }

        if commit.envelope.concurrency_token() != commit.expected_token + 1 {
            return Err(StoreError::InvalidCommit(format!(
                "token must advance from {} to {}, got {}",
                commit.expected_token,
                commit.expected_token + 1,
                commit.envelope.concurrency_token()
            )));
        }

        match &commit.version {
            Some(version) => {
                let expected_seq = current.version_count() + 1;
                if version.document_id() != id {
                    return Err(StoreError::InvalidCommit(format!(
                        "version {} belongs to {}, not {}",
                        version.id(),
                        version.document_id(),
                        id
                    )));
                }
                if version.sequence_number() != expected_seq {
                    return Err(StoreError::InvalidCommit(format!(
                        "sequence number must be {}, got {}",
                        expected_seq,
                        version.sequence_number()
                    )));
                }
                if commit.envelope.version_count() != expected_seq
                    || commit.envelope.current_version_ref() != Some(version.id())
                {
                    return Err(StoreError::InvalidCommit(
                        "envelope does not point at the new version".to_string(),
                    ));
                }
                if self.version_index.contains_key(&version.id()) {
                    return Err(StoreError::InvalidCommit(format!(
                        "version {} already committed",
                        version.id()
                    )));
                }
            }
            None => {
                if commit.envelope.version_count() != current.version_count()
                    || commit.envelope.current_version_ref() != current.current_version_ref()
                {
                    return Err(StoreError::InvalidCommit(
                        "version pointers may only change with a new version".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Applies a commit that passed `check_commit`.
    pub fn apply_commit(&mut self, commit: Commit) -> Envelope {
        let id = commit.envelope.id();

        if let Some(version) = commit.version {
            let chain = self.chains.entry(id).or_default();
            self.version_index.insert(version.id(), (id, chain.len()));
            chain.push(version);
        }

        self.documents.insert(id, commit.envelope.clone());
        commit.envelope
    }

    pub fn load(&self, id: DocumentId, include_deleted: bool) -> Option<Envelope> {
        self.documents
            .get(&id)
            .filter(|env| include_deleted || !env.is_deleted())
            .cloned()
    }

    pub fn versions(&self, id: DocumentId) -> StoreResult<Vec<VersionEntry>> {
        if !self.documents.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(self.chains.get(&id).cloned().unwrap_or_default())
    }

    pub fn version(&self, id: VersionId) -> Option<VersionEntry> {
        let (doc, index) = self.version_index.get(&id)?;
        self.chains.get(doc)?.get(*index).cloned()
    }

    pub fn list(&self, query: &DocumentQuery) -> Vec<Envelope> {
        let mut out: Vec<Envelope> = self
            .documents
            .values()
            .filter(|env| query.matches(env))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_envelope;
    use crate::version::test_entry;

    fn insert(state: &mut StoreState) -> Envelope {
        let env = test_envelope();
        state.check_insert(&env).unwrap();
        state.apply_insert(env.clone());
        env
    }

    fn version_commit(current: &Envelope) -> Commit {
        let entry = test_entry(current.id(), current.version_count() + 1, b"content");
        let mut next = current.next_revision();
        next.version_count = entry.sequence_number();
        next.current_version_ref = Some(entry.id());
        Commit {
            expected_token: current.concurrency_token(),
            envelope: next,
            version: Some(entry),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut state = StoreState::new();
        let env = insert(&mut state);
        assert_eq!(state.check_insert(&env), Err(StoreError::AlreadyExists(env.id())));
    }

    #[test]
    fn test_commit_with_matching_token_applies() {
        let mut state = StoreState::new();
        let env = insert(&mut state);

        let commit = version_commit(&env);
        state.check_commit(&commit).unwrap();
        let applied = state.apply_commit(commit);

        assert_eq!(applied.concurrency_token(), 1);
        assert_eq!(state.versions(env.id()).unwrap().len(), 1);
        assert_eq!(state.version_count(), 1);
    }

    #[test]
    fn test_stale_token_is_conflict() {
        let mut state = StoreState::new();
        let env = insert(&mut state);
        let first = version_commit(&env);
        let second = version_commit(&env);

        state.check_commit(&first).unwrap();
        state.apply_commit(first);

        assert_eq!(
            state.check_commit(&second),
            Err(StoreError::Conflict {
                document_id: env.id(),
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn test_token_must_advance_by_exactly_one() {
        let mut state = StoreState::new();
        let env = insert(&mut state);
        let mut commit = version_commit(&env);
        commit.envelope.concurrency_token = 5;

        assert!(matches!(
            state.check_commit(&commit),
            Err(StoreError::InvalidCommit(_))
        ));
    }

    #[test]
    fn test_sequence_gap_rejected() {
        let mut state = StoreState::new();
        let env = insert(&mut state);
        let mut commit = version_commit(&env);
        let entry = test_entry(env.id(), 2, b"skip");
        commit.envelope.version_count = 2;
        commit.envelope.current_version_ref = Some(entry.id());
        commit.version = Some(entry);

        assert!(matches!(
            state.check_commit(&commit),
            Err(StoreError::InvalidCommit(_))
        ));
    }

    #[test]
    fn test_metadata_commit_may_not_move_version_pointer() {
        let mut state = StoreState::new();
        let env = insert(&mut state);
        let mut commit = version_commit(&env);
        commit.version = None;

        assert!(matches!(
            state.check_commit(&commit),
            Err(StoreError::InvalidCommit(_))
        ));
    }

    #[test]
    fn test_soft_deleted_hidden_by_default() {
        let mut state = StoreState::new();
        let env = insert(&mut state);
        let mut next = env.next_revision();
        next.deleted = Some(crate::document::SoftDelete {
            deleted_at: chrono::Utc::now(),
            deleted_by: crate::types::ActorRef::new("admin"),
        });
        let commit = Commit {
            expected_token: 0,
            envelope: next,
            version: None,
            events: Vec::new(),
        };
        state.check_commit(&commit).unwrap();
        state.apply_commit(commit);

        assert!(state.load(env.id(), false).is_none());
        assert!(state.load(env.id(), true).is_some());
        assert!(state.list(&DocumentQuery::default()).is_empty());
        assert_eq!(
            state
                .list(&DocumentQuery {
                    include_deleted: true,
                    ..DocumentQuery::default()
                })
                .len(),
            1
        );
    }
}
