//! Durable, append-only document journal.
//!
//! Every insert and commit is appended (and optionally fsynced) before its
//! audit batch is emitted. If emission fails, a `revoke` record is appended
//! for that commit and the in-memory state is not touched, so replay skips
//! it too. If the revoke itself cannot be written the store halts: it
//! refuses further writes until reopened, because the journal then holds a
//! commit with no audit trail.
//!
//! On open, the journal is replayed through the same validation as live
//! commits. Any checksum failure or invariant violation is fatal.
//!
//! Each record names the audit events emitted with it. A crash between the
//! journal fsync and the audit write leaves a record whose events never
//! reached the trail; replay treats such a record as revoked and appends the
//! missing `revoke` before accepting writes. A record whose batch is only
//! partly present is corruption.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditReader, AuditSink};
use crate::document::Envelope;
use crate::types::{DocumentId, VersionId};
use crate::version::VersionEntry;

use super::errors::{StoreError, StoreResult};
use super::record::{self, JournalRecord};
use super::state::StoreState;
use super::{Commit, DocumentQuery, DocumentStore};

/// Counts gathered while replaying a journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub records: usize,
    pub documents: usize,
    pub versions: usize,
    pub revoked: usize,
    /// Unaudited records revoked while opening.
    pub reconciled: usize,
}

pub struct JournalStore {
    path: PathBuf,
    fsync: bool,
    state: RwLock<StoreState>,
    writer: Mutex<JournalWriter>,
    stats: ReplayStats,
}

struct JournalWriter {
    file: File,
    next_seq: u64,
    halted: Option<String>,
}

impl JournalWriter {
    fn append(&mut self, record: &JournalRecord, fsync: bool) -> StoreResult<()> {
        let line = record::encode(record)?;
        self.file.write_all(&line)?;
        self.file.flush()?;
        if fsync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    fn claim_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn ensure_running(&self) -> StoreResult<()> {
        match &self.halted {
            Some(reason) => Err(StoreError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    fn halt(&mut self, reason: String) -> StoreError {
        error!(reason = %reason, "journal halted");
        self.halted = Some(reason.clone());
        StoreError::Halted(reason)
    }

    /// Withdraws `seq` after its audit batch failed.
    fn revoke(&mut self, revokes: u64, fsync: bool) -> StoreResult<()> {
        let seq = self.claim_seq();
        if let Err(e) = self.append(&JournalRecord::Revoke { seq, revokes }, fsync) {
            return Err(self.halt(format!("could not revoke unaudited record {}: {}", revokes, e)));
        }
        Ok(())
    }
}

impl JournalStore {
    /// Opens or creates the journal at `path` and replays it, reconciling
    /// against the events already in `audit`.
    pub fn open(path: impl AsRef<Path>, fsync: bool, audit: &dyn AuditReader) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let audited: HashSet<Uuid> = audit
            .records()
            .map_err(StoreError::Audit)?
            .into_iter()
            .map(|r| r.event.id)
            .collect();

        let (state, stats, last_seq, unaudited) = Self::replay(&path, &audited)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut writer = JournalWriter {
            file,
            next_seq: last_seq + 1,
            halted: None,
        };
        for seq in &unaudited {
            writer.revoke(*seq, fsync)?;
        }

        info!(
            path = %path.display(),
            records = stats.records,
            documents = stats.documents,
            versions = stats.versions,
            revoked = stats.revoked,
            reconciled = stats.reconciled,
            "journal replayed"
        );

        Ok(Self {
            path,
            fsync,
            state: RwLock::new(state),
            writer: Mutex::new(writer),
            stats,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// What was found on disk when the journal was opened.
    pub fn replay_stats(&self) -> ReplayStats {
        self.stats
    }

    fn replay(
        path: &Path,
        audited: &HashSet<Uuid>,
    ) -> StoreResult<(StoreState, ReplayStats, u64, Vec<u64>)> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (i, line) in record::split_lines(&content)?.into_iter().enumerate() {
            records.push((i + 1, record::decode(line, i + 1)?));
        }

        let revoked: HashSet<u64> = records
            .iter()
            .filter_map(|(_, r)| match r {
                JournalRecord::Revoke { revokes, .. } => Some(*revokes),
                _ => None,
            })
            .collect();

        let mut state = StoreState::new();
        let mut last_seq = 0;
        let mut unaudited = Vec::new();

        for (line, rec) in records.iter().cloned() {
            let seq = rec.seq();
            if seq <= last_seq {
                return Err(StoreError::Corruption {
                    line,
                    reason: format!("sequence {} does not follow {}", seq, last_seq),
                });
            }
            last_seq = seq;

            if revoked.contains(&seq) {
                debug!(seq, "skipping revoked journal record");
                continue;
            }

            let ids = rec.audit_ids();
            let present = ids.iter().filter(|id| audited.contains(id)).count();
            if present < ids.len() {
                if present > 0 {
                    return Err(StoreError::Corruption {
                        line,
                        reason: format!(
                            "only {} of {} audit events for record {} are in the trail",
                            present,
                            ids.len(),
                            seq
                        ),
                    });
                }
                warn!(seq, "journal record has no audit trail, revoking");
                unaudited.push(seq);
                continue;
            }

            let corrupt = |e: StoreError| StoreError::Corruption {
                line,
                reason: e.to_string(),
            };

            match rec {
                JournalRecord::Insert { envelope, .. } => {
                    state.check_insert(&envelope).map_err(corrupt)?;
                    state.apply_insert(envelope);
                }
                JournalRecord::Commit {
                    expected_token,
                    envelope,
                    version,
                    ..
                } => {
                    let commit = Commit {
                        expected_token,
                        envelope,
                        version,
                        events: Vec::new(),
                    };
                    state.check_commit(&commit).map_err(corrupt)?;
                    state.apply_commit(commit);
                }
                JournalRecord::Revoke { .. } => {}
            }
        }

        let stats = ReplayStats {
            records: records.len(),
            documents: state.document_count(),
            versions: state.version_count(),
            revoked: revoked.len(),
            reconciled: unaudited.len(),
        };
        Ok((state, stats, last_seq, unaudited))
    }

    /// Appends `record`, emits `events`, and revokes the record if emission
    /// fails. Caller holds the state write lock.
    fn append_and_emit(
        &self,
        build: impl FnOnce(u64) -> JournalRecord,
        events: &[AuditEvent],
        audit: &dyn AuditSink,
    ) -> StoreResult<()> {
        let mut writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        writer.ensure_running()?;

        let seq = writer.claim_seq();
        // A failed append may leave a partial line behind; nothing more can
        // be appended safely after it.
        if let Err(e) = writer.append(&build(seq), self.fsync) {
            return Err(writer.halt(format!("append of record {} failed: {}", seq, e)));
        }

        if let Err(e) = audit.append_all(events) {
            writer.revoke(seq, self.fsync)?;
            return Err(StoreError::Audit(e));
        }
        Ok(())
    }
}

impl DocumentStore for JournalStore {
    fn insert(
        &self,
        envelope: Envelope,
        events: &[AuditEvent],
        audit: &dyn AuditSink,
    ) -> StoreResult<Envelope> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.check_insert(&envelope)?;

        self.append_and_emit(
            |seq| JournalRecord::Insert {
                seq,
                envelope: envelope.clone(),
                audit_ids: events.iter().map(|e| e.id).collect(),
            },
            events,
            audit,
        )?;

        state.apply_insert(envelope.clone());
        Ok(envelope)
    }

    fn commit(&self, commit: Commit, audit: &dyn AuditSink) -> StoreResult<Envelope> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.check_commit(&commit)?;

        self.append_and_emit(
            |seq| JournalRecord::Commit {
                seq,
                expected_token: commit.expected_token,
                envelope: commit.envelope.clone(),
                version: commit.version.clone(),
                audit_ids: commit.events.iter().map(|e| e.id).collect(),
            },
            &commit.events,
            audit,
        )?;

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
