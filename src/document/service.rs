//! DocumentService - every operation on documents and their versions
//!
//! Mutating operations take the caller's `&mut Envelope`. Its
//! `concurrency_token` is the expected token for the compare-and-swap
//! commit; on success the caller's copy is replaced by the committed
//! envelope, so sequential calls by the same caller need no reload. On
//! `ConcurrencyConflict` the copy is left as it was and must be reloaded.
//!
//! Outcomes that write nothing (a no-op update, a move into the current
//! folder, lock re-entry or denial) are still checked against the stored
//! token, so a stale copy gets `ConcurrencyConflict` instead of an answer
//! derived from outdated state.
//!
//! Every committed mutation hands its audit events to the store, which
//! emits them inside the same atomic step as the write. Rejected
//! operations (validation, lock denial, conflict, policy) emit nothing.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::audit::{AuditAction, AuditEvent, AuditSink, AuditTarget};
use crate::blob::BlobStore;
use crate::store::{Commit, DocumentQuery, DocumentStore};
use crate::types::{ActorRef, DocumentId, FolderRef, VersionId};
use crate::version::{self, VersionChain, VersionDraft, VersionEntry};

use super::diff::{normalize_tags, MetadataChanges, MetadataDiff};
use super::envelope::{Envelope, NewDocument, SoftDelete};
use super::errors::{DocumentError, DocumentResult};
use super::lock::{blocking_holder, decide_lock, decide_unlock, EditLock, LockDecision, UnlockDecision};

/// 256 MiB
pub const DEFAULT_MAX_CONTENT_BYTES: u64 = 256 * 1024 * 1024;

/// Content and descriptors for a new version.
#[derive(Clone, Debug, Default)]
pub struct NewVersion {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub change_summary: Option<String>,
}

pub struct DocumentService<S, B> {
    store: S,
    blobs: B,
    audit: Arc<dyn AuditSink>,
    max_content_bytes: u64,
}

impl<S: DocumentStore, B: BlobStore> DocumentService<S, B> {
    pub fn new(store: S, blobs: B, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            blobs,
            audit,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }

    pub fn with_max_content_bytes(mut self, limit: u64) -> Self {
        self.max_content_bytes = limit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    // ========== Envelope lifecycle ==========

    /// Creates a draft document at token 0 and emits `document_created`.
    pub fn create(&self, actor: &ActorRef, new: NewDocument) -> DocumentResult<Envelope> {
        if new.title.trim().is_empty() {
            return Err(DocumentError::BlankField("title"));
        }

        let tags = normalize_tags(&new.tags);
        let envelope = Envelope::create(new, tags, actor);
        let event = AuditEvent::new(
            AuditAction::DocumentCreated,
            AuditTarget::Document(envelope.id()),
            actor,
        )
        .with_metadata(json!({
            "title": envelope.title(),
            "organization_id": envelope.organization_id(),
            "folder_path": envelope.folder().map(|f| f.path.clone()),
            "document_type": envelope.document_type(),
        }));

        let stored = self.store.insert(envelope, &[event], self.audit.as_ref())?;
        info!(document_id = %stored.id(), actor = %actor, "document created");
        Ok(stored)
    }

    /// Loads an envelope. Soft-deleted documents are `NotFound` unless
    /// `include_deleted` is set.
    pub fn load(&self, id: DocumentId, include_deleted: bool) -> DocumentResult<Envelope> {
        self.store
            .load(id, include_deleted)?
            .ok_or(DocumentError::NotFound(id))
    }

    pub fn list(&self, query: &DocumentQuery) -> DocumentResult<Vec<Envelope>> {
        Ok(self.store.list(query)?)
    }

    /// Applies the fields of `changes` that differ from `doc`.
    ///
    /// Returns the diff that was committed. An empty diff commits nothing,
    /// emits nothing and leaves the token where it was, provided `doc` is
    /// still current.
    pub fn update_metadata(
        &self,
        doc: &mut Envelope,
        actor: &ActorRef,
        mut changes: MetadataChanges,
    ) -> DocumentResult<MetadataDiff> {
        if let Some(title) = &changes.title {
            if title.trim().is_empty() {
                return Err(DocumentError::BlankField("title"));
            }
        }
        if let Some(tags) = changes.tags.take() {
            changes.tags = Some(normalize_tags(&tags));
        }

        let diff = MetadataDiff::compute(doc, &changes);
        if let Some((from, to)) = diff.status_change() {
            if !from.can_transition_to(to) {
                return Err(DocumentError::InvalidStatusTransition { from, to });
            }
        }
        if diff.is_empty() {
            self.ensure_current(doc)?;
            debug!(document_id = %doc.id(), "metadata update is a no-op");
            return Ok(diff);
        }

        let mut next = doc.next_revision();
        diff.apply_to(&mut next, &changes);

        let target = AuditTarget::Document(doc.id());
        let mut events = vec![AuditEvent::new(AuditAction::DocumentUpdated, target, actor)
            .with_metadata(json!({
                "changed_fields": diff.changed_fields(),
                "changes": diff.to_json(),
            }))];
        if let Some((from, to)) = diff.status_change() {
            events.push(
                AuditEvent::new(AuditAction::DocumentStatusChanged, target, actor).with_metadata(
                    json!({ "old_status": from.as_str(), "new_status": to.as_str() }),
                ),
            );
        }

        self.commit(doc, next, None, events, AuditAction::DocumentUpdated)?;
        Ok(diff)
    }

    /// Marks the document deleted. The record stays readable through
    /// `include_deleted`.
    pub fn soft_delete(&self, doc: &mut Envelope, actor: &ActorRef) -> DocumentResult<()> {
        if doc.is_deleted() {
            self.ensure_current(doc)?;
            return Err(DocumentError::AlreadyDeleted(doc.id()));
        }

        let mut next = doc.next_revision();
        next.deleted = Some(SoftDelete {
            deleted_at: Utc::now(),
            deleted_by: actor.clone(),
        });
        let event = AuditEvent::new(
            AuditAction::DocumentDeleted,
            AuditTarget::Document(doc.id()),
            actor,
        )
        .with_metadata(json!({ "soft_delete": true, "title": doc.title() }));

        self.commit(doc, next, None, vec![event], AuditAction::DocumentDeleted)
    }

    pub fn restore(&self, doc: &mut Envelope, actor: &ActorRef) -> DocumentResult<()> {
        let Some(deleted) = doc.deleted() else {
            self.ensure_current(doc)?;
            return Err(DocumentError::NotDeleted(doc.id()));
        };

        let event = AuditEvent::new(
            AuditAction::DocumentRestored,
            AuditTarget::Document(doc.id()),
            actor,
        )
        .with_metadata(json!({
            "deleted_at": deleted.deleted_at,
            "deleted_by": deleted.deleted_by,
        }));
        let mut next = doc.next_revision();
        next.deleted = None;

        self.commit(doc, next, None, vec![event], AuditAction::DocumentRestored)
    }

    /// Moves the document into `folder`. Moving a current copy into the
    /// folder it is already in writes nothing.
    pub fn move_to(&self, doc: &mut Envelope, actor: &ActorRef, folder: FolderRef) -> DocumentResult<()> {
        if doc.folder().map(|f| f.id) == Some(folder.id) {
            return self.ensure_current(doc);
        }

        let event = AuditEvent::new(
            AuditAction::DocumentMoved,
            AuditTarget::Document(doc.id()),
            actor,
        )
        .with_metadata(json!({
            "old_folder_id": doc.folder().map(|f| f.id),
            "old_path": doc.folder().map(|f| f.path.clone()),
            "new_folder_id": folder.id,
            "new_path": folder.path,
        }));
        let mut next = doc.next_revision();
        next.folder = Some(folder);

        self.commit(doc, next, None, vec![event], AuditAction::DocumentMoved)
    }

    /// Always fails. Documents are only ever soft-deleted.
    pub fn hard_delete(&self, actor: &ActorRef, id: DocumentId) -> DocumentResult<()> {
        warn!(document_id = %id, actor = %actor, "hard delete rejected");
        Err(DocumentError::HardDeleteNotAllowed(id))
    }

    // ========== Edit lock ==========

    /// Takes the edit lock.
    ///
    /// Returns `false` without side effects if another actor holds it. A
    /// holder asking again gets `true` and nothing is written. Both answers
    /// require `doc` to be current.
    pub fn lock(&self, doc: &mut Envelope, actor: &ActorRef) -> DocumentResult<bool> {
        match decide_lock(doc.lock(), actor) {
            LockDecision::Reentrant => {
                self.ensure_current(doc)?;
                Ok(true)
            }
            LockDecision::Denied { holder } => {
                self.ensure_current(doc)?;
                warn!(document_id = %doc.id(), actor = %actor, holder = %holder, "lock denied");
                Ok(false)
            }
            LockDecision::Acquire => {
                let mut next = doc.next_revision();
                next.lock = Some(EditLock::acquire(actor.clone()));
                let event = AuditEvent::new(
                    AuditAction::DocumentLocked,
                    AuditTarget::Document(doc.id()),
                    actor,
                );
                self.commit(doc, next, None, vec![event], AuditAction::DocumentLocked)?;
                Ok(true)
            }
        }
    }

    /// Releases the edit lock held by `actor`.
    ///
    /// Returns `false` without side effects if another actor holds it, and
    /// `NotLocked` if nobody does.
    pub fn unlock(&self, doc: &mut Envelope, actor: &ActorRef) -> DocumentResult<bool> {
        match decide_unlock(doc.lock(), actor) {
            UnlockDecision::NotLocked => {
                self.ensure_current(doc)?;
                Err(DocumentError::NotLocked(doc.id()))
            }
            UnlockDecision::Denied { holder } => {
                self.ensure_current(doc)?;
                warn!(document_id = %doc.id(), actor = %actor, holder = %holder, "unlock denied");
                Ok(false)
            }
            UnlockDecision::Release => {
                let held_since = doc.lock().map(EditLock::acquired_at);
                let mut next = doc.next_revision();
                next.lock = None;
                let event = AuditEvent::new(
                    AuditAction::DocumentUnlocked,
                    AuditTarget::Document(doc.id()),
                    actor,
                )
                .with_metadata(json!({ "locked_at": held_since }));
                self.commit(doc, next, None, vec![event], AuditAction::DocumentUnlocked)?;
                Ok(true)
            }
        }
    }

    pub fn is_locked_by(&self, doc: &Envelope, actor: &ActorRef) -> bool {
        doc.is_locked_by(actor)
    }

    // ========== Versions ==========

    /// Appends a version to the document's chain.
    ///
    /// All validation runs before anything is written. Content goes to the
    /// blob store under its checksum after a token pre-check, so losing
    /// the final compare-and-swap leaves at most an unreferenced blob.
    pub fn create_version(
        &self,
        doc: &mut Envelope,
        actor: &ActorRef,
        new: NewVersion,
    ) -> DocumentResult<VersionEntry> {
        let file_name = new.file_name.trim();
        let content_type = new.content_type.trim();
        if file_name.is_empty() {
            return Err(DocumentError::BlankField("file_name"));
        }
        if content_type.is_empty() {
            return Err(DocumentError::BlankField("content_type"));
        }
        if !is_valid_content_type(content_type) {
            return Err(DocumentError::InvalidContentType(content_type.to_string()));
        }

        if let Some(holder) = blocking_holder(doc.lock(), actor) {
            warn!(document_id = %doc.id(), actor = %actor, holder = %holder, "version rejected, document locked");
            return Err(DocumentError::DocumentLocked {
                document_id: doc.id(),
                holder: holder.clone(),
            });
        }
        if doc.is_deleted() {
            return Err(DocumentError::DocumentDeleted(doc.id()));
        }

        let size = new.content.len() as u64;
        if size == 0 {
            return Err(DocumentError::EmptyContent);
        }
        if size > self.max_content_bytes {
            return Err(DocumentError::ContentTooLarge {
                size,
                limit: self.max_content_bytes,
            });
        }

        self.ensure_current(doc)?;

        let checksum = version::compute_checksum(&new.content);
        let reference = version::checksum::content_reference(&checksum);
        self.blobs.put(&reference, &new.content)?;

        let entry = VersionEntry::seal(VersionDraft {
            document_id: doc.id(),
            sequence_number: doc.version_count() + 1,
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            content_checksum: checksum,
            content_reference: reference,
            content_length: size,
            change_summary: new.change_summary,
            created_by: actor.clone(),
        });

        let mut next = doc.next_revision();
        next.version_count = entry.sequence_number();
        next.current_version_ref = Some(entry.id());

        let event = AuditEvent::new(
            AuditAction::VersionCreated,
            AuditTarget::Version(entry.id()),
            actor,
        )
        .with_metadata(json!({
            "document_id": doc.id(),
            "file_name": entry.file_name(),
            "sequence_number": entry.sequence_number(),
            "change_summary": entry.change_summary(),
            "content_checksum": entry.content_checksum(),
        }));

        self.commit(doc, next, Some(entry.clone()), vec![event], AuditAction::VersionCreated)?;
        Ok(entry)
    }

    /// The document's chain, oldest first.
    pub fn version_history(&self, id: DocumentId) -> DocumentResult<VersionChain> {
        let entries = self.store.versions(id)?;
        Ok(VersionChain::with_entries(id, entries))
    }

    pub fn latest_version(&self, id: DocumentId) -> DocumentResult<Option<VersionEntry>> {
        Ok(self.version_history(id)?.latest().cloned())
    }

    pub fn version(&self, id: VersionId) -> DocumentResult<VersionEntry> {
        self.store.version(id)?.ok_or(DocumentError::VersionNotFound(id))
    }

    pub fn previous_version(&self, id: VersionId) -> DocumentResult<Option<VersionEntry>> {
        let (chain, entry) = self.chain_of(id)?;
        Ok(chain.previous(&entry).cloned())
    }

    pub fn next_version(&self, id: VersionId) -> DocumentResult<Option<VersionEntry>> {
        let (chain, entry) = self.chain_of(id)?;
        Ok(chain.next(&entry).cloned())
    }

    pub fn content_changed_from_previous(&self, id: VersionId) -> DocumentResult<bool> {
        let (chain, entry) = self.chain_of(id)?;
        Ok(chain.content_changed_from_previous(&entry))
    }

    /// Fetches the stored bytes of a version.
    pub fn content(&self, entry: &VersionEntry) -> DocumentResult<Vec<u8>> {
        Ok(self.blobs.get(entry.content_reference())?)
    }

    /// Records that `actor` downloaded a version. The entry is not touched.
    pub fn log_download(&self, actor: &ActorRef, id: VersionId) -> DocumentResult<()> {
        self.log_access(AuditAction::VersionDownloaded, actor, id)
    }

    /// Records that `actor` viewed a version. The entry is not touched.
    pub fn log_view(&self, actor: &ActorRef, id: VersionId) -> DocumentResult<()> {
        self.log_access(AuditAction::VersionViewed, actor, id)
    }

    /// Always fails. Committed versions cannot change.
    pub fn update_version(
        &self,
        actor: &ActorRef,
        id: VersionId,
        fields: &Map<String, Value>,
    ) -> DocumentResult<()> {
        let fields: Vec<&str> = fields.keys().map(String::as_str).collect();
        warn!(version_id = %id, actor = %actor, ?fields, "version update rejected");
        Err(DocumentError::ImmutableRecord(id))
    }

    /// Always fails. Committed versions cannot be removed.
    pub fn delete_version(&self, actor: &ActorRef, id: VersionId) -> DocumentResult<()> {
        warn!(version_id = %id, actor = %actor, "version delete rejected");
        Err(DocumentError::ImmutableRecord(id))
    }

    // ========== Internals ==========

    /// Commits `next` against the caller's token and replaces the caller's
    /// copy with the stored result.
    fn commit(
        &self,
        doc: &mut Envelope,
        next: Envelope,
        version: Option<VersionEntry>,
        events: Vec<AuditEvent>,
        action: AuditAction,
    ) -> DocumentResult<()> {
        let commit = Commit {
            expected_token: doc.concurrency_token(),
            envelope: next,
            version,
            events,
        };

        match self.store.commit(commit, self.audit.as_ref()) {
            Ok(stored) => {
                info!(
                    document_id = %stored.id(),
                    token = stored.concurrency_token(),
                    action = action.as_str(),
                    "document committed"
                );
                *doc = stored;
                Ok(())
            }
            Err(e) => {
                let err = DocumentError::from(e);
                if let DocumentError::ConcurrencyConflict { expected, actual, .. } = &err {
                    warn!(document_id = %doc.id(), expected, actual, action = action.as_str(), "concurrency conflict");
                }
                Err(err)
            }
        }
    }

    /// Fails with `ConcurrencyConflict` if the store has moved past `doc`.
    fn ensure_current(&self, doc: &Envelope) -> DocumentResult<()> {
        let stored = self
            .store
            .load(doc.id(), true)?
            .ok_or(DocumentError::NotFound(doc.id()))?;
        if stored.concurrency_token() != doc.concurrency_token() {
            warn!(
                document_id = %doc.id(),
                expected = doc.concurrency_token(),
                actual = stored.concurrency_token(),
                "concurrency conflict"
            );
            return Err(DocumentError::ConcurrencyConflict {
                document_id: doc.id(),
                expected: doc.concurrency_token(),
                actual: stored.concurrency_token(),
            });
        }
        Ok(())
    }

    fn chain_of(&self, id: VersionId) -> DocumentResult<(VersionChain, VersionEntry)> {
        let entry = self.version(id)?;
        let chain = self.version_history(entry.document_id())?;
        Ok((chain, entry))
    }

    fn log_access(&self, action: AuditAction, actor: &ActorRef, id: VersionId) -> DocumentResult<()> {
        let entry = self.version(id)?;
        let event = AuditEvent::new(action, AuditTarget::Version(id), actor).with_metadata(json!({
            "document_id": entry.document_id(),
            "sequence_number": entry.sequence_number(),
            "file_name": entry.file_name(),
        }));
        self.audit.append(&event)?;
        debug!(version_id = %id, actor = %actor, action = action.as_str(), "version access logged");
        Ok(())
    }
}

/// `type/subtype`, both parts non-empty and free of whitespace.
fn is_valid_content_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim();
    match essence.split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty()
                && !subtype.is_empty()
                && !subtype.contains('/')
                && !essence.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
