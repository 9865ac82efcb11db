//! Document Envelope
//!
//! The mutable top-level record of a document. It owns the concurrency token,
//! the edit lock and the pointer to the head of the version chain.
//!
//! Fields are crate-private: outside code reads through accessors and changes
//! an envelope only through `DocumentService`, which commits every change via
//! compare-and-swap on `concurrency_token`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{ActorRef, DocumentId, FolderRef, OrganizationId, Timestamp, VersionId};

use super::lock::EditLock;
use super::status::DocumentStatus;

/// Soft-delete marker. Presence means the document is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDelete {
    pub deleted_at: Timestamp,
    pub deleted_by: ActorRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub(crate) id: DocumentId,
    pub(crate) organization_id: OrganizationId,
    pub(crate) folder: Option<FolderRef>,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) document_type: String,
    pub(crate) tags: Vec<String>,
    pub(crate) status: DocumentStatus,
    pub(crate) version_count: u64,
    pub(crate) current_version_ref: Option<VersionId>,
    pub(crate) concurrency_token: u64,
    pub(crate) lock: Option<EditLock>,
    pub(crate) deleted: Option<SoftDelete>,
    pub(crate) created_at: Timestamp,
    pub(crate) created_by: ActorRef,
    pub(crate) updated_at: Timestamp,
}

/// Initial metadata for a new document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub folder: Option<FolderRef>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Envelope {
    /// Builds a fresh draft envelope: token 0, no versions, unlocked.
    pub(crate) fn create(new: NewDocument, tags: Vec<String>, actor: &ActorRef) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            organization_id: new.organization_id,
            folder: new.folder,
            title: new.title.trim().to_string(),
            description: new.description,
            document_type: new.document_type,
            tags,
            status: DocumentStatus::Draft,
            version_count: 0,
            current_version_ref: None,
            concurrency_token: 0,
            lock: None,
            deleted: None,
            created_at: now,
            created_by: actor.clone(),
            updated_at: now,
        }
    }

    /// Copy of `self` with the token advanced by one, ready to be mutated and
    /// committed against `self.concurrency_token`.
    pub(crate) fn next_revision(&self) -> Self {
        let mut next = self.clone();
        next.concurrency_token = self.concurrency_token + 1;
        next.updated_at = Utc::now();
        next
    }

    #[inline]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    #[inline]
    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    #[inline]
    pub fn folder(&self) -> Option<&FolderRef> {
        self.folder.as_ref()
    }

    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    #[inline]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[inline]
    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    /// Number of committed versions; equals the chain length.
    #[inline]
    pub fn version_count(&self) -> u64 {
        self.version_count
    }

    /// Head of the version chain, `None` until the first version.
    #[inline]
    pub fn current_version_ref(&self) -> Option<VersionId> {
        self.current_version_ref
    }

    /// The token a caller must present to commit the next mutation.
    #[inline]
    pub fn concurrency_token(&self) -> u64 {
        self.concurrency_token
    }

    #[inline]
    pub fn lock(&self) -> Option<&EditLock> {
        self.lock.as_ref()
    }

    pub fn lock_holder(&self) -> Option<&ActorRef> {
        self.lock.as_ref().map(EditLock::holder)
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn is_locked_by(&self, actor: &ActorRef) -> bool {
        self.lock.as_ref().map(|l| l.is_held_by(actor)).unwrap_or(false)
    }

    #[inline]
    pub fn deleted(&self) -> Option<&SoftDelete> {
        self.deleted.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    #[inline]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    #[inline]
    pub fn created_by(&self) -> &ActorRef {
        &self.created_by
    }

    #[inline]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

#[cfg(test)]
pub(crate) fn test_envelope() -> Envelope {
    Envelope::create(
        NewDocument {
            organization_id: OrganizationId::new(),
            title: "Employee Handbook".to_string(),
            ..NewDocument::default()
        },
        Vec::new(),
        &ActorRef::new("author"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_starts_as_empty_draft() {
        let env = test_envelope();

        assert_eq!(env.status(), DocumentStatus::Draft);
        assert_eq!(env.concurrency_token(), 0);
        assert_eq!(env.version_count(), 0);
        assert!(env.current_version_ref().is_none());
        assert!(!env.is_locked());
        assert!(!env.is_deleted());
        assert_eq!(env.created_by().as_str(), "author");
    }

    #[test]
    fn test_create_trims_title() {
        let env = Envelope::create(
            NewDocument {
                title: "  Policy  ".to_string(),
                ..NewDocument::default()
            },
            Vec::new(),
            &ActorRef::new("a"),
        );
        assert_eq!(env.title(), "Policy");
    }

    #[test]
    fn test_next_revision_advances_token_by_one() {
        let env = test_envelope();
        let next = env.next_revision();

        assert_eq!(next.concurrency_token(), env.concurrency_token() + 1);
        assert_eq!(next.id(), env.id());
        assert_eq!(next.title(), env.title());
    }

    #[test]
    fn test_is_locked_by() {
        let mut env = test_envelope();
        let alice = ActorRef::new("alice");
        assert!(!env.is_locked_by(&alice));

        env.lock = Some(EditLock::acquire(alice.clone()));
        assert!(env.is_locked_by(&alice));
        assert!(!env.is_locked_by(&ActorRef::new("bob")));
        assert_eq!(env.lock_holder(), Some(&alice));
    }
}
