//! VersionEntry - Immutable content snapshot
//!
//! A Version Chain Entry records one committed snapshot of a document's
//! content: its position in the chain, the checksum of its bytes, where the
//! bytes live, and who committed it when.
//!
//! All fields are private and only readable through accessors. There are no
//! setters; the only constructor is used by the document service when it
//! allocates the next sequence number under a compare-and-swap commit.
//! Deserializing re-checks what sealing guarantees, so a stored entry cannot
//! be forged into a shape `seal` would never produce.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{ActorRef, DocumentId, Timestamp, VersionId};
use crate::version::checksum::{content_reference, is_valid_checksum};

/// A single immutable version of a document's content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredEntry")]
pub struct VersionEntry {
    id: VersionId,
    document_id: DocumentId,
    /// 1-based, contiguous within a document.
    sequence_number: u64,
    file_name: String,
    content_type: String,
    content_checksum: String,
    content_reference: String,
    content_length: u64,
    change_summary: Option<String>,
    created_at: Timestamp,
    created_by: ActorRef,
}

/// Wire shape of [`VersionEntry`], checked before it becomes one.
#[derive(Deserialize)]
struct StoredEntry {
    id: VersionId,
    document_id: DocumentId,
    sequence_number: u64,
    file_name: String,
    content_type: String,
    content_checksum: String,
    content_reference: String,
    content_length: u64,
    change_summary: Option<String>,
    created_at: Timestamp,
    created_by: ActorRef,
}

impl TryFrom<StoredEntry> for VersionEntry {
    type Error = String;

    fn try_from(raw: StoredEntry) -> Result<Self, Self::Error> {
        if raw.sequence_number == 0 {
            return Err(format!("version {} has sequence number 0", raw.id));
        }
        if raw.file_name.trim().is_empty() || raw.content_type.trim().is_empty() {
            return Err(format!("version {} has a blank file name or content type", raw.id));
        }
        if raw.content_length == 0 {
            return Err(format!("version {} has no content", raw.id));
        }
        if !is_valid_checksum(&raw.content_checksum) {
            return Err(format!("version {} has malformed checksum {:?}", raw.id, raw.content_checksum));
        }
        if raw.content_reference != content_reference(&raw.content_checksum) {
            return Err(format!(
                "version {} reference {:?} does not match its checksum",
                raw.id, raw.content_reference
            ));
        }

        Ok(Self {
            id: raw.id,
            document_id: raw.document_id,
            sequence_number: raw.sequence_number,
            file_name: raw.file_name,
            content_type: raw.content_type,
            content_checksum: raw.content_checksum,
            content_reference: raw.content_reference,
            content_length: raw.content_length,
            change_summary: raw.change_summary,
            created_at: raw.created_at,
            created_by: raw.created_by,
        })
    }
}

/// Field values for a version about to be committed.
///
/// Checksum and reference are computed by the caller from the content bytes;
/// validation has already happened by the time this is built.
#[derive(Clone, Debug)]
pub(crate) struct VersionDraft {
    pub document_id: DocumentId,
    pub sequence_number: u64,
    pub file_name: String,
    pub content_type: String,
    pub content_checksum: String,
    pub content_reference: String,
    pub content_length: u64,
    pub change_summary: Option<String>,
    pub created_by: ActorRef,
}

impl VersionEntry {
    /// Seals a draft into an entry, stamping its identity and commit time.
    pub(crate) fn seal(draft: VersionDraft) -> Self {
        Self {
            id: VersionId::new(),
            document_id: draft.document_id,
            sequence_number: draft.sequence_number,
            file_name: draft.file_name,
            content_type: draft.content_type,
            content_checksum: draft.content_checksum,
            content_reference: draft.content_reference,
            content_length: draft.content_length,
            change_summary: draft.change_summary,
            created_at: Utc::now(),
            created_by: draft.created_by,
        }
    }

    #[inline]
    pub fn id(&self) -> VersionId {
        self.id
    }

    #[inline]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    #[inline]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    #[inline]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// SHA-256 hex digest of the content bytes.
    #[inline]
    pub fn content_checksum(&self) -> &str {
        &self.content_checksum
    }

    /// Opaque pointer into the blob store.
    #[inline]
    pub fn content_reference(&self) -> &str {
        &self.content_reference
    }

    #[inline]
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    #[inline]
    pub fn change_summary(&self) -> Option<&str> {
        self.change_summary.as_deref()
    }

    #[inline]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    #[inline]
    pub fn created_by(&self) -> &ActorRef {
        &self.created_by
    }

    /// True if this entry has the same content bytes as `other`.
    pub fn same_content_as(&self, other: &VersionEntry) -> bool {
        self.content_checksum == other.content_checksum
    }
}

#[cfg(test)]
pub(crate) fn test_entry(document_id: DocumentId, sequence_number: u64, content: &[u8]) -> VersionEntry {
    use crate::version::checksum::compute_checksum;

    let checksum = compute_checksum(content);
    VersionEntry::seal(VersionDraft {
        document_id,
        sequence_number,
        file_name: format!("v{}.pdf", sequence_number),
        content_type: "application/pdf".to_string(),
        content_reference: content_reference(&checksum),
        content_checksum: checksum,
        content_length: content.len() as u64,
        change_summary: None,
        created_by: ActorRef::new("tester"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_assigns_identity_and_time() {
        let doc = DocumentId::new();
        let a = test_entry(doc, 1, b"same");
        let b = test_entry(doc, 1, b"same");

        assert_ne!(a.id(), b.id());
        assert!(a.created_at() <= Utc::now());
    }

    #[test]
    fn test_accessors_expose_sealed_values() {
        let doc = DocumentId::new();
        let entry = test_entry(doc, 3, b"payload");

        assert_eq!(entry.document_id(), doc);
        assert_eq!(entry.sequence_number(), 3);
        assert_eq!(entry.file_name(), "v3.pdf");
        assert_eq!(entry.content_length(), 7);
        assert!(entry.content_reference().ends_with(entry.content_checksum()));
        assert_eq!(entry.change_summary(), None);
    }

    #[test]
    fn test_same_content_compares_checksums() {
        let doc = DocumentId::new();
        let a = test_entry(doc, 1, b"body");
        let b = test_entry(doc, 2, b"body");
        let c = test_entry(doc, 3, b"other body");

        assert!(a.same_content_as(&b));
        assert!(!b.same_content_as(&c));
    }

    #[test]
    fn test_clone_is_identical() {
        let entry = test_entry(DocumentId::new(), 1, b"x");
        assert_eq!(entry, entry.clone());
    }

    #[test]
    fn test_stored_entry_reads_back() {
        let entry = test_entry(DocumentId::new(), 2, b"stored");
        let json = serde_json::to_string(&entry).unwrap();
        let back: VersionEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_forged_entries_are_rejected() {
        let entry = test_entry(DocumentId::new(), 1, b"genuine");
        let forgeries = [
            ("sequence_number", serde_json::json!(0)),
            ("file_name", serde_json::json!("  ")),
            ("content_length", serde_json::json!(0)),
            ("content_checksum", serde_json::json!("not-a-digest")),
            (
                "content_reference",
                serde_json::json!(content_reference(&"0".repeat(64))),
            ),
        ];

        for (field, value) in forgeries {
            let mut json = serde_json::to_value(&entry).unwrap();
            json[field] = value;
            assert!(
                serde_json::from_value::<VersionEntry>(json).is_err(),
                "forged {field} was accepted"
            );
        }
    }
}
