//! VersionChain - Ordered version history of one document
//!
//! A chain is a read-only snapshot loaded from the store. Entries are held in
//! sequence order (oldest first) and sequence numbers are `1..=len` with no
//! gaps, so positional lookups are direct index arithmetic.
//!
//! The chain never mutates entries and exposes no way to do so.

use crate::types::{DocumentId, VersionId};

use super::VersionEntry;

/// The committed version history of a single document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionChain {
    document_id: DocumentId,
    entries: Vec<VersionEntry>,
}

impl VersionChain {
    /// Creates an empty chain for the given document.
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            entries: Vec::new(),
        }
    }

    /// Wraps entries that are already in sequence order.
    ///
    /// Stores only hand over chains they have validated, so this does not
    /// re-check contiguity.
    pub fn with_entries(document_id: DocumentId, entries: Vec<VersionEntry>) -> Self {
        Self {
            document_id,
            entries,
        }
    }

    #[inline]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest to newest.
    #[inline]
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    /// Iterates oldest to newest. Can be called any number of times.
    pub fn iter(&self) -> std::slice::Iter<'_, VersionEntry> {
        self.entries.iter()
    }

    /// Entry with the given 1-based sequence number.
    pub fn get(&self, sequence_number: u64) -> Option<&VersionEntry> {
        let index = sequence_number.checked_sub(1)?;
        self.entries.get(usize::try_from(index).ok()?)
    }

    /// Entry with the given identity.
    pub fn find(&self, id: VersionId) -> Option<&VersionEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// The entry with the highest sequence number.
    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.last()
    }

    pub fn is_latest(&self, entry: &VersionEntry) -> bool {
        self.latest().map(|l| l.id() == entry.id()).unwrap_or(false)
    }

    /// The entry one sequence number before `entry`, or `None` at the start.
    pub fn previous(&self, entry: &VersionEntry) -> Option<&VersionEntry> {
        self.get(entry.sequence_number().checked_sub(1)?)
    }

    /// The entry one sequence number after `entry`, or `None` at the end.
    pub fn next(&self, entry: &VersionEntry) -> Option<&VersionEntry> {
        self.get(entry.sequence_number() + 1)
    }

    /// True unless `entry` has the same checksum as its predecessor.
    ///
    /// The first entry always counts as changed.
    pub fn content_changed_from_previous(&self, entry: &VersionEntry) -> bool {
        match self.previous(entry) {
            Some(prev) => !prev.same_content_as(entry),
            None => true,
        }
    }
}

impl<'a> IntoIterator for &'a VersionChain {
    type Item = &'a VersionEntry;
    type IntoIter = std::slice::Iter<'a, VersionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
