//! Version Chain
//!
//! Append-only, checksum-addressed content history:
//! - `checksum` - SHA-256 content digests and content references
//! - `VersionEntry` - One immutable snapshot, never altered after commit
//! - `VersionChain` - Ordered history of one document plus derived reads
//!
//! Sequence numbers are allocated by the document service inside the same
//! compare-and-swap commit that advances the document's concurrency token.

pub mod checksum;
mod chain;
mod entry;

pub use chain::VersionChain;
pub use checksum::compute_checksum;
pub use entry::VersionEntry;
pub(crate) use entry::VersionDraft;

#[cfg(test)]
pub(crate) use entry::test_entry;
