//! Documents
//!
//! - `Envelope` - the mutable document record (metadata, status, lock, token)
//! - `DocumentStatus` - lifecycle and allowed transitions
//! - `EditLock` - exclusive, holder-released edit lock
//! - `MetadataChanges` / `MetadataDiff` - typed update input and field diffs
//! - `DocumentService` - all operations, each a single compare-and-swap commit

mod diff;
mod envelope;
mod errors;
mod lock;
mod service;
mod status;

pub use diff::{normalize_tags, FieldChange, MetadataChanges, MetadataDiff, MetadataField};
pub use envelope::{Envelope, NewDocument, SoftDelete};
pub use errors::{DocumentError, DocumentResult, ErrorKind};
pub use lock::{EditLock, LockDecision, UnlockDecision};
pub use service::{DocumentService, NewVersion, DEFAULT_MAX_CONTENT_BYTES};
pub use status::DocumentStatus;

#[cfg(test)]
pub(crate) use envelope::test_envelope;
