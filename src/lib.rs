//! docvault - append-only document version store
//!
//! Documents carry a mutable envelope (metadata, status, edit lock,
//! concurrency token) and an immutable, checksum-addressed version chain.
//! Every mutation is a single compare-and-swap commit on the envelope's
//! token, and every committed mutation is audited in the same step.
//!
//! Physical deletion does not exist: documents are soft-deleted and
//! committed versions can never be changed or removed.

pub mod audit;
pub mod blob;
pub mod cli;
pub mod config;
pub mod document;
pub mod observability;
pub mod store;
pub mod types;
pub mod version;
