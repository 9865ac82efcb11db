//! # Blob Store
//!
//! Interface to the external byte store holding version content. Only the
//! interface and two small implementations live here; the document service
//! depends on nothing but [`BlobStore`].

mod backend;
mod errors;
mod local;
mod memory;

pub use backend::BlobStore;
pub use errors::{BlobError, BlobResult};
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
