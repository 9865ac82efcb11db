//! # Blob Store Trait

use super::errors::BlobResult;

/// Content-addressed byte storage for version content.
///
/// References are `sha256:<hex>` strings produced from the content checksum,
/// so writing the same bytes twice is a no-op and blobs are never overwritten
/// with different content. There is no delete: committed versions may point
/// at any stored blob.
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Stores `data` under `reference`. Idempotent.
    fn put(&self, reference: &str, data: &[u8]) -> BlobResult<()>;

    /// Reads the bytes for `reference`, verifying them against it.
    fn get(&self, reference: &str) -> BlobResult<Vec<u8>>;

    fn exists(&self, reference: &str) -> BlobResult<bool>;
}
