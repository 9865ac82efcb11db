//! # In-Memory Blob Store

use std::collections::HashMap;
use std::sync::RwLock;

use crate::version::checksum::{compute_checksum, parse_content_reference};

use super::backend::BlobStore;
use super::errors::{BlobError, BlobResult};

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, reference: &str, data: &[u8]) -> BlobResult<()> {
        let hex = parse_content_reference(reference)
            .ok_or_else(|| BlobError::InvalidReference(reference.to_string()))?;
        if compute_checksum(data) != hex {
            return Err(BlobError::ChecksumMismatch(reference.to_string()));
        }

        let mut blobs = self.blobs.write().map_err(|_| BlobError::Poisoned)?;
        blobs.entry(reference.to_string()).or_insert_with(|| data.to_vec());
        Ok(())
    }

    fn get(&self, reference: &str) -> BlobResult<Vec<u8>> {
        let blobs = self.blobs.read().map_err(|_| BlobError::Poisoned)?;
        blobs
            .get(reference)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(reference.to_string()))
    }

    fn exists(&self, reference: &str) -> BlobResult<bool> {
        let blobs = self.blobs.read().map_err(|_| BlobError::Poisoned)?;
        Ok(blobs.contains_key(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::checksum::content_reference;

    #[test]
    fn test_put_get() {
        let store = MemoryBlobStore::new();
        let reference = content_reference(&compute_checksum(b"contract"));

        store.put(&reference, b"contract").unwrap();
        store.put(&reference, b"contract").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&reference).unwrap(), b"contract");
    }

    #[test]
    fn test_put_rejects_wrong_content() {
        let store = MemoryBlobStore::new();
        let reference = content_reference(&compute_checksum(b"a"));

        assert_eq!(
            store.put(&reference, b"b"),
            Err(BlobError::ChecksumMismatch(reference.clone()))
        );
        assert!(!store.exists(&reference).unwrap());
    }
}
