//! # Local Filesystem Blob Store

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::version::checksum::{compute_checksum, parse_content_reference};

use super::backend::BlobStore;
use super::errors::{BlobError, BlobResult};

/// Stores each blob at `<root>/<first two hex chars>/<hex>`.
#[derive(Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn full_path(&self, reference: &str) -> BlobResult<PathBuf> {
        let hex = parse_content_reference(reference)
            .ok_or_else(|| BlobError::InvalidReference(reference.to_string()))?;
        Ok(self.root.join(&hex[..2]).join(hex))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, reference: &str, data: &[u8]) -> BlobResult<()> {
        let full_path = self.full_path(reference)?;
        if full_path.exists() {
            return Ok(());
        }
        if parse_content_reference(reference) != Some(compute_checksum(data).as_str()) {
            return Err(BlobError::ChecksumMismatch(reference.to_string()));
        }

        let parent = full_path
            .parent()
            .ok_or_else(|| BlobError::InvalidReference(reference.to_string()))?;
        fs::create_dir_all(parent)?;

        // Write to a private temp name, then rename into place.
        let tmp = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        write_atomically(&tmp, &full_path, data)?;
        Ok(())
    }

    fn get(&self, reference: &str) -> BlobResult<Vec<u8>> {
        let full_path = self.full_path(reference)?;
        let data = fs::read(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(reference.to_string())
            } else {
                BlobError::Io(e.to_string())
            }
        })?;

        if parse_content_reference(reference) != Some(compute_checksum(&data).as_str()) {
            return Err(BlobError::ChecksumMismatch(reference.to_string()));
        }
        Ok(data)
    }

    fn exists(&self, reference: &str) -> BlobResult<bool> {
        Ok(self.full_path(reference)?.exists())
    }
}

/// Writes `data` to `tmp` and renames it to `dest`. The temp file is removed
/// if any step fails.
fn write_atomically(tmp: &Path, dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let result = (|| {
        let mut file = fs::File::create(tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(tmp, dest)
    })();
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::checksum::content_reference;
    use tempfile::TempDir;

    #[test]
    fn test_write_read() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path().to_path_buf());
        let reference = content_reference(&compute_checksum(b"hello"));

        store.put(&reference, b"hello").unwrap();
        assert!(store.exists(&reference).unwrap());
        assert_eq!(store.get(&reference).unwrap(), b"hello");
    }

    #[test]
    fn test_missing_blob() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path().to_path_buf());
        let reference = content_reference(&compute_checksum(b"never written"));

        assert_eq!(store.get(&reference), Err(BlobError::NotFound(reference.clone())));
    }

    #[test]
    fn test_tampered_blob_fails_verification() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path().to_path_buf());
        let reference = content_reference(&compute_checksum(b"original"));

        store.put(&reference, b"original").unwrap();
        fs::write(store.full_path(&reference).unwrap(), b"tampered").unwrap();

        assert_eq!(
            store.get(&reference),
            Err(BlobError::ChecksumMismatch(reference.clone()))
        );
    }

    #[test]
    fn test_rejects_invalid_reference() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path().to_path_buf());

        assert!(matches!(
            store.put("../../etc/passwd", b"x"),
            Err(BlobError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        let tmp = temp.path().join(".tmp-1");
        // Renaming a file over a non-empty directory fails after the
        // temp file is fully written.
        let dest = temp.path().join("occupied");
        fs::create_dir_all(dest.join("inner")).unwrap();

        assert!(write_atomically(&tmp, &dest, b"payload").is_err());
        assert!(!tmp.exists());
        assert!(dest.join("inner").exists());
    }
}
