//! Content checksum engine
//!
//! Every Version Chain Entry is addressed by the SHA-256 digest of its
//! content bytes, rendered as 64 lowercase hex characters.
//!
//! The function is pure: identical bytes always yield identical checksums.

use sha2::{Digest, Sha256};

/// Prefix used when a checksum is turned into a content reference.
pub const CONTENT_REF_PREFIX: &str = "sha256:";

/// Computes the SHA-256 hex digest of the given bytes.
pub fn compute_checksum(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Formats a checksum as a content reference (`sha256:<hex>`).
pub fn content_reference(checksum: &str) -> String {
    format!("{}{}", CONTENT_REF_PREFIX, checksum)
}

/// Extracts the hex digest from a content reference.
///
/// Returns `None` if the reference does not carry the expected prefix or the
/// digest is not 64 lowercase hex characters.
pub fn parse_content_reference(reference: &str) -> Option<&str> {
    let hex = reference.strip_prefix(CONTENT_REF_PREFIX)?;
    if is_valid_checksum(hex) {
        Some(hex)
    } else {
        None
    }
}

/// Returns true if `s` looks like a checksum produced by [`compute_checksum`].
pub fn is_valid_checksum(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_known_digest() {
        assert_eq!(
            compute_checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_checksum_deterministic() {
        let data = b"quarterly report";
        assert_eq!(compute_checksum(data), compute_checksum(data));
        assert_eq!(compute_checksum(data).len(), 64);
    }

    #[test]
    fn test_checksum_differs_for_different_bytes() {
        assert_ne!(compute_checksum(b"v1"), compute_checksum(b"v2"));
        assert_ne!(compute_checksum(b"a"), compute_checksum(b"a\0"));
    }

    #[test]
    fn test_content_reference_format() {
        let checksum = compute_checksum(b"hello");
        let reference = content_reference(&checksum);
        assert!(reference.starts_with("sha256:"));
        assert_eq!(parse_content_reference(&reference), Some(checksum.as_str()));
    }

    #[test]
    fn test_parse_rejects_malformed_reference() {
        assert_eq!(parse_content_reference("md5:abcd"), None);
        assert_eq!(parse_content_reference("sha256:XYZ"), None);
        assert_eq!(parse_content_reference(&format!("sha256:{}", "A".repeat(64))), None);
    }
}
