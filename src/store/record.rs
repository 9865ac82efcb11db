//! Journal record framing.
//!
//! One record per line:
//!
//! ```text
//! <crc32 of json, 8 lowercase hex> <space> <json record> \n
//! ```
//!
//! The checksum covers exactly the JSON bytes. Any mismatch, any malformed
//! line, or a final line without its newline is corruption.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Envelope;
use crate::version::VersionEntry;

use super::errors::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalRecord {
    Insert {
        seq: u64,
        envelope: Envelope,
        /// Ids of the audit events emitted with this record.
        #[serde(default)]
        audit_ids: Vec<Uuid>,
    },
    Commit {
        seq: u64,
        expected_token: u64,
        envelope: Envelope,
        #[serde(default)]
        version: Option<VersionEntry>,
        #[serde(default)]
        audit_ids: Vec<Uuid>,
    },
    /// Withdraws an earlier commit whose audit emission failed.
    Revoke {
        seq: u64,
        revokes: u64,
    },
}

impl JournalRecord {
    pub fn seq(&self) -> u64 {
        match self {
            JournalRecord::Insert { seq, .. }
            | JournalRecord::Commit { seq, .. }
            | JournalRecord::Revoke { seq, .. } => *seq,
        }
    }

    /// Audit events that must exist for this record to count as committed.
    pub fn audit_ids(&self) -> &[Uuid] {
        match self {
            JournalRecord::Insert { audit_ids, .. } | JournalRecord::Commit { audit_ids, .. } => {
                audit_ids
            }
            JournalRecord::Revoke { .. } => &[],
        }
    }
}

pub fn compute_crc(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Encodes a record as one framed line, including the trailing newline.
pub fn encode(record: &JournalRecord) -> StoreResult<Vec<u8>> {
    let json = serde_json::to_vec(record).map_err(|e| StoreError::Io(e.to_string()))?;
    let mut line = format!("{:08x} ", compute_crc(&json)).into_bytes();
    line.extend_from_slice(&json);
    line.push(b'\n');
    Ok(line)
}

/// Decodes one line (without its newline). `line_no` is 1-based.
pub fn decode(line: &str, line_no: usize) -> StoreResult<JournalRecord> {
    let corrupt = |reason: String| StoreError::Corruption {
        line: line_no,
        reason,
    };

    let (crc_hex, json) = line
        .split_once(' ')
        .ok_or_else(|| corrupt("missing checksum separator".to_string()))?;
    if crc_hex.len() != 8 {
        return Err(corrupt(format!("malformed checksum '{}'", crc_hex)));
    }
    let stored = u32::from_str_radix(crc_hex, 16)
        .map_err(|_| corrupt(format!("malformed checksum '{}'", crc_hex)))?;
    let actual = compute_crc(json.as_bytes());
    if stored != actual {
        return Err(corrupt(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored, actual
        )));
    }

    serde_json::from_str(json).map_err(|e| corrupt(format!("undecodable record: {}", e)))
}

/// Splits journal text into framed lines, rejecting a torn tail.
pub fn split_lines(content: &str) -> StoreResult<Vec<&str>> {
    if content.is_empty() {
        return Ok(Vec::new());
    }
    if !content.ends_with('\n') {
        let line = content.lines().count();
        return Err(StoreError::Corruption {
            line,
            reason: "torn final record".to_string(),
        });
    }
    Ok(content.lines().collect())
}
