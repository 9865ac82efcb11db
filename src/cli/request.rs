//! `exec` request format
//!
//! ```json
//! {"op": "create_version", "actor": "alice", "document_id": "...",
//!  "expected_token": 3, "file_name": "v2.pdf",
//!  "content_type": "application/pdf", "content": "<base64>"}
//! ```
//!
//! Mutating ops require `actor` and `expected_token`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::document::{MetadataChanges, NewDocument, NewVersion};
use crate::store::DocumentQuery;
use crate::types::{ActorRef, DocumentId, FolderRef, VersionId};

use super::errors::{CliError, CliResult};

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub actor: Option<ActorRef>,
    #[serde(flatten)]
    pub op: Operation,
}

impl Request {
    pub fn parse(line: &str) -> CliResult<Self> {
        serde_json::from_str(line).map_err(|e| CliError::InvalidRequest(e.to_string()))
    }
}

/// Mutating and access-logging ops must name who performs them.
pub fn require_actor<'a>(actor: Option<&'a ActorRef>, op: &str) -> CliResult<&'a ActorRef> {
    match actor {
        Some(actor) if !actor.as_str().trim().is_empty() => Ok(actor),
        _ => Err(CliError::InvalidRequest(format!("'{}' requires an actor", op))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Create {
        document: NewDocument,
    },
    Get {
        document_id: DocumentId,
        #[serde(default)]
        include_deleted: bool,
    },
    List {
        #[serde(default)]
        query: DocumentQuery,
    },
    UpdateMetadata {
        document_id: DocumentId,
        expected_token: u64,
        changes: MetadataChanges,
    },
    CreateVersion {
        document_id: DocumentId,
        expected_token: u64,
        file_name: String,
        content_type: String,
        /// Base64 (standard alphabet, padded).
        content: String,
        #[serde(default)]
        change_summary: Option<String>,
    },
    Lock {
        document_id: DocumentId,
        expected_token: u64,
    },
    Unlock {
        document_id: DocumentId,
        expected_token: u64,
    },
    SoftDelete {
        document_id: DocumentId,
        expected_token: u64,
    },
    Restore {
        document_id: DocumentId,
        expected_token: u64,
    },
    Move {
        document_id: DocumentId,
        expected_token: u64,
        folder: FolderRef,
    },
    History {
        document_id: DocumentId,
    },
    LogDownload {
        version_id: VersionId,
    },
    LogView {
        version_id: VersionId,
    },
    Usage {
        version_id: VersionId,
    },
    HardDelete {
        document_id: DocumentId,
    },
    UpdateVersion {
        version_id: VersionId,
        #[serde(default)]
        fields: Map<String, Value>,
    },
    DeleteVersion {
        version_id: VersionId,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Get { .. } => "get",
            Operation::List { .. } => "list",
            Operation::UpdateMetadata { .. } => "update_metadata",
            Operation::CreateVersion { .. } => "create_version",
            Operation::Lock { .. } => "lock",
            Operation::Unlock { .. } => "unlock",
            Operation::SoftDelete { .. } => "soft_delete",
            Operation::Restore { .. } => "restore",
            Operation::Move { .. } => "move",
            Operation::History { .. } => "history",
            Operation::LogDownload { .. } => "log_download",
            Operation::LogView { .. } => "log_view",
            Operation::Usage { .. } => "usage",
            Operation::HardDelete { .. } => "hard_delete",
            Operation::UpdateVersion { .. } => "update_version",
            Operation::DeleteVersion { .. } => "delete_version",
        }
    }
}

/// Decodes the base64 payload of a `create_version` request.
pub fn decode_version(
    file_name: String,
    content_type: String,
    content: &str,
    change_summary: Option<String>,
) -> CliResult<NewVersion> {
    let content = STANDARD
        .decode(content.trim())
        .map_err(|e| CliError::InvalidRequest(format!("content is not valid base64: {}", e)))?;
    Ok(NewVersion {
        file_name,
        content_type,
        content,
        change_summary,
    })
}
