//! Audit event vocabulary.
//!
//! Every state-changing operation produces exactly one event per logical
//! action. Events carry the action, the target, the acting actor, an
//! action-specific metadata object and a set of tags.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{ActorRef, DocumentId, Timestamp, VersionId};

/// Named actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DocumentCreated,
    DocumentUpdated,
    DocumentStatusChanged,
    DocumentDeleted,
    DocumentRestored,
    DocumentMoved,
    DocumentLocked,
    DocumentUnlocked,
    VersionCreated,
    VersionDownloaded,
    VersionViewed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::DocumentCreated => "document_created",
            AuditAction::DocumentUpdated => "document_updated",
            AuditAction::DocumentStatusChanged => "document_status_changed",
            AuditAction::DocumentDeleted => "document_deleted",
            AuditAction::DocumentRestored => "document_restored",
            AuditAction::DocumentMoved => "document_moved",
            AuditAction::DocumentLocked => "document_locked",
            AuditAction::DocumentUnlocked => "document_unlocked",
            AuditAction::VersionCreated => "version_created",
            AuditAction::VersionDownloaded => "version_downloaded",
            AuditAction::VersionViewed => "version_viewed",
        }
    }

    /// Event category this action is filed under.
    pub fn event_type(&self) -> AuditEventType {
        match self {
            AuditAction::DocumentStatusChanged => AuditEventType::StatusChange,
            AuditAction::DocumentLocked | AuditAction::DocumentUnlocked => {
                AuditEventType::LockChange
            }
            AuditAction::VersionDownloaded | AuditAction::VersionViewed => AuditEventType::Access,
            _ => AuditEventType::DataChange,
        }
    }

    fn default_tags(&self) -> &'static [&'static str] {
        match self {
            AuditAction::DocumentCreated => &["document", "create"],
            AuditAction::DocumentUpdated => &["document", "update"],
            AuditAction::DocumentStatusChanged => &["document", "status"],
            AuditAction::DocumentDeleted => &["document", "delete", "soft_delete"],
            AuditAction::DocumentRestored => &["document", "restore"],
            AuditAction::DocumentMoved => &["document", "move"],
            AuditAction::DocumentLocked => &["document", "lock"],
            AuditAction::DocumentUnlocked => &["document", "lock"],
            AuditAction::VersionCreated => &["version", "create"],
            AuditAction::VersionDownloaded => &["version", "access", "download"],
            AuditAction::VersionViewed => &["version", "access", "view"],
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    DataChange,
    StatusChange,
    LockChange,
    Access,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::DataChange => "data_change",
            AuditEventType::StatusChange => "status_change",
            AuditEventType::LockChange => "lock_change",
            AuditEventType::Access => "access",
        }
    }
}

/// What an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AuditTarget {
    Document(DocumentId),
    Version(VersionId),
}

impl AuditTarget {
    pub fn type_name(&self) -> &'static str {
        match self {
            AuditTarget::Document(_) => "document",
            AuditTarget::Version(_) => "version",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            AuditTarget::Document(id) => id.as_uuid(),
            AuditTarget::Version(id) => id.as_uuid(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: Timestamp,
    pub event_type: AuditEventType,
    pub action: AuditAction,
    pub target: AuditTarget,
    pub actor: ActorRef,
    pub metadata: Value,
    pub tags: Vec<String>,
}

impl AuditEvent {
    /// Creates an event with the action's category and default tags.
    pub fn new(action: AuditAction, target: AuditTarget, actor: &ActorRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: action.event_type(),
            action,
            target,
            actor: actor.clone(),
            metadata: Value::Object(Default::default()),
            tags: action.default_tags().iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Replaces the metadata object.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a tag unless it is already present.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_defaults_follow_action() {
        let doc = DocumentId::new();
        let event = AuditEvent::new(
            AuditAction::DocumentLocked,
            AuditTarget::Document(doc),
            &ActorRef::new("alice"),
        );

        assert_eq!(event.event_type, AuditEventType::LockChange);
        assert_eq!(event.target.id(), doc.as_uuid());
        assert_eq!(event.target.type_name(), "document");
        assert!(event.tags.contains(&"lock".to_string()));
        assert_eq!(event.metadata, json!({}));
    }

    #[test]
    fn test_with_tag_deduplicates() {
        let event = AuditEvent::new(
            AuditAction::VersionViewed,
            AuditTarget::Version(VersionId::new()),
            &ActorRef::new("alice"),
        )
        .with_tag("access")
        .with_tag("compliance");

        assert_eq!(event.tags.iter().filter(|t| *t == "access").count(), 1);
        assert!(event.tags.contains(&"compliance".to_string()));
    }

    #[test]
    fn test_action_serializes_snake_case() {
        for action in [
            AuditAction::DocumentStatusChanged,
            AuditAction::VersionCreated,
            AuditAction::VersionDownloaded,
        ] {
            assert_eq!(
                serde_json::to_value(action).unwrap(),
                json!(action.as_str())
            );
        }
    }

    #[test]
    fn test_target_serialization_shape() {
        let id = VersionId::new();
        let value = serde_json::to_value(AuditTarget::Version(id)).unwrap();
        assert_eq!(value, json!({ "type": "version", "id": id.to_string() }));
    }
}
