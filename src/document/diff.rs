//! Typed metadata changes and field-level diffs.
//!
//! Callers describe what they want to set with [`MetadataChanges`]; the
//! service turns that into a [`MetadataDiff`] against the envelope, keeping
//! only fields whose value actually differs. An empty diff means the update
//! is a no-op: nothing is committed and nothing is audited.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::envelope::Envelope;
use super::status::DocumentStatus;

/// Requested metadata values. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

/// The metadata fields a diff can name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Title,
    Description,
    DocumentType,
    Tags,
    Status,
}

impl MetadataField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Title => "title",
            MetadataField::Description => "description",
            MetadataField::DocumentType => "document_type",
            MetadataField::Tags => "tags",
            MetadataField::Status => "status",
        }
    }
}

/// One changed field with its value before and after.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldChange {
    pub field: MetadataField,
    pub before: Value,
    pub after: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataDiff {
    changes: Vec<FieldChange>,
    status: Option<(DocumentStatus, DocumentStatus)>,
}

impl MetadataDiff {
    /// Compares requested values against `current`.
    ///
    /// `changes.tags` must already be normalized.
    pub fn compute(current: &Envelope, changes: &MetadataChanges) -> Self {
        let mut diff = MetadataDiff::default();

        if let Some(title) = &changes.title {
            let title = title.trim();
            if title != current.title() {
                diff.push(MetadataField::Title, json!(current.title()), json!(title));
            }
        }
        if let Some(description) = &changes.description {
            if description != current.description() {
                diff.push(
                    MetadataField::Description,
                    json!(current.description()),
                    json!(description),
                );
            }
        }
        if let Some(document_type) = &changes.document_type {
            if document_type != current.document_type() {
                diff.push(
                    MetadataField::DocumentType,
                    json!(current.document_type()),
                    json!(document_type),
                );
            }
        }
        if let Some(tags) = &changes.tags {
            if tags.as_slice() != current.tags() {
                diff.push(MetadataField::Tags, json!(current.tags()), json!(tags));
            }
        }
        if let Some(status) = changes.status {
            if status != current.status() {
                diff.push(
                    MetadataField::Status,
                    json!(current.status().as_str()),
                    json!(status.as_str()),
                );
                diff.status = Some((current.status(), status));
            }
        }

        diff
    }

    fn push(&mut self, field: MetadataField, before: Value, after: Value) {
        self.changes.push(FieldChange {
            field,
            before,
            after,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        self.changes.iter().map(|c| c.field.as_str()).collect()
    }

    /// `(old, new)` status pair if status is among the changed fields.
    pub fn status_change(&self) -> Option<(DocumentStatus, DocumentStatus)> {
        self.status
    }

    /// `{ "<field>": { "before": .., "after": .. }, .. }`
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for change in &self.changes {
            map.insert(
                change.field.as_str().to_string(),
                json!({ "before": change.before, "after": change.after }),
            );
        }
        Value::Object(map)
    }

    /// Writes the new values of every changed field into `target`.
    pub(crate) fn apply_to(&self, target: &mut Envelope, changes: &MetadataChanges) {
        for change in &self.changes {
            match change.field {
                MetadataField::Title => {
                    if let Some(title) = &changes.title {
                        target.title = title.trim().to_string();
                    }
                }
                MetadataField::Description => {
                    if let Some(description) = &changes.description {
                        target.description = description.clone();
                    }
                }
                MetadataField::DocumentType => {
                    if let Some(document_type) = &changes.document_type {
                        target.document_type = document_type.clone();
                    }
                }
                MetadataField::Tags => {
                    if let Some(tags) = &changes.tags {
                        target.tags = tags.clone();
                    }
                }
                MetadataField::Status => {
                    if let Some(status) = changes.status {
                        target.status = status;
                    }
                }
            }
        }
    }
}

/// Trims tags, drops empty ones and removes duplicates, keeping the first
/// occurrence.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::envelope::test_envelope;

    #[test]
    fn test_identical_values_produce_empty_diff() {
        let env = test_envelope();
        let changes = MetadataChanges {
            title: Some(env.title().to_string()),
            status: Some(env.status()),
            tags: Some(Vec::new()),
            ..MetadataChanges::default()
        };

        assert!(MetadataDiff::compute(&env, &changes).is_empty());
    }

    #[test]
    fn test_only_changed_fields_are_listed() {
        let env = test_envelope();
        let changes = MetadataChanges {
            title: Some(env.title().to_string()),
            description: Some("Updated for 2026".to_string()),
            ..MetadataChanges::default()
        };

        let diff = MetadataDiff::compute(&env, &changes);
        assert_eq!(diff.changed_fields(), vec!["description"]);
        assert_eq!(diff.changes()[0].before, json!(""));
        assert_eq!(diff.changes()[0].after, json!("Updated for 2026"));
        assert!(diff.status_change().is_none());
    }

    #[test]
    fn test_status_change_is_reported() {
        let env = test_envelope();
        let changes = MetadataChanges {
            status: Some(DocumentStatus::PendingReview),
            ..MetadataChanges::default()
        };

        let diff = MetadataDiff::compute(&env, &changes);
        assert_eq!(
            diff.status_change(),
            Some((DocumentStatus::Draft, DocumentStatus::PendingReview))
        );
        assert_eq!(
            diff.to_json(),
            json!({ "status": { "before": "draft", "after": "pending_review" } })
        );
    }

    #[test]
    fn test_whitespace_only_title_change_is_noop() {
        let env = test_envelope();
        let changes = MetadataChanges {
            title: Some(format!("  {}  ", env.title())),
            ..MetadataChanges::default()
        };
        assert!(MetadataDiff::compute(&env, &changes).is_empty());
    }

    #[test]
    fn test_apply_writes_new_values() {
        let env = test_envelope();
        let changes = MetadataChanges {
            title: Some("Handbook v2".to_string()),
            tags: Some(vec!["hr".to_string()]),
            ..MetadataChanges::default()
        };

        let diff = MetadataDiff::compute(&env, &changes);
        let mut next = env.clone();
        diff.apply_to(&mut next, &changes);

        assert_eq!(next.title(), "Handbook v2");
        assert_eq!(next.tags(), &["hr".to_string()]);
        assert_eq!(next.description(), env.description());
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " legal ".to_string(),
            "".to_string(),
            "hr".to_string(),
            "legal".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["legal".to_string(), "hr".to_string()]);
    }
}
