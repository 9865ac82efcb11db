//! Document status lifecycle
//!
//! ```text
//! draft ──► pending_review ──► published
//!   ▲            │                 │
//!   └────────────┘                 │
//!   │            │                 │
//!   └────────────┴─────► archived ◄┘
//! ```
//!
//! `archived` is the only status with no outgoing transition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    PendingReview,
    Published,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::PendingReview => "pending_review",
            DocumentStatus::Published => "published",
            DocumentStatus::Archived => "archived",
        }
    }

    /// True if no status transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Archived)
    }

    /// Whether a document in `self` may move to `next`.
    ///
    /// Staying in the same status is not a transition and returns false.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;

        match (self, next) {
            (Draft, PendingReview) => true,
            (PendingReview, Published) => true,
            (PendingReview, Draft) => true,
            (from, Archived) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Draft
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "pending_review" => Ok(DocumentStatus::PendingReview),
            "published" => Ok(DocumentStatus::Published),
            "archived" => Ok(DocumentStatus::Archived),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}
