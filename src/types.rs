//! Identifier and reference types shared by every subsystem.
//!
//! Identifiers are opaque, stable and never reused. Actor and folder
//! references come from collaborators outside the store; the store only
//! records and compares them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID.
            #[inline]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identity of a Document Envelope.
    DocumentId
);

uuid_id!(
    /// Identity of a Version Chain Entry.
    VersionId
);

uuid_id!(
    /// Owning organization of a document.
    OrganizationId
);

/// Opaque reference to the actor performing an operation.
///
/// Actors are always passed explicitly; there is no ambient "current user".
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorRef(String);

impl ActorRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque reference to the folder a document is placed in.
///
/// The path is carried along so that moves can be audited with a readable
/// old/new location.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: Uuid,
    pub path: String,
}

impl FolderRef {
    pub fn new(id: Uuid, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }
}
