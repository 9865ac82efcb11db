//! Exclusive Edit Lock
//!
//! A pessimistic, actor-held lock stored on the envelope itself. It is
//! advisory: enforcement happens by checking these fields before a content
//! mutation is committed. Locks do not expire; a held lock persists until its
//! holder releases it.
//!
//! The functions here only decide. Writing the outcome goes through the same
//! compare-and-swap commit as every other envelope mutation.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{ActorRef, Timestamp};

/// Lock state held on an envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLock {
    holder: ActorRef,
    acquired_at: Timestamp,
}

impl EditLock {
    pub(crate) fn acquire(holder: ActorRef) -> Self {
        Self {
            holder,
            acquired_at: Utc::now(),
        }
    }

    #[inline]
    pub fn holder(&self) -> &ActorRef {
        &self.holder
    }

    #[inline]
    pub fn acquired_at(&self) -> Timestamp {
        self.acquired_at
    }

    #[inline]
    pub fn is_held_by(&self, actor: &ActorRef) -> bool {
        &self.holder == actor
    }
}

/// Outcome of a lock request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockDecision {
    /// Unlocked; the actor takes the lock.
    Acquire,
    /// The actor already holds it. Nothing to write.
    Reentrant,
    /// Someone else holds it.
    Denied { holder: ActorRef },
}

/// Outcome of an unlock request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnlockDecision {
    Release,
    Denied { holder: ActorRef },
    NotLocked,
}

pub fn decide_lock(current: Option<&EditLock>, actor: &ActorRef) -> LockDecision {
    match current {
        None => LockDecision::Acquire,
        Some(lock) if lock.is_held_by(actor) => LockDecision::Reentrant,
        Some(lock) => LockDecision::Denied {
            holder: lock.holder().clone(),
        },
    }
}

pub fn decide_unlock(current: Option<&EditLock>, actor: &ActorRef) -> UnlockDecision {
    match current {
        None => UnlockDecision::NotLocked,
        Some(lock) if lock.is_held_by(actor) => UnlockDecision::Release,
        Some(lock) => UnlockDecision::Denied {
            holder: lock.holder().clone(),
        },
    }
}

/// Returns the foreign holder if `actor` may not write content.
///
/// An unlocked document and a document locked by `actor` are both writable.
pub fn blocking_holder<'a>(current: Option<&'a EditLock>, actor: &ActorRef) -> Option<&'a ActorRef> {
    current
        .filter(|lock| !lock.is_held_by(actor))
        .map(EditLock::holder)
}
