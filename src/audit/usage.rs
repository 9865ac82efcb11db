//! Download and view counters derived from the audit trail.
//!
//! Counts are never stored on a version entry; they are recomputed by
//! counting access events for the entry's target.

use serde::Serialize;

use crate::types::VersionId;

use super::errors::AuditResult;
use super::event::{AuditAction, AuditTarget};
use super::sink::AuditReader;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageCounts {
    pub downloads: u64,
    pub views: u64,
}

pub fn count_usage(reader: &dyn AuditReader, version_id: VersionId) -> AuditResult<UsageCounts> {
    let target = AuditTarget::Version(version_id);
    let mut counts = UsageCounts::default();

    for record in reader.records()? {
        if record.event.target != target {
            continue;
        }
        match record.event.action {
            AuditAction::VersionDownloaded => counts.downloads += 1,
            AuditAction::VersionViewed => counts.views += 1,
            _ => {}
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::event::AuditEvent;
    use crate::audit::sink::{AuditSink, MemoryAuditSink};
    use crate::types::ActorRef;

    #[test]
    fn test_counts_only_matching_target() {
        let sink = MemoryAuditSink::new();
        let actor = ActorRef::new("reader");
        let mine = VersionId::new();
        let other = VersionId::new();

        for (action, id) in [
            (AuditAction::VersionDownloaded, mine),
            (AuditAction::VersionViewed, mine),
            (AuditAction::VersionViewed, mine),
            (AuditAction::VersionDownloaded, other),
            (AuditAction::VersionCreated, mine),
        ] {
            sink.append(&AuditEvent::new(action, AuditTarget::Version(id), &actor))
                .unwrap();
        }

        let counts = count_usage(&sink, mine).unwrap();
        assert_eq!(counts, UsageCounts { downloads: 1, views: 2 });
    }

    #[test]
    fn test_no_events_means_zero() {
        let sink = MemoryAuditSink::new();
        assert_eq!(count_usage(&sink, VersionId::new()).unwrap(), UsageCounts::default());
    }
}
