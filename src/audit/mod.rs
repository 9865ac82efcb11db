//! Audit Emission Contract
//!
//! Every committed mutation is described by audit events handed to an
//! [`AuditSink`] in the same unit of work as the domain write:
//! - the sink is called with the full batch for one commit
//! - if the sink fails, the commit does not take effect
//! - no operation emits zero or duplicate events for one logical action
//!
//! Records are hash-chained (see [`integrity`]) so a stored trail can be
//! verified end to end.

mod errors;
mod event;
pub mod integrity;
mod sink;
mod usage;

pub use errors::{AuditError, AuditResult};
pub use event::{AuditAction, AuditEvent, AuditEventType, AuditTarget};
pub use integrity::{verify_chain, AuditRecord};
pub use sink::{read_records, AuditReader, AuditSink, FileAuditSink, MemoryAuditSink};
pub use usage::{count_usage, UsageCounts};
