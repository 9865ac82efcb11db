//! Diagnostic logging
//!
//! Operational logs only. The audit trail is written exclusively through
//! `audit::AuditSink`.

mod logging;

pub use logging::{init_logging, DEFAULT_FILTER};
