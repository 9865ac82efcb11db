//! Command-line interface
//!
//! - init: create the data directory layout
//! - exec: serve JSON requests from stdin, one response per line
//! - history: print a document's version chain
//! - verify: replay the journal and report counts
//! - audit-verify: check the audit log hash chain

mod args;
mod commands;
mod errors;
mod io;
mod request;

pub use args::{Cli, Command};
pub use commands::{
    audit_verify, exec, history, init, initialize, run, run_command, verify, Vault, VaultService,
};
pub use errors::{CliError, CliResult};
pub use request::{Operation, Request};
