//! docvault CLI entry point
//!
//! Parses arguments, dispatches to `cli::run`, prints any error to stderr
//! and exits non-zero. Configuration, logging and store recovery all happen
//! inside the selected command.

use docvault::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
