//! CLI argument definitions using clap
//!
//! Commands:
//! - docvault init --config <path>
//! - docvault exec --config <path>
//! - docvault history --config <path> --document <id>
//! - docvault verify --config <path>
//! - docvault audit-verify --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::DocumentId;

/// docvault - append-only document version store with a mandatory audit trail
#[derive(Parser, Debug)]
#[command(name = "docvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory layout
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./docvault.json")]
        config: PathBuf,
    },

    /// Execute JSON requests from stdin, one per line
    Exec {
        /// Path to configuration file
        #[arg(long, default_value = "./docvault.json")]
        config: PathBuf,
    },

    /// Print the version chain of a document
    History {
        /// Path to configuration file
        #[arg(long, default_value = "./docvault.json")]
        config: PathBuf,

        /// Document id
        #[arg(long)]
        document: DocumentId,
    },

    /// Replay the journal and report what it holds
    Verify {
        /// Path to configuration file
        #[arg(long, default_value = "./docvault.json")]
        config: PathBuf,
    },

    /// Verify the audit log hash chain
    AuditVerify {
        /// Path to configuration file
        #[arg(long, default_value = "./docvault.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history() {
        let id = DocumentId::new();
        let cli = Cli::try_parse_from([
            "docvault",
            "history",
            "--config",
            "vault.json",
            "--document",
            &id.to_string(),
        ])
        .unwrap();

        match cli.command {
            Command::History { config, document } => {
                assert_eq!(config, PathBuf::from("vault.json"));
                assert_eq!(document, id);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["docvault", "audit-verify"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::AuditVerify { config } if config == PathBuf::from("./docvault.json")
        ));
    }

    #[test]
    fn test_history_requires_document() {
        assert!(Cli::try_parse_from(["docvault", "history"]).is_err());
    }
}
