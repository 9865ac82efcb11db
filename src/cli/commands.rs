//! CLI command implementations
//!
//! Every command loads the config first and installs logging. `exec`,
//! `history` and `verify` replay the journal on open, so a corrupted
//! journal stops them before any request is served.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::audit::{count_usage, read_records, verify_chain, FileAuditSink};
use crate::blob::LocalBlobStore;
use crate::config::Config;
use crate::document::{DocumentError, DocumentService, Envelope};
use crate::observability::init_logging;
use crate::store::JournalStore;
use crate::types::{ActorRef, DocumentId};
use crate::version::VersionChain;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_lines, write_error, write_response};
use super::request::{decode_version, require_actor, Operation, Request};

pub type VaultService = DocumentService<JournalStore, LocalBlobStore>;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Exec { config } => exec(&config),
        Command::History { config, document } => history(&config, document),
        Command::Verify { config } => verify(&config),
        Command::AuditVerify { config } => audit_verify(&config),
    }
}

fn load_config(path: &Path) -> CliResult<Config> {
    let config = Config::load(path)?;
    init_logging(config.log_format).map_err(|e| CliError::Logging(e.to_string()))?;
    Ok(config)
}

fn ensure_initialized(config: &Config) -> CliResult<()> {
    if !config.is_initialized() {
        return Err(CliError::NotInitialized(config.data_path().to_path_buf()));
    }
    Ok(())
}

/// Create the data directory layout
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    initialize(&config)?;
    write_response(
        &mut io::stdout().lock(),
        json!({ "initialized": true, "data_dir": config.data_dir }),
    )
}

/// Creates `journal/`, `audit/` and `blobs/` under the data directory.
pub fn initialize(config: &Config) -> CliResult<()> {
    if config.is_initialized() {
        return Err(CliError::AlreadyInitialized(config.data_path().to_path_buf()));
    }

    let dirs = [
        config.data_path().join("journal"),
        config.data_path().join("audit"),
        config.blob_dir(),
    ];
    for dir in &dirs {
        fs::create_dir_all(dir)?;
    }

    info!(data_dir = %config.data_dir, "data directory initialized");
    Ok(())
}

/// Serve JSON requests from stdin until EOF
pub fn exec(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let vault = Vault::open(&config)?;
    let stdin = io::stdin();
    vault.serve(stdin.lock(), &mut io::stdout().lock())
}

/// Print the version chain of one document
pub fn history(config_path: &Path, document: DocumentId) -> CliResult<()> {
    let config = load_config(config_path)?;
    let vault = Vault::open(&config)?;
    let chain = vault.service().version_history(document)?;
    write_response(&mut io::stdout().lock(), chain_json(&chain)?)
}

/// Replay the journal and report counts
pub fn verify(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    ensure_initialized(&config)?;

    let audit = FileAuditSink::open(config.audit_path(), config.fsync)?;
    let store = JournalStore::open(config.journal_path(), config.fsync, &audit)?;
    let stats = store.replay_stats();
    write_response(
        &mut io::stdout().lock(),
        json!({
            "records": stats.records,
            "documents": stats.documents,
            "versions": stats.versions,
            "revoked": stats.revoked,
            "reconciled": stats.reconciled,
        }),
    )
}

/// Verify the audit hash chain
pub fn audit_verify(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    ensure_initialized(&config)?;

    let records = read_records(&config.audit_path())?;
    verify_chain(&records)?;
    write_response(
        &mut io::stdout().lock(),
        json!({
            "records": records.len(),
            "head": records.last().map(|r| r.integrity_hash.clone()),
        }),
    )
}

/// An opened data directory.
pub struct Vault {
    service: VaultService,
    audit: Arc<FileAuditSink>,
}

impl Vault {
    pub fn open(config: &Config) -> CliResult<Self> {
        ensure_initialized(config)?;

        let audit = Arc::new(FileAuditSink::open(config.audit_path(), config.fsync)?);
        let store = JournalStore::open(config.journal_path(), config.fsync, audit.as_ref())?;
        let blobs = LocalBlobStore::new(config.blob_dir());
        let service = DocumentService::new(store, blobs, audit.clone())
            .with_max_content_bytes(config.max_content_bytes);

        Ok(Self { service, audit })
    }

    pub fn service(&self) -> &VaultService {
        &self.service
    }

    /// Answers every request line in `input` on `out`.
    ///
    /// Request failures become error responses; only I/O failures on the
    /// streams themselves end the loop.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> CliResult<()> {
        for line in read_lines(input) {
            let line = line?;
            match Request::parse(&line).and_then(|req| self.handle(req)) {
                Ok(data) => write_response(out, data)?,
                Err(e) => write_error(out, e.code(), &e.to_string())?,
            }
        }
        Ok(())
    }

    pub fn handle(&self, request: Request) -> CliResult<Value> {
        let Request { actor, op } = request;
        let name = op.name();
        let svc = &self.service;

        match op {
            Operation::Create { document } => {
                let actor = require_actor(actor.as_ref(), name)?;
                Ok(serde_json::to_value(svc.create(actor, document)?)?)
            }
            Operation::Get {
                document_id,
                include_deleted,
            } => Ok(serde_json::to_value(svc.load(document_id, include_deleted)?)?),
            Operation::List { query } => Ok(json!({ "documents": svc.list(&query)? })),
            Operation::UpdateMetadata {
                document_id,
                expected_token,
                changes,
            } => {
                let actor = require_actor(actor.as_ref(), name)?;
                let mut doc = self.checkout(document_id, expected_token)?;
                let diff = svc.update_metadata(&mut doc, actor, changes)?;
                Ok(json!({ "document": doc, "changes": diff.to_json() }))
            }
            Operation::CreateVersion {
                document_id,
                expected_token,
                file_name,
                content_type,
                content,
                change_summary,
            } => {
                let actor = require_actor(actor.as_ref(), name)?;
                let new = decode_version(file_name, content_type, &content, change_summary)?;
                let mut doc = self.checkout(document_id, expected_token)?;
                let version = svc.create_version(&mut doc, actor, new)?;
                Ok(json!({ "document": doc, "version": version }))
            }
            Operation::Lock {
                document_id,
                expected_token,
            } => {
                let actor = require_actor(actor.as_ref(), name)?;
                let mut doc = self.checkout(document_id, expected_token)?;
                let acquired = svc.lock(&mut doc, actor)?;
                Ok(json!({ "acquired": acquired, "document": doc }))
            }
            Operation::Unlock {
                document_id,
                expected_token,
            } => {
                let actor = require_actor(actor.as_ref(), name)?;
                let mut doc = self.checkout(document_id, expected_token)?;
                let released = svc.unlock(&mut doc, actor)?;
                Ok(json!({ "released": released, "document": doc }))
            }
            Operation::SoftDelete {
                document_id,
                expected_token,
            } => {
                let actor = require_actor(actor.as_ref(), name)?;
                let mut doc = self.checkout(document_id, expected_token)?;
                svc.soft_delete(&mut doc, actor)?;
                Ok(serde_json::to_value(doc)?)
            }
            Operation::Restore {
                document_id,
                expected_token,
            } => {
                let actor = require_actor(actor.as_ref(), name)?;
                let mut doc = self.checkout(document_id, expected_token)?;
                svc.restore(&mut doc, actor)?;
                Ok(serde_json::to_value(doc)?)
            }
            Operation::Move {
                document_id,
                expected_token,
                folder,
            } => {
                let actor = require_actor(actor.as_ref(), name)?;
                let mut doc = self.checkout(document_id, expected_token)?;
                svc.move_to(&mut doc, actor, folder)?;
                Ok(serde_json::to_value(doc)?)
            }
            Operation::History { document_id } => chain_json(&svc.version_history(document_id)?),
            Operation::LogDownload { version_id } => {
                let actor = require_actor(actor.as_ref(), name)?;
                svc.log_download(actor, version_id)?;
                Ok(json!({ "logged": true }))
            }
            Operation::LogView { version_id } => {
                let actor = require_actor(actor.as_ref(), name)?;
                svc.log_view(actor, version_id)?;
                Ok(json!({ "logged": true }))
            }
            Operation::Usage { version_id } => {
                svc.version(version_id)?;
                let counts = count_usage(self.audit.as_ref(), version_id)?;
                Ok(serde_json::to_value(counts)?)
            }
            Operation::HardDelete { document_id } => {
                let actor = anonymous_or(actor.as_ref());
                svc.hard_delete(&actor, document_id)?;
                Ok(Value::Null)
            }
            Operation::UpdateVersion { version_id, fields } => {
                let actor = anonymous_or(actor.as_ref());
                svc.update_version(&actor, version_id, &fields)?;
                Ok(Value::Null)
            }
            Operation::DeleteVersion { version_id } => {
                let actor = anonymous_or(actor.as_ref());
                svc.delete_version(&actor, version_id)?;
                Ok(Value::Null)
            }
        }
    }

    /// Loads the envelope a mutating request names and checks that the
    /// caller's token is still current.
    fn checkout(&self, id: DocumentId, expected_token: u64) -> CliResult<Envelope> {
        let doc = self.service.load(id, true)?;
        if doc.concurrency_token() != expected_token {
            warn!(
                document_id = %id,
                expected = expected_token,
                actual = doc.concurrency_token(),
                "stale request token"
            );
            return Err(DocumentError::ConcurrencyConflict {
                document_id: id,
                expected: expected_token,
                actual: doc.concurrency_token(),
            }
            .into());
        }
        Ok(doc)
    }
}

/// Destructive requests are rejected whoever sends them, so a missing actor
/// must not turn the rejection into a different error.
fn anonymous_or(actor: Option<&ActorRef>) -> ActorRef {
    actor.cloned().unwrap_or_else(|| ActorRef::new("anonymous"))
}

fn chain_json(chain: &VersionChain) -> CliResult<Value> {
    let mut versions = Vec::with_capacity(chain.len());
    for entry in chain {
        let mut value = serde_json::to_value(entry)?;
        value["is_latest"] = json!(chain.is_latest(entry));
        value["content_changed"] = json!(chain.content_changed_from_previous(entry));
        versions.push(value);
    }
    Ok(json!({ "document_id": chain.document_id(), "versions": versions }))
}
