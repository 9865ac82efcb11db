//! Audit sinks.
//!
//! A sink is outbound-only from the store's point of view: the document
//! service never reads audit state back to make a decision. Reading is a
//! separate [`AuditReader`] capability used for verification and usage
//! counters.
//!
//! `append_all` is a batch: either every event in it is recorded or none is.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::error;

use super::errors::{AuditError, AuditResult};
use super::event::AuditEvent;
use super::integrity::{AuditRecord, HashChain};

pub trait AuditSink: Send + Sync {
    /// Records every event in `events`, or none of them.
    ///
    /// Returns only after the records are visible (and durable, for sinks
    /// that persist).
    fn append_all(&self, events: &[AuditEvent]) -> AuditResult<()>;

    fn append(&self, event: &AuditEvent) -> AuditResult<()> {
        self.append_all(std::slice::from_ref(event))
    }
}

pub trait AuditReader {
    /// All stored records, oldest first.
    fn records(&self) -> AuditResult<Vec<AuditRecord>>;
}

/// Seals a batch against a scratch copy of the chain so a failed batch does
/// not advance the real head.
fn seal_batch(chain: &HashChain, events: &[AuditEvent]) -> AuditResult<(HashChain, Vec<AuditRecord>)> {
    let mut next = chain.clone();
    let records = events
        .iter()
        .cloned()
        .map(|e| next.seal(e))
        .collect::<AuditResult<Vec<_>>>()?;
    Ok((next, records))
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    chain: HashChain,
    records: Vec<AuditRecord>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.state
            .lock()
            .map(|s| s.records.iter().map(|r| r.event.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn append_all(&self, events: &[AuditEvent]) -> AuditResult<()> {
        let mut state = self.state.lock().map_err(|_| AuditError::Poisoned)?;
        let (chain, records) = seal_batch(&state.chain, events)?;
        state.records.extend(records);
        state.chain = chain;
        Ok(())
    }
}

impl AuditReader for MemoryAuditSink {
    fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        let state = self.state.lock().map_err(|_| AuditError::Poisoned)?;
        Ok(state.records.clone())
    }
}

/// Append-only JSON-lines sink.
///
/// One [`AuditRecord`] per line. A batch goes straight to the file and is
/// synced before `append_all` returns. A batch that fails partway is cut
/// back off the file; if that cut fails too, the sink disables itself
/// rather than let the next batch land after a torn line.
pub struct FileAuditSink {
    path: PathBuf,
    fsync: bool,
    state: Mutex<FileState>,
}

/// The file operations a batch needs.
trait LogFile: Write + Send {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

struct FileState {
    file: Box<dyn LogFile>,
    /// Length of the file up to the last complete batch.
    len: u64,
    chain: HashChain,
    disabled: Option<String>,
}

impl FileState {
    fn write_batch(&mut self, buf: &[u8], fsync: bool) -> io::Result<()> {
        self.file.write_all(buf)?;
        self.file.flush()?;
        if fsync {
            self.file.sync()?;
        }
        Ok(())
    }

    /// Cuts a failed batch off the end of the file.
    fn roll_back(&mut self, fsync: bool) {
        let len = self.len;
        let result = self.file.truncate(len).and_then(|_| {
            if fsync {
                self.file.sync()
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            let reason = format!("could not roll back a failed batch to {} bytes: {}", len, e);
            error!(reason = %reason, "audit sink disabled");
            self.disabled = Some(reason);
        }
    }
}

impl FileAuditSink {
    /// Opens or creates the log, resuming the hash chain from its last line.
    pub fn open(path: impl AsRef<Path>, fsync: bool) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let last = read_records(&path)?.pop().map(|r| r.integrity_hash);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata()?.len();

        Ok(Self::with_file(path, fsync, Box::new(file), len, HashChain::resume(last)))
    }

    fn with_file(path: PathBuf, fsync: bool, file: Box<dyn LogFile>, len: u64, chain: HashChain) -> Self {
        Self {
            path,
            fsync,
            state: Mutex::new(FileState {
                file,
                len,
                chain,
                disabled: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn append_all(&self, events: &[AuditEvent]) -> AuditResult<()> {
        let mut state = self.state.lock().map_err(|_| AuditError::Poisoned)?;
        if let Some(reason) = &state.disabled {
            return Err(AuditError::Disabled(reason.clone()));
        }
        let (chain, records) = seal_batch(&state.chain, events)?;

        let mut buf = Vec::new();
        for record in &records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        if let Err(e) = state.write_batch(&buf, self.fsync) {
            state.roll_back(self.fsync);
            return Err(e.into());
        }

        state.len += buf.len() as u64;
        state.chain = chain;
        Ok(())
    }
}

impl AuditReader for FileAuditSink {
    fn records(&self) -> AuditResult<Vec<AuditRecord>> {
        // Hold the lock so a concurrent batch is not read half-written.
        let _state = self.state.lock().map_err(|_| AuditError::Poisoned)?;
        read_records(&self.path)
    }
}

/// Reads every record from a JSON-lines audit file. Missing file reads as empty.
pub fn read_records(path: &Path) -> AuditResult<Vec<AuditRecord>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
