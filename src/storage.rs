//! Persistence for the capture log.
//!
//! The log is one ordered sequence of records, read and written wholesale.
//! Records are merged by id: a settlement replaces its pending version in
//! place, anything new is appended, and the oldest records are evicted once
//! the log grows past its capacity.

mod file;

use std::io;
use std::sync::{Mutex, PoisonError};

use crate::model::LogRecord;

pub use file::FileStore;

/// Default retention cap.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// Wholesale access to the persisted log.
pub trait LogStore {
    /// The full log, oldest first.
    fn read_all(&self) -> Result<Vec<LogRecord>>;

    /// Replace the full log in a single write.
    fn write_all(&self, records: &[LogRecord]) -> Result<()>;
}

impl<S: LogStore + ?Sized> LogStore for &S {
    fn read_all(&self) -> Result<Vec<LogRecord>> {
        (**self).read_all()
    }

    fn write_all(&self, records: &[LogRecord]) -> Result<()> {
        (**self).write_all(records)
    }
}

/// What a merge did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// `true` when the record was new, `false` when it replaced one.
    pub inserted: bool,
    /// Records dropped from the head to respect the capacity.
    pub evicted: usize,
}

/// Merge `record` into `log` and trim it to `capacity`.
///
/// Replaces an existing record with the same id in place, otherwise appends.
/// Eviction removes from the head only.
pub fn merge_record(log: &mut Vec<LogRecord>, record: LogRecord, capacity: usize) -> MergeOutcome {
    let inserted = match log.iter_mut().find(|r| r.id == record.id) {
        Some(existing) => {
            *existing = record;
            false
        }
        None => {
            log.push(record);
            true
        }
    };

    let evicted = log.len().saturating_sub(capacity);
    log.drain(..evicted);

    MergeOutcome { inserted, evicted }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<LogRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl LogStore for MemoryStore {
    fn read_all(&self) -> Result<Vec<LogRecord>> {
        let guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn write_all(&self, records: &[LogRecord]) -> Result<()> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = records.to_vec();
        Ok(())
    }
}
