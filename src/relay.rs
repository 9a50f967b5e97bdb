//! The relay: accept page messages and merge their records into the store.
//!
//! Only messages posted by the page's own window, from the expected origin,
//! carrying a well-formed `WEBAUTHN_LOG` payload are acted on. Everything
//! else is dropped without a trace beyond a `trace`-level event.
//!
//! Each accepted record goes through one read-merge-write cycle on the store.
//! The cycle is serialized behind a mutex so two ceremonies settling back to
//! back cannot lose each other's update.

use std::io::BufRead;
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, trace};

use crate::model::{Envelope, LogRecord, MessageSource, RelayMessage};
use crate::storage::{self, LogStore, MergeOutcome};

/// Why a delivered message was not acted on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("origin {0} does not match")]
    ForeignOrigin(String),

    #[error("message not posted by the page window")]
    ForeignSource,

    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Receives log messages and persists them.
pub struct Relay<S> {
    store: S,
    origin: String,
    capacity: usize,
    merge_lock: Mutex<()>,
}

impl<S: LogStore> Relay<S> {
    pub fn new(store: S, origin: impl Into<String>, capacity: usize) -> Self {
        Self {
            store,
            origin: origin.into(),
            capacity,
            merge_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check origin, source, and shape of a delivered message.
    pub fn accept(&self, envelope: &Envelope) -> Result<LogRecord, Rejection> {
        if envelope.origin != self.origin {
            return Err(Rejection::ForeignOrigin(envelope.origin.clone()));
        }
        if envelope.source != MessageSource::Window {
            return Err(Rejection::ForeignSource);
        }
        let message: RelayMessage = serde_json::from_value(envelope.data.clone())
            .map_err(|e| Rejection::Malformed(e.to_string()))?;
        Ok(message.into_record())
    }

    /// Handle one delivered message. Never fails: rejected messages are
    /// ignored and storage failures are logged.
    ///
    /// Returns the merge outcome when a record was persisted.
    pub fn receive(&self, envelope: &Envelope) -> Option<MergeOutcome> {
        let record = match self.accept(envelope) {
            Ok(record) => record,
            Err(rejection) => {
                trace!("ignoring message: {rejection}");
                return None;
            }
        };
        let id = record.id.clone();
        match self.merge(record) {
            Ok(outcome) => {
                debug!(
                    %id,
                    inserted = outcome.inserted,
                    evicted = outcome.evicted,
                    "log record stored"
                );
                Some(outcome)
            }
            Err(e) => {
                error!(%id, "failed to store log record: {e}");
                None
            }
        }
    }

    /// Read the full log, merge `record` by id, trim, and write it back.
    pub fn merge(&self, record: LogRecord) -> storage::Result<MergeOutcome> {
        let _guard = self
            .merge_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut log = self.store.read_all()?;
        let outcome = storage::merge_record(&mut log, record, self.capacity);
        self.store.write_all(&log)?;
        Ok(outcome)
    }

    /// Drain a channel until every sender is gone. Returns how many records
    /// were stored.
    pub fn pump(&self, messages: &Receiver<Envelope>) -> usize {
        messages
            .iter()
            .filter_map(|envelope| self.receive(&envelope))
            .count()
    }

    /// Relay newline-delimited JSON envelopes. Lines that are not valid
    /// UTF-8 or not a JSON envelope are skipped; only read failures stop
    /// intake.
    ///
    /// Returns how many records were stored.
    pub fn relay_lines(&self, mut reader: impl BufRead) -> std::io::Result<usize> {
        let mut stored = 0;
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            if line.trim_ascii().is_empty() {
                continue;
            }
            let envelope: Envelope = match serde_json::from_slice(&line) {
                Ok(envelope) => envelope,
                Err(e) => {
                    trace!("ignoring unparsable line: {e}");
                    continue;
                }
            };
            if self.receive(&envelope).is_some() {
                stored += 1;
            }
        }
        Ok(stored)
    }
}
