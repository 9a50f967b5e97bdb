//! Viewer: render, export, and clear the persisted log.
//!
//! The viewer never writes except through [`clear`].

use std::fs;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use jiff::tz::TimeZone;
use serde_json::Value;

use crate::model::{LogRecord, RecordStatus};
use crate::storage::{self, LogStore};

/// The snapshot last rendered, compared against fresh reads so an unchanged
/// log is not re-rendered.
#[derive(Debug, Default, Clone)]
pub struct ViewModel {
    records: Vec<LogRecord>,
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt `snapshot`. Returns `false` when it equals what is shown.
    pub fn refresh(&mut self, snapshot: Vec<LogRecord>) -> bool {
        if snapshot == self.records {
            return false;
        }
        self.records = snapshot;
        true
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Records newest first.
    pub fn newest_first(&self) -> Vec<&LogRecord> {
        let mut records: Vec<&LogRecord> = self.records.iter().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }
}

pub fn status_glyph(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Succeeded => "✓",
        RecordStatus::Failed => "✗",
        RecordStatus::Pending => "⏳",
    }
}

/// Render the whole view as text.
pub fn render(view: &ViewModel) -> String {
    let mut out = format!("Total logs: {}\n", view.records().len());
    if view.records().is_empty() {
        out.push_str("No WebAuthn logs captured yet\n");
        return out;
    }
    for record in view.newest_first() {
        out.push('\n');
        out.push_str(&render_record(record));
    }
    out
}

/// Render one record: header, URL, then its JSON sections.
pub fn render_record(record: &LogRecord) -> String {
    let mut out = format!(
        "{} {} {}  [{}]\n{}\n",
        record.kind.as_str().to_uppercase(),
        status_glyph(record.status()),
        local_time(record.timestamp),
        record.id,
        record.url,
    );
    push_section(&mut out, "Options", &pretty(&record.options));
    if let Some(result) = record.result.as_ref().filter(|r| !r.is_null()) {
        push_section(&mut out, "Result", &pretty(result));
    }
    if let Some(error) = record.error.as_deref().filter(|e| !e.is_empty()) {
        push_section(&mut out, "Error", error);
    }
    out
}

fn push_section(out: &mut String, title: &str, body: &str) {
    out.push_str(&format!("  {title}:\n"));
    for line in body.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn local_time(at: Timestamp) -> String {
    at.to_zoned(TimeZone::system())
        .strftime("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Result of an export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The log was empty; nothing was written.
    Empty,
    /// The log was written to this file.
    Written(PathBuf),
}

/// Export file name for a snapshot taken at `now`:
/// `webauthn-logs-<ISO timestamp with ':' and '.' as '-'>.json`.
pub fn export_file_name(now: Timestamp) -> String {
    let iso = format!(
        "{}.{:03}Z",
        now.strftime("%Y-%m-%dT%H:%M:%S"),
        now.subsec_millisecond()
    );
    format!("webauthn-logs-{}.json", iso.replace([':', '.'], "-"))
}

/// Write the full log as pretty JSON into `dir`. Read-only on the store.
pub fn export(store: &impl LogStore, dir: &Path, now: Timestamp) -> storage::Result<ExportOutcome> {
    let records = store.read_all()?;
    if records.is_empty() {
        return Ok(ExportOutcome::Empty);
    }
    let json = serde_json::to_string_pretty(&records)?;
    let path = dir.join(export_file_name(now));
    fs::write(&path, json)?;
    Ok(ExportOutcome::Written(path))
}

/// Result of a clear request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Cancelled,
}

/// Replace the log with an empty sequence once `confirm` agrees.
pub fn clear(store: &impl LogStore, confirm: impl FnOnce() -> bool) -> storage::Result<ClearOutcome> {
    if !confirm() {
        return Ok(ClearOutcome::Cancelled);
    }
    store.write_all(&[])?;
    Ok(ClearOutcome::Cleared)
}
