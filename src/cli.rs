//! CLI interface for the WebAuthn logger.
//!
//! The viewer side of the logger: read the captured log, export it, clear it.
//! `relay` is the intake side, reading newline-delimited message envelopes
//! from stdin and merging them into the store.
//!
//! Every command operates on one log file; see [`crate::config`] for how its
//! path is resolved.

mod format;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jiff::Timestamp;

use crate::config::Config;
use crate::model::LogRecord;
use crate::relay::Relay;
use crate::storage::{FileStore, LogStore};
use crate::viewer::{self, ClearOutcome, ExportOutcome, ViewModel};

use format::format_summary_line;

/// WebAuthn logger: inspect captured credential ceremonies.
#[derive(Debug, Parser)]
#[command(name = "webauthn-logger", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Log file to operate on. Overrides `WEBAUTHN_LOGGER_STORE` and the config.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow:
  1. Pipe captured messages into the log:
       page-bridge | webauthn-logger relay --origin https://example.com
  2. webauthn-logger list
  3. webauthn-logger show 1a2b
  4. webauthn-logger export --dir ~/Downloads
  5. webauthn-logger clear"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List captured ceremonies, newest first.
    List {
        /// Show every record in full instead of one line each.
        #[arg(long)]
        full: bool,
    },

    /// Show one record in full.
    Show {
        /// Record id or unambiguous prefix.
        id: String,
    },

    /// Write the full log to a timestamped JSON file.
    Export {
        /// Directory to write into (defaults to the current directory).
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Remove every record from the log.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Merge newline-delimited message envelopes from stdin into the log.
    ///
    /// Only envelopes from `--origin`, posted by the page window, carrying a
    /// `WEBAUTHN_LOG` message are stored. Everything else is ignored.
    Relay {
        /// The page origin messages must come from.
        #[arg(long)]
        origin: String,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();

    let path = config.resolve_store_path(cli.store.as_deref())?;
    let store = FileStore::new(&path)
        .map_err(|e| format!("failed to open log at {}: {e}", path.display()))?;

    match cli.command {
        Command::List { full } => cmd_list(&store, full),
        Command::Show { id } => cmd_show(&store, &id),
        Command::Export { dir } => cmd_export(&store, dir),
        Command::Clear { yes } => cmd_clear(&store, yes),
        Command::Relay { origin } => cmd_relay(store, &origin, config.capacity),
    }
}

fn read_log(store: &impl LogStore) -> Result<Vec<LogRecord>, String> {
    store
        .read_all()
        .map_err(|e| format!("failed to read log: {e}"))
}

fn cmd_list(store: &FileStore, full: bool) -> Result<(), String> {
    let mut view = ViewModel::new();
    view.refresh(read_log(store)?);

    if full {
        print!("{}", viewer::render(&view));
        return Ok(());
    }

    if view.records().is_empty() {
        println!("No WebAuthn logs captured yet");
        return Ok(());
    }

    for record in view.newest_first() {
        println!("{}", format_summary_line(record));
    }
    eprintln!("Total logs: {}", view.records().len());

    Ok(())
}

fn cmd_show(store: &FileStore, reference: &str) -> Result<(), String> {
    let records = read_log(store)?;
    let record = resolve_record(&records, reference)?;
    print!("{}", viewer::render_record(record));
    Ok(())
}

fn cmd_export(store: &FileStore, dir: Option<PathBuf>) -> Result<(), String> {
    let dir = dir.unwrap_or_else(|| PathBuf::from("."));
    let outcome = viewer::export(store, &dir, Timestamp::now())
        .map_err(|e| format!("failed to export log: {e}"))?;

    match outcome {
        ExportOutcome::Empty => eprintln!("No logs to export"),
        ExportOutcome::Written(path) => println!("{}", path.display()),
    }
    Ok(())
}

fn cmd_clear(store: &FileStore, yes: bool) -> Result<(), String> {
    let outcome = viewer::clear(store, || yes || confirm_clear())
        .map_err(|e| format!("failed to clear log: {e}"))?;

    match outcome {
        ClearOutcome::Cleared => eprintln!("All logs cleared"),
        ClearOutcome::Cancelled => eprintln!("Nothing cleared"),
    }
    Ok(())
}

fn cmd_relay(store: FileStore, origin: &str, capacity: usize) -> Result<(), String> {
    let relay = Relay::new(store, origin, capacity);
    let stored = relay
        .relay_lines(io::stdin().lock())
        .map_err(|e| format!("failed to read stdin: {e}"))?;
    eprintln!("Stored {stored} record(s)");
    Ok(())
}

/// Ask on stderr, read the answer from stdin. Anything but `y`/`yes` declines.
fn confirm_clear() -> bool {
    eprint!("Are you sure you want to clear all logs? This action cannot be undone. [y/N] ");
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Resolve a record reference (full id or unambiguous prefix) to a record.
fn resolve_record<'a>(records: &'a [LogRecord], reference: &str) -> Result<&'a LogRecord, String> {
    if let Some(record) = records.iter().find(|r| r.id == reference) {
        return Ok(record);
    }

    let matches: Vec<&LogRecord> = records
        .iter()
        .filter(|r| r.id.starts_with(reference))
        .collect();

    match matches.len() {
        0 => Err(format!("no record matching '{reference}'")),
        1 => Ok(matches[0]),
        n => {
            let ids: Vec<&str> = matches.iter().map(|r| r.id.as_str()).collect();
            Err(format!(
                "'{reference}' is ambiguous, matches {n} records: {}",
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;
    use serde_json::Value;

    use crate::model::CeremonyKind;

    fn record(id: &str) -> LogRecord {
        let mut record = LogRecord::pending(CeremonyKind::Get, "https://example.com/", Value::Null);
        record.id = id.to_string();
        record
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_relay_with_global_store() {
        let cli = Cli::try_parse_from([
            "webauthn-logger",
            "relay",
            "--origin",
            "https://example.com",
            "--store",
            "/tmp/logs.json",
        ])
        .unwrap();

        assert_eq!(cli.store, Some(PathBuf::from("/tmp/logs.json")));
        assert!(matches!(cli.command, Command::Relay { ref origin } if origin == "https://example.com"));
    }

    #[test]
    fn resolves_exact_and_prefix() {
        let records = vec![record("lx1abc-11111111"), record("lx2def-22222222")];

        assert_eq!(resolve_record(&records, "lx2").unwrap().id, "lx2def-22222222");
        assert_eq!(
            resolve_record(&records, "lx1abc-11111111").unwrap().id,
            "lx1abc-11111111"
        );
    }

    #[test]
    fn ambiguous_and_missing_prefixes_fail() {
        let records = vec![record("lx1abc-11111111"), record("lx1abd-22222222")];

        assert!(resolve_record(&records, "lx1").unwrap_err().contains("ambiguous"));
        assert!(resolve_record(&records, "zz").unwrap_err().contains("no record"));
    }
}
