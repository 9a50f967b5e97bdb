//! File-backed store: one JSON document holding the whole log.
//!
//! ```text
//! { "webauthn_logs": [ <LogRecord>, ... ] }
//! ```
//!
//! A missing file is a valid empty log. Writes land in a uniquely named
//! sibling temp file that is persisted over the document, so readers see the
//! old log or the new one, never a partial write.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::model::LogRecord;

use super::{LogStore, Result};

/// The single key the log is stored under.
pub const STORAGE_KEY: &str = "webauthn_logs";

#[derive(Serialize, Deserialize)]
struct Document {
    #[serde(rename = "webauthn_logs", default)]
    records: Vec<LogRecord>,
}

/// Local file-based storage for the capture log.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store at `path`. The parent directory is created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Returns the default log path: `~/.webauthn-logger/logs.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".webauthn-logger").join("logs.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl LogStore for FileStore {
    fn read_all(&self) -> Result<Vec<LogRecord>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document: Document = serde_json::from_str(&json)?;
        Ok(document.records)
    }

    fn write_all(&self, records: &[LogRecord]) -> Result<()> {
        let document = Document {
            records: records.to_vec(),
        };
        let json = serde_json::to_string(&document)?;
        let mut temp = NamedTempFile::new_in(self.dir())?;
        temp.write_all(json.as_bytes())?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};
    use tempfile::TempDir;

    use crate::model::CeremonyKind;
    use crate::storage::StoreError;

    fn test_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("logs.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn missing_file_reads_empty() {
        let (_dir, store) = test_store();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn write_then_read_preserves_order() {
        let (_dir, store) = test_store();
        let a = LogRecord::pending(CeremonyKind::Get, "https://a.test/", json!({}));
        let b = LogRecord::pending(CeremonyKind::Create, "https://b.test/", json!({}));

        store.write_all(&[a.clone(), b.clone()]).unwrap();
        let loaded = store.read_all().unwrap();

        assert_eq!(loaded, vec![a, b]);
        let leftovers = fs::read_dir(store.dir()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn concurrent_writers_never_fail_or_tear() {
        use std::thread;

        let (_dir, store) = test_store();
        let records: Vec<LogRecord> = (0..4)
            .map(|_| LogRecord::pending(CeremonyKind::Get, "https://a.test/", json!({})))
            .collect();

        thread::scope(|s| {
            for record in &records {
                let store = store.clone();
                s.spawn(move || {
                    for _ in 0..20 {
                        store.write_all(std::slice::from_ref(record)).unwrap();
                    }
                });
            }
        });

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(records.contains(&loaded[0]));
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 1);
    }

    #[test]
    fn bare_file_name_writes_beside_it() {
        let store = FileStore::new("logs.json").unwrap();
        assert_eq!(store.dir(), Path::new("."));
    }

    #[test]
    fn document_uses_single_key() {
        let (_dir, store) = test_store();
        let record = LogRecord::pending(CeremonyKind::Get, "https://a.test/", Value::Null);
        store.write_all(&[record]).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let object = raw.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object[STORAGE_KEY].as_array().unwrap().len(), 1);
    }

    #[test]
    fn clear_writes_empty_sequence() {
        let (_dir, store) = test_store();
        let record = LogRecord::pending(CeremonyKind::Get, "https://a.test/", Value::Null);
        store.write_all(&[record]).unwrap();
        store.write_all(&[]).unwrap();

        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let (_dir, store) = test_store();
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.read_all().unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }
}
