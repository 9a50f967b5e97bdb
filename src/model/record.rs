//! Log records: one per ceremony, rewritten in place when it settles.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Which credential ceremony was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyKind {
    /// `navigator.credentials.get`: assertion.
    Get,
    /// `navigator.credentials.create`: registration.
    Create,
}

impl CeremonyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
        }
    }
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a record stands. Derived from `success`, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    Succeeded,
    Failed,
}

/// A captured credential ceremony.
///
/// Created pending at invocation; the settlement version keeps the same
/// `id`, `timestamp`, `url`, and `options` and fills in the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: CeremonyKind,

    /// Capture time of the invocation.
    pub timestamp: Timestamp,

    pub url: String,

    /// Serialized options argument.
    pub options: Value,

    /// `None` until the ceremony settles.
    pub success: Option<bool>,

    pub result: Option<Value>,

    pub error: Option<String>,
}

impl LogRecord {
    /// A fresh record for a ceremony that has just been invoked.
    pub fn pending(kind: CeremonyKind, url: impl Into<String>, options: Value) -> Self {
        let timestamp = Timestamp::now();
        Self {
            id: record_id(timestamp),
            kind,
            timestamp,
            url: url.into(),
            options,
            success: None,
            result: None,
            error: None,
        }
    }

    /// The settlement version of this record after the ceremony resolved.
    #[must_use]
    pub fn settled_ok(&self, result: Value) -> Self {
        Self {
            success: Some(true),
            result: Some(result),
            error: None,
            ..self.clone()
        }
    }

    /// The settlement version of this record after the ceremony rejected.
    #[must_use]
    pub fn settled_err(&self, error: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            result: None,
            error: Some(error.into()),
            ..self.clone()
        }
    }

    pub fn status(&self) -> RecordStatus {
        match self.success {
            None => RecordStatus::Pending,
            Some(true) => RecordStatus::Succeeded,
            Some(false) => RecordStatus::Failed,
        }
    }
}

/// Time-based prefix plus a random suffix: `<millis in base 36>-<8 hex>`.
///
/// Uniqueness is best-effort.
pub fn record_id(at: Timestamp) -> String {
    let millis = u64::try_from(at.as_millisecond()).unwrap_or(0);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", to_base36(millis), &suffix[..8])
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
