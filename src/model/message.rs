//! Cross-context messages from the page to the relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::LogRecord;

/// Type tag the relay listens for.
pub const MESSAGE_TYPE: &str = "WEBAUTHN_LOG";

/// A message posted by the page interceptor.
///
/// Serialized as `{ "type": "WEBAUTHN_LOG", "data": <LogRecord> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RelayMessage {
    #[serde(rename = "WEBAUTHN_LOG")]
    WebauthnLog(LogRecord),
}

impl RelayMessage {
    pub fn record(&self) -> &LogRecord {
        match self {
            Self::WebauthnLog(record) => record,
        }
    }

    pub fn into_record(self) -> LogRecord {
        match self {
            Self::WebauthnLog(record) => record,
        }
    }
}

/// Who posted a message, as seen by the receiving context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageSource {
    /// The page's own global context.
    Window,
    /// A nested frame.
    Frame,
    /// Another extension context.
    Extension,
}

/// A delivered message: the payload is untrusted until the relay parses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: String,
    pub source: MessageSource,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::CeremonyKind;

    #[test]
    fn message_wire_shape() {
        let record = LogRecord::pending(CeremonyKind::Get, "https://example.com/", Value::Null);
        let message = RelayMessage::WebauthnLog(record.clone());

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], MESSAGE_TYPE);
        assert_eq!(value["data"]["id"], record.id.as_str());

        let back: RelayMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back.into_record(), record);
    }

    #[test]
    fn foreign_message_type_is_rejected() {
        let value = serde_json::json!({ "type": "SOMETHING_ELSE", "data": {} });
        assert!(serde_json::from_value::<RelayMessage>(value).is_err());
    }
}
