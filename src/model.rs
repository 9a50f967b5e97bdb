//! Core data model.
//!
//! Host values are what the page hands the credentials API; log records and
//! relay messages are the plain data the logger produces from them.

mod host;
mod message;
mod record;

pub use host::{
    Accessor, AuthenticatorResponse, BinaryBuffer, BufferKind, HostArray, HostObject, HostValue,
    PublicKeyCredential,
};
pub use message::{Envelope, MESSAGE_TYPE, MessageSource, RelayMessage};
pub use record::{CeremonyKind, LogRecord, RecordStatus, record_id};
