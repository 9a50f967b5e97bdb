//! Logging adapter for the credentials capability surface.
//!
//! [`LoggingCredentials`] implements the same [`CredentialsContainer`]
//! contract as the surface it wraps. Each call posts a pending record before
//! delegating and a settlement record afterwards; the inner result or error
//! is handed back untouched.

use std::rc::Rc;
use std::sync::mpsc::Sender;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::model::{CeremonyKind, Envelope, HostValue, LogRecord, MessageSource, RelayMessage};
use crate::serialize::Serializer;

/// A rejected ceremony, as the page would see it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct CeremonyError {
    /// DOMException name, e.g. `NotAllowedError`.
    pub name: String,
    pub message: String,
}

impl CeremonyError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// The two credential ceremonies a page can start.
///
/// Calls are synchronous: a ceremony has settled once the call returns.
pub trait CredentialsContainer {
    fn get(&self, options: &HostValue) -> Result<HostValue, CeremonyError>;

    fn create(&self, options: &HostValue) -> Result<HostValue, CeremonyError>;
}

/// Where captured records are posted.
pub trait MessageSink {
    fn post_message(&self, message: RelayMessage);
}

impl<T: MessageSink + ?Sized> MessageSink for &T {
    fn post_message(&self, message: RelayMessage) {
        (**self).post_message(message);
    }
}

impl<T: MessageSink + ?Sized> MessageSink for Rc<T> {
    fn post_message(&self, message: RelayMessage) {
        (**self).post_message(message);
    }
}

/// The page's current URL.
pub trait Location {
    fn href(&self) -> String;
}

impl Location for String {
    fn href(&self) -> String {
        self.clone()
    }
}

impl Location for &str {
    fn href(&self) -> String {
        (*self).to_string()
    }
}

/// Posts messages from the page's own window to a relay over a channel.
#[derive(Debug, Clone)]
pub struct WindowChannel {
    origin: String,
    sender: Sender<Envelope>,
}

impl WindowChannel {
    pub fn new(origin: impl Into<String>, sender: Sender<Envelope>) -> Self {
        Self {
            origin: origin.into(),
            sender,
        }
    }
}

impl MessageSink for WindowChannel {
    fn post_message(&self, message: RelayMessage) {
        let data = match serde_json::to_value(&message) {
            Ok(data) => data,
            Err(e) => {
                error!(id = %message.record().id, "failed to encode log message: {e}");
                return;
            }
        };
        let envelope = Envelope {
            origin: self.origin.clone(),
            source: MessageSource::Window,
            data,
        };
        if self.sender.send(envelope).is_err() {
            debug!(id = %message.record().id, "relay gone; message dropped");
        }
    }
}

/// Wraps a credentials surface behind the logging adapter.
///
/// Returns `None` when the page exposes no credentials surface.
pub fn install<C, S, L>(surface: Option<C>, sink: S, location: L) -> Option<LoggingCredentials<C, S, L>>
where
    C: CredentialsContainer,
    S: MessageSink,
    L: Location,
{
    let Some(inner) = surface else {
        info!("credentials API not available; nothing to wrap");
        return None;
    };
    info!(url = %location.href(), "credentials get/create wrapped");
    Some(LoggingCredentials::new(inner, sink, location))
}

/// A [`CredentialsContainer`] that records every ceremony it forwards.
pub struct LoggingCredentials<C, S, L> {
    inner: C,
    sink: S,
    location: L,
    serializer: Serializer,
}

impl<C, S, L> LoggingCredentials<C, S, L>
where
    C: CredentialsContainer,
    S: MessageSink,
    L: Location,
{
    pub fn new(inner: C, sink: S, location: L) -> Self {
        Self {
            inner,
            sink,
            location,
            serializer: Serializer::default(),
        }
    }

    #[must_use]
    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// The wrapped surface.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn ceremony(
        &self,
        kind: CeremonyKind,
        options: &HostValue,
        call: impl FnOnce(&C, &HostValue) -> Result<HostValue, CeremonyError>,
    ) -> Result<HostValue, CeremonyError> {
        let pending = LogRecord::pending(
            kind,
            self.location.href(),
            self.serializer.serialize(options),
        );
        trace_invocation(&pending);
        self.sink
            .post_message(RelayMessage::WebauthnLog(pending.clone()));

        let outcome = call(&self.inner, options);

        let settled = match &outcome {
            Ok(value) => {
                debug!(id = %pending.id, "credentials.{kind}() success");
                pending.settled_ok(self.serializer.serialize(value))
            }
            Err(e) => {
                debug!(id = %pending.id, "credentials.{kind}() error: {e}");
                pending.settled_err(e.to_string())
            }
        };
        self.sink.post_message(RelayMessage::WebauthnLog(settled));

        outcome
    }
}

impl<C, S, L> CredentialsContainer for LoggingCredentials<C, S, L>
where
    C: CredentialsContainer,
    S: MessageSink,
    L: Location,
{
    fn get(&self, options: &HostValue) -> Result<HostValue, CeremonyError> {
        self.ceremony(CeremonyKind::Get, options, |inner, options| {
            inner.get(options)
        })
    }

    fn create(&self, options: &HostValue) -> Result<HostValue, CeremonyError> {
        self.ceremony(CeremonyKind::Create, options, |inner, options| {
            inner.create(options)
        })
    }
}

/// Emit the invocation with the relying-party highlights of `publicKey`.
fn trace_invocation(record: &LogRecord) {
    let field = |key: &str| public_key_field(&record.options, key);
    match record.kind {
        CeremonyKind::Get => debug!(
            id = %record.id,
            url = %record.url,
            rp_id = %field("rpId"),
            challenge = %field("challenge"),
            allow_credentials = %field("allowCredentials"),
            user_verification = %field("userVerification"),
            timeout = %field("timeout"),
            "credentials.get() called"
        ),
        CeremonyKind::Create => debug!(
            id = %record.id,
            url = %record.url,
            rp = %field("rp"),
            user = %field("user"),
            challenge = %field("challenge"),
            pub_key_cred_params = %field("pubKeyCredParams"),
            authenticator_selection = %field("authenticatorSelection"),
            exclude_credentials = %field("excludeCredentials"),
            attestation = %field("attestation"),
            timeout = %field("timeout"),
            "credentials.create() called"
        ),
    }
}

/// One `publicKey` member for a trace field. Strings print bare, anything
/// else as compact JSON, and a missing member as the empty string.
fn public_key_field(options: &Value, key: &str) -> String {
    match options.get("publicKey").and_then(|pk| pk.get(key)) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
