//! Host value serialization: turn page objects into storable JSON.
//!
//! The walk never fails. Anything that cannot be represented is replaced by a
//! sentinel string:
//!
//! - depth beyond the cap → [`MAX_DEPTH_MARKER`]
//! - an array/object already on the current path → [`CIRCULAR_MARKER`]
//! - a function → [`FUNCTION_MARKER`]
//! - a getter that fails → `"[Serialization Error: <message>]"`
//!
//! Binary buffers become `{ "__type", "byteLength", "data" }` so the bytes
//! survive a trip through JSON storage; see [`decode_buffer`].

use std::collections::HashSet;

use serde_json::{Map, Number, Value};

use crate::model::{
    AuthenticatorResponse, BinaryBuffer, BufferKind, HostValue, PublicKeyCredential,
};

/// Default recursion cap.
pub const MAX_DEPTH: usize = 10;

pub const MAX_DEPTH_MARKER: &str = "[Max Depth Reached]";
pub const CIRCULAR_MARKER: &str = "[Circular Reference]";
pub const FUNCTION_MARKER: &str = "[Function]";

/// Tag key for structured (non-plain) values.
pub const TYPE_TAG: &str = "__type";

const CREDENTIAL_TAG: &str = "PublicKeyCredential";

/// Serialize with the default depth cap.
pub fn serialize(value: &HostValue) -> Value {
    Serializer::default().serialize(value)
}

/// Sentinel for a sub-value whose serialization failed.
pub fn error_marker(message: &str) -> Value {
    Value::String(format!("[Serialization Error: {message}]"))
}

/// Configurable serializer.
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    max_depth: usize,
}

impl Default for Serializer {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }
}

impl Serializer {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn serialize(&self, value: &HostValue) -> Value {
        let mut walk = Walk {
            max_depth: self.max_depth,
            path: HashSet::new(),
        };
        walk.value(value, 0)
    }
}

/// One traversal. `path` holds the identities of the containers currently
/// being walked; shared but acyclic references serialize in full.
struct Walk {
    max_depth: usize,
    path: HashSet<usize>,
}

impl Walk {
    fn value(&mut self, value: &HostValue, depth: usize) -> Value {
        match value {
            HostValue::Undefined | HostValue::Null => Value::Null,
            HostValue::Bool(b) => Value::Bool(*b),
            HostValue::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            HostValue::String(s) => Value::String(s.clone()),
            HostValue::Function(_) => Value::String(FUNCTION_MARKER.to_string()),
            HostValue::Accessor(accessor) => match accessor.read() {
                Ok(inner) => self.value(&inner, depth),
                Err(message) => error_marker(&message),
            },
            _ if depth > self.max_depth => Value::String(MAX_DEPTH_MARKER.to_string()),
            HostValue::Buffer(buffer) => encode_buffer(buffer),
            HostValue::Array(array) => self.enter(array.identity(), |walk| {
                Value::Array(
                    array
                        .items()
                        .iter()
                        .map(|item| walk.value(item, depth + 1))
                        .collect(),
                )
            }),
            HostValue::Object(object) => self.enter(object.identity(), |walk| {
                let mut map = Map::new();
                for (key, item) in object.entries() {
                    let serialized = walk.value(&item, depth + 1);
                    map.insert(key, serialized);
                }
                Value::Object(map)
            }),
            HostValue::Credential(credential) => {
                let identity = std::rc::Rc::as_ptr(credential).cast::<()>() as usize;
                self.enter(identity, |walk| walk.credential(credential, depth))
            }
        }
    }

    /// Walk a container unless it is already on the current path.
    fn enter(&mut self, identity: usize, f: impl FnOnce(&mut Self) -> Value) -> Value {
        if !self.path.insert(identity) {
            return Value::String(CIRCULAR_MARKER.to_string());
        }
        let value = f(self);
        self.path.remove(&identity);
        value
    }

    fn credential(&mut self, credential: &PublicKeyCredential, depth: usize) -> Value {
        let mut map = Map::new();
        map.insert(TYPE_TAG.into(), CREDENTIAL_TAG.into());
        map.insert("id".into(), credential.id.clone().into());
        map.insert("rawId".into(), encode_buffer(&credential.raw_id));
        map.insert("type".into(), credential.kind.clone().into());
        map.insert(
            "authenticatorAttachment".into(),
            credential
                .authenticator_attachment
                .clone()
                .map_or(Value::Null, Value::String),
        );
        map.insert(
            "clientExtensionResults".into(),
            self.value(&credential.client_extension_results, depth + 1),
        );
        map.insert("response".into(), encode_response(&credential.response));
        Value::Object(map)
    }
}

fn encode_response(response: &AuthenticatorResponse) -> Value {
    let mut map = Map::new();
    map.insert(
        "clientDataJSON".into(),
        encode_buffer(&response.client_data_json),
    );
    map.insert(
        "authenticatorData".into(),
        encode_buffer(&response.authenticator_data),
    );
    let optional = [
        ("signature", &response.signature),
        ("userHandle", &response.user_handle),
        ("attestationObject", &response.attestation_object),
    ];
    for (key, buffer) in optional {
        if let Some(buffer) = buffer {
            map.insert(key.into(), encode_buffer(buffer));
        }
    }
    Value::Object(map)
}

/// Tagged plain form of a buffer.
pub fn encode_buffer(buffer: &BinaryBuffer) -> Value {
    let mut map = Map::new();
    map.insert(TYPE_TAG.into(), buffer.kind.tag().into());
    map.insert("byteLength".into(), buffer.byte_length().into());
    map.insert(
        "data".into(),
        Value::Array(buffer.bytes.iter().map(|b| Value::from(*b)).collect()),
    );
    Value::Object(map)
}

/// Reconstruct a buffer from its tagged plain form.
///
/// Returns `None` when the value is not a well-formed buffer: unknown tag,
/// a byte outside `0..=255`, or a length that disagrees with the data.
pub fn decode_buffer(value: &Value) -> Option<BinaryBuffer> {
    let kind = BufferKind::from_tag(value.get(TYPE_TAG)?.as_str()?)?;
    let byte_length = usize::try_from(value.get("byteLength")?.as_u64()?).ok()?;
    let bytes = value
        .get("data")?
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()?;
    if bytes.len() != byte_length {
        return None;
    }
    Some(BinaryBuffer::new(kind, bytes))
}
