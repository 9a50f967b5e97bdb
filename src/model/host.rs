//! Host values: what a page passes to and gets back from the credentials API.
//!
//! Arrays and objects are shared, interior-mutable handles so a page can build
//! self-referential structures. Identity is the allocation, not the contents.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A value living in the page's execution context.
#[derive(Debug, Clone)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(HostArray),
    Object(HostObject),
    Buffer(BinaryBuffer),
    /// A callable; only its name is known.
    Function(String),
    /// The typed return value of a ceremony.
    Credential(Rc<PublicKeyCredential>),
    /// A property getter, evaluated when read. May fail.
    Accessor(Accessor),
}

impl HostValue {
    /// Build an object from key/value pairs, in order.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, HostValue)>) -> Self {
        let object = HostObject::new();
        for (key, value) in entries {
            object.set(key, value);
        }
        Self::Object(object)
    }

    pub fn array(items: impl IntoIterator<Item = HostValue>) -> Self {
        Self::Array(HostArray::from_items(items))
    }

    pub fn buffer(kind: BufferKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Buffer(BinaryBuffer::new(kind, bytes))
    }

    pub fn credential(credential: PublicKeyCredential) -> Self {
        Self::Credential(Rc::new(credential))
    }

    /// A getter that runs `f` each time the property is read.
    pub fn accessor(f: impl Fn() -> Result<HostValue, String> + 'static) -> Self {
        Self::Accessor(Accessor(Rc::new(f)))
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for HostValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

/// A shared, growable array.
#[derive(Clone, Default)]
pub struct HostArray(Rc<RefCell<Vec<HostValue>>>);

impl HostArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = HostValue>) -> Self {
        Self(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn push(&self, value: HostValue) {
        self.0.borrow_mut().push(value);
    }

    /// A snapshot of the items, so callers never hold the borrow.
    pub fn items(&self) -> Vec<HostValue> {
        self.0.borrow().clone()
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for HostArray {
    // Contents may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostArray(len={})", self.0.borrow().len())
    }
}

/// A shared object with string keys in insertion order.
#[derive(Clone, Default)]
pub struct HostObject(Rc<RefCell<Vec<(String, HostValue)>>>);

impl HostObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing an existing one in place.
    pub fn set(&self, key: impl Into<String>, value: HostValue) {
        let key = key.into();
        let mut entries = self.0.borrow_mut();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<HostValue> {
        self.0
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// A snapshot of the properties, so callers never hold the borrow.
    pub fn entries(&self) -> Vec<(String, HostValue)> {
        self.0.borrow().clone()
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.0.borrow().iter().map(|(k, _)| k.clone()).collect();
        write!(f, "HostObject({keys:?})")
    }
}

/// A lazily evaluated property.
#[derive(Clone)]
pub struct Accessor(Rc<dyn Fn() -> Result<HostValue, String>>);

impl Accessor {
    pub fn read(&self) -> Result<HostValue, String> {
        (self.0)()
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor(..)")
    }
}

/// Which binary view a buffer was handed over as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    ArrayBuffer,
    Uint8Array,
    Int8Array,
    Uint8ClampedArray,
    Uint16Array,
    Int16Array,
    Uint32Array,
    Int32Array,
    Float32Array,
    Float64Array,
    DataView,
}

impl BufferKind {
    const ALL: [BufferKind; 11] = [
        Self::ArrayBuffer,
        Self::Uint8Array,
        Self::Int8Array,
        Self::Uint8ClampedArray,
        Self::Uint16Array,
        Self::Int16Array,
        Self::Uint32Array,
        Self::Int32Array,
        Self::Float32Array,
        Self::Float64Array,
        Self::DataView,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::ArrayBuffer => "ArrayBuffer",
            Self::Uint8Array => "Uint8Array",
            Self::Int8Array => "Int8Array",
            Self::Uint8ClampedArray => "Uint8ClampedArray",
            Self::Uint16Array => "Uint16Array",
            Self::Int16Array => "Int16Array",
            Self::Uint32Array => "Uint32Array",
            Self::Int32Array => "Int32Array",
            Self::Float32Array => "Float32Array",
            Self::Float64Array => "Float64Array",
            Self::DataView => "DataView",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

/// Raw bytes plus the view they arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBuffer {
    pub kind: BufferKind,
    pub bytes: Vec<u8>,
}

impl BinaryBuffer {
    pub fn new(kind: BufferKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }
}

/// The typed result of a ceremony.
#[derive(Debug, Clone)]
pub struct PublicKeyCredential {
    /// Base64url credential id.
    pub id: String,
    pub raw_id: BinaryBuffer,
    /// Always `"public-key"` for WebAuthn.
    pub kind: String,
    pub authenticator_attachment: Option<String>,
    pub client_extension_results: HostValue,
    pub response: AuthenticatorResponse,
}

/// Assertion or attestation response.
///
/// The two shapes differ only in which optional fields are present:
/// assertions carry `signature` and `user_handle`, attestations carry
/// `attestation_object`.
#[derive(Debug, Clone)]
pub struct AuthenticatorResponse {
    pub client_data_json: BinaryBuffer,
    pub authenticator_data: BinaryBuffer,
    pub signature: Option<BinaryBuffer>,
    pub user_handle: Option<BinaryBuffer>,
    pub attestation_object: Option<BinaryBuffer>,
}
