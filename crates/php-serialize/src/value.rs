//! Typed tree for PHP serialized values.

/// An array or object key.
///
/// PHP only allows integer and string keys; anything else is a decode error.
/// Integer keys keep their literal text, like [`Value::Int`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(String),
    Str(Vec<u8>),
}

/// A decoded PHP value.
///
/// Strings and class names are raw bytes because PHP strings are byte strings
/// and declared lengths count bytes, not characters.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `N;`
    Null,
    /// `b:0;` / `b:1;`
    Bool(bool),
    /// `i:<digits>;`
    ///
    /// Kept as written, so `i:007;` or `i:+5;` re-encode unchanged.
    Int(String),
    /// `d:<literal>;`
    ///
    /// The literal is kept as written so an untouched float re-encodes
    /// byte-for-byte regardless of the precision PHP used.
    Float(String),
    /// `s:<len>:"<bytes>";`
    Str(Vec<u8>),
    /// `a:<count>:{<key><value>...}`
    Array(Vec<(Key, Value)>),
    /// `O:<len>:"<class>":<count>:{<key><value>...}`
    Object {
        class: Vec<u8>,
        properties: Vec<(Key, Value)>,
    },
}

impl Value {
    /// Convenience constructor for string leaves.
    pub fn str(s: impl AsRef<[u8]>) -> Self {
        Value::Str(s.as_ref().to_vec())
    }

    pub fn int(n: i64) -> Self {
        Value::Int(n.to_string())
    }

    /// Name of the PHP type, used in log messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "double",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object { .. } => "object",
        }
    }
}

impl Key {
    pub fn str(s: impl AsRef<[u8]>) -> Self {
        Key::Str(s.as_ref().to_vec())
    }

    pub fn int(n: i64) -> Self {
        Key::Int(n.to_string())
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Int(i) => Value::Int(i),
            Key::Str(s) => Value::Str(s),
        }
    }
}
