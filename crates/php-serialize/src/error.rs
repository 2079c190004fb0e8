//! Error types for serialized-data decoding.

use thiserror::Error;

/// Reasons a byte sequence is not a well-formed serialized value.
///
/// Callers in wp-dbtool never surface these to users: a value that fails to
/// decode is treated as plain text and left alone by the serialized path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before the value was complete.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEnd { offset: usize },

    /// A specific byte was required but something else was found.
    #[error("expected '{expected}' at offset {offset}, found '{found}'")]
    Expected {
        expected: char,
        found: char,
        offset: usize,
    },

    /// The leading type tag is not one of `N b i d s a O`.
    #[error("unknown type tag '{tag}' at offset {offset}")]
    UnknownTag { tag: char, offset: usize },

    /// A length, count or integer field could not be parsed.
    #[error("invalid number at offset {offset}")]
    InvalidNumber { offset: usize },

    /// Keys must be integers or strings.
    #[error("invalid {found} key at offset {offset}")]
    InvalidKey { found: &'static str, offset: usize },

    /// Arrays or objects nested deeper than the decoder allows.
    #[error("nesting deeper than {max_depth} levels at offset {offset}")]
    TooDeep { max_depth: usize, offset: usize },

    /// Bytes remain after a complete value.
    #[error("trailing data at offset {offset}")]
    TrailingData { offset: usize },
}
