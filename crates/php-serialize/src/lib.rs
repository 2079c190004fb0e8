//! PHP serialized-data handling for wp-dbtool.
//!
//! WordPress stores options, widget settings and post meta using PHP's
//! `serialize()` format. Every string in that format carries its byte length,
//! so a naive substring replacement inside a serialized blob produces a value
//! PHP can no longer read. This crate provides the pieces needed to edit such
//! values safely.
//!
//! # Structure
//!
//! - `value`: the typed value tree (`Value`, `Key`)
//! - `decode`: strict recursive-descent parser (`decode`)
//! - `encode`: serializer that recomputes every length prefix (`encode`)
//! - `detect`: conservative shape check used before any decode (`is_serialized`)
//! - `replace`: substring replacement over string leaves (`replace_serialized`)
//!
//! # Example
//!
//! ```
//! use php_serialize::{replace_serialized, Replaced};
//!
//! let out = replace_serialized(br#"s:3:"abc";"#, b"abc", b"wxyz");
//! assert_eq!(out, Replaced::Changed(br#"s:4:"wxyz";"#.to_vec()));
//! ```

pub mod decode;
pub mod detect;
pub mod encode;
pub mod error;
pub mod replace;
pub mod value;

#[cfg(test)]
mod tests;

pub use decode::{decode, decode_with_depth, MAX_DEPTH};
pub use detect::is_serialized;
pub use encode::encode;
pub use error::DecodeError;
pub use replace::{contains_bytes, replace_bytes, replace_serialized, Replaced};
pub use value::{Key, Value};
