//! Shape-level detection of serialized values.
//!
//! The detector only looks at the leading type tag and the overall textual
//! pattern, and never decodes. Anything that does not complete the pattern
//! end-to-end is plain text.
//!
//! Declared string lengths are not checked here. `s:10:"hello";` passes the
//! shape check even though the payload is five bytes; the strict decoder
//! rejects it later and the replacer leaves such values untouched.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

static SCALAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:b:[01];|i:[+-]?[0-9]+;|d:(?:[0-9.E+-]+|INF|-INF|NAN);)$")
        .expect("scalar pattern is valid")
});

static STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s-u)^s:[0-9]+:".*";$"#).expect("string pattern is valid"));

static ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s-u)^a:[0-9]+:\{.*\}$").expect("array pattern is valid"));

static OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s-u)^O:[0-9]+:"[^"]+":[0-9]+:\{.*\}$"#).expect("object pattern is valid")
});

/// Whether `data` has the textual shape of a serialized value.
///
/// ```
/// use php_serialize::is_serialized;
///
/// assert!(is_serialized(b"N;"));
/// assert!(is_serialized(br#"s:5:"hello";"#));
/// assert!(!is_serialized(b"plain text with s: in it"));
/// ```
pub fn is_serialized(data: &[u8]) -> bool {
    if data == b"N;" {
        return true;
    }
    if data.len() < 4 || data[1] != b':' {
        return false;
    }
    match data[data.len() - 1] {
        b';' | b'}' => {}
        _ => return false,
    }
    match data[0] {
        b'b' | b'i' | b'd' => SCALAR.is_match(data),
        b's' => STRING.is_match(data),
        b'a' => ARRAY.is_match(data),
        b'O' => OBJECT.is_match(data),
        _ => false,
    }
}
