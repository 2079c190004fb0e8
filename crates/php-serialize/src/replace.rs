//! Search/replace over serialized values.

use crate::decode::{decode_with_depth, MAX_DEPTH};
use crate::detect::is_serialized;
use crate::encode::encode;
use crate::value::{Key, Value};
use tracing::debug;

/// Outcome of [`replace_serialized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replaced {
    /// The value decoded but no string leaf or key matched.
    Unchanged,
    /// Re-encoded value with corrected length prefixes.
    Changed(Vec<u8>),
    /// The input did not decode as a serialized value.
    NotSerialized,
}

/// Replace `search` with `replacement` inside every string leaf and string key
/// of a serialized value.
///
/// Integers, floats, booleans, nulls and class names are never touched. A
/// string leaf that itself holds a serialized value is edited recursively so
/// its inner lengths stay correct. Input that fails to decode is returned as
/// [`Replaced::NotSerialized`].
pub fn replace_serialized(input: &[u8], search: &[u8], replacement: &[u8]) -> Replaced {
    if search.is_empty() {
        return Replaced::Unchanged;
    }
    let mut value = match decode_with_depth(input, MAX_DEPTH) {
        Ok(value) => value,
        Err(e) => {
            debug!("Value does not decode as serialized data: {e}");
            return Replaced::NotSerialized;
        }
    };
    let mut replacer = Replacer {
        search,
        replacement,
        depth: 0,
    };
    if !replacer.value(&mut value) {
        return Replaced::Unchanged;
    }
    let encoded = encode(&value);
    if encoded == input {
        Replaced::Unchanged
    } else {
        Replaced::Changed(encoded)
    }
}

/// Walks a decoded tree. `depth` counts array/object levels and nested
/// serialized strings together and never exceeds [`MAX_DEPTH`].
struct Replacer<'a> {
    search: &'a [u8],
    replacement: &'a [u8],
    depth: usize,
}

impl Replacer<'_> {
    fn value(&mut self, value: &mut Value) -> bool {
        match value {
            Value::Str(bytes) => self.string(bytes),
            Value::Array(entries) | Value::Object { properties: entries, .. } => {
                self.depth += 1;
                let mut changed = false;
                for (key, child) in entries.iter_mut() {
                    if let Key::Str(bytes) = key {
                        changed |= self.string(bytes);
                    }
                    changed |= self.value(child);
                }
                self.depth -= 1;
                changed
            }
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => false,
        }
    }

    fn string(&mut self, bytes: &mut Vec<u8>) -> bool {
        if !contains_bytes(bytes, self.search) {
            return false;
        }
        // A serialized string inside a string is one more level.
        if self.depth < MAX_DEPTH && is_serialized(bytes) {
            self.depth += 1;
            let nested = decode_with_depth(bytes, MAX_DEPTH - self.depth).map(|mut inner| {
                let changed = self.value(&mut inner);
                (changed, inner)
            });
            self.depth -= 1;
            if let Ok((changed, inner)) = nested {
                if changed {
                    *bytes = encode(&inner);
                }
                return changed;
            }
        }
        *bytes = replace_bytes(bytes, self.search, self.replacement);
        true
    }
}

/// Whether `haystack` contains `needle`. An empty needle never matches.
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Replace every non-overlapping occurrence of `search`, scanning left to right.
///
/// Behaves like `str::replace` on byte strings. An empty `search` returns the
/// input unchanged.
pub fn replace_bytes(haystack: &[u8], search: &[u8], replacement: &[u8]) -> Vec<u8> {
    if search.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(search) {
            out.extend_from_slice(replacement);
            i += search.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}
