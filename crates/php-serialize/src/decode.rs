//! Strict recursive-descent decoder.
//!
//! Unlike the shape check in [`crate::detect`], decoding verifies every
//! declared length and element count and requires the whole input to be
//! consumed. A value that decodes here can be re-encoded safely.

use crate::error::DecodeError;
use crate::value::{Key, Value};

type Result<T> = std::result::Result<T, DecodeError>;

/// Deepest array/object nesting [`decode`] accepts.
pub const MAX_DEPTH: usize = 512;

/// Decode a complete serialized value.
pub fn decode(input: &[u8]) -> Result<Value> {
    decode_with_depth(input, MAX_DEPTH)
}

/// Decode, allowing at most `max_depth` levels of array/object nesting.
pub fn decode_with_depth(input: &[u8], max_depth: usize) -> Result<Value> {
    let mut decoder = Decoder {
        input,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let value = decoder.value()?;
    if decoder.pos != input.len() {
        return Err(DecodeError::TrailingData {
            offset: decoder.pos,
        });
    }
    Ok(value)
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    fn value(&mut self) -> Result<Value> {
        let offset = self.pos;
        match self.next()? {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let at = self.pos;
                let flag = match self.next()? {
                    b'0' => false,
                    b'1' => true,
                    _ => return Err(DecodeError::InvalidNumber { offset: at }),
                };
                self.expect(b';')?;
                Ok(Value::Bool(flag))
            }
            b'i' => {
                self.expect(b':')?;
                let literal = self.integer(b';')?;
                Ok(Value::Int(literal))
            }
            b'd' => {
                self.expect(b':')?;
                let at = self.pos;
                let literal = self.until(b';')?;
                if !is_float_literal(literal) {
                    return Err(DecodeError::InvalidNumber { offset: at });
                }
                // is_float_literal only admits ASCII
                Ok(Value::Float(String::from_utf8_lossy(literal).into_owned()))
            }
            b's' => {
                self.expect(b':')?;
                let len = self.length(b':')?;
                self.expect(b'"')?;
                let bytes = self.take(len)?.to_vec();
                self.expect(b'"')?;
                self.expect(b';')?;
                Ok(Value::Str(bytes))
            }
            b'a' => {
                self.expect(b':')?;
                let count = self.length(b':')?;
                let entries = self.entries(count)?;
                Ok(Value::Array(entries))
            }
            b'O' => {
                self.expect(b':')?;
                let len = self.length(b':')?;
                self.expect(b'"')?;
                let class = self.take(len)?.to_vec();
                self.expect(b'"')?;
                self.expect(b':')?;
                let count = self.length(b':')?;
                let properties = self.entries(count)?;
                Ok(Value::Object { class, properties })
            }
            tag => Err(DecodeError::UnknownTag {
                tag: tag as char,
                offset,
            }),
        }
    }

    fn entries(&mut self, count: usize) -> Result<Vec<(Key, Value)>> {
        if self.depth >= self.max_depth {
            return Err(DecodeError::TooDeep {
                max_depth: self.max_depth,
                offset: self.pos,
            });
        }
        self.depth += 1;
        self.expect(b'{')?;
        // count comes from untrusted input
        let mut entries = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = self.key()?;
            let value = self.value()?;
            entries.push((key, value));
        }
        self.expect(b'}')?;
        self.depth -= 1;
        Ok(entries)
    }

    fn key(&mut self) -> Result<Key> {
        let offset = self.pos;
        match self.value()? {
            Value::Int(i) => Ok(Key::Int(i)),
            Value::Str(s) => Ok(Key::Str(s)),
            other => Err(DecodeError::InvalidKey {
                found: other.type_name(),
                offset,
            }),
        }
    }

    fn next(&mut self) -> Result<u8> {
        let byte = *self
            .input
            .get(self.pos)
            .ok_or(DecodeError::UnexpectedEnd { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        let offset = self.pos;
        let found = self.next()?;
        if found != expected {
            return Err(DecodeError::Expected {
                expected: expected as char,
                found: found as char,
                offset,
            });
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(DecodeError::UnexpectedEnd {
                offset: self.input.len(),
            })?;
        let input: &'a [u8] = self.input;
        let slice = &input[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Bytes up to (not including) `terminator`, consuming the terminator.
    fn until(&mut self, terminator: u8) -> Result<&'a [u8]> {
        let input: &'a [u8] = self.input;
        let rest = &input[self.pos..];
        let idx = rest
            .iter()
            .position(|b| *b == terminator)
            .ok_or(DecodeError::UnexpectedEnd {
                offset: self.input.len(),
            })?;
        let slice = &rest[..idx];
        self.pos += idx + 1;
        Ok(slice)
    }

    /// Integer literal as written, sign and leading zeros included.
    fn integer(&mut self, terminator: u8) -> Result<String> {
        let offset = self.pos;
        let digits = self.until(terminator)?;
        let unsigned = match digits.first() {
            Some(b'-') | Some(b'+') => &digits[1..],
            _ => digits,
        };
        if unsigned.is_empty() || !unsigned.iter().all(u8::is_ascii_digit) {
            return Err(DecodeError::InvalidNumber { offset });
        }
        // all ASCII after the check above
        Ok(String::from_utf8_lossy(digits).into_owned())
    }

    fn length(&mut self, terminator: u8) -> Result<usize> {
        let offset = self.pos;
        let digits = self.until(terminator)?;
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(DecodeError::InvalidNumber { offset });
        }
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(DecodeError::InvalidNumber { offset })
    }
}

fn is_float_literal(literal: &[u8]) -> bool {
    match literal {
        b"INF" | b"-INF" | b"NAN" => true,
        [] => false,
        _ => literal
            .iter()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'E' | b'e' | b'+' | b'-')),
    }
}
