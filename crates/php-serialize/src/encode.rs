//! Serializer for [`Value`] trees.

use crate::value::{Key, Value};

/// Encode a value, recomputing every string length and element count.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"N;"),
        Value::Bool(flag) => out.extend_from_slice(if *flag { b"b:1;" } else { b"b:0;" }),
        Value::Int(literal) => write_int(out, literal),
        Value::Float(literal) => out.extend_from_slice(format!("d:{literal};").as_bytes()),
        Value::Str(bytes) => write_string(out, bytes),
        Value::Array(entries) => {
            out.extend_from_slice(format!("a:{}:", entries.len()).as_bytes());
            write_entries(out, entries);
        }
        Value::Object { class, properties } => {
            out.extend_from_slice(format!("O:{}:\"", class.len()).as_bytes());
            out.extend_from_slice(class);
            out.extend_from_slice(format!("\":{}:", properties.len()).as_bytes());
            write_entries(out, properties);
        }
    }
}

fn write_entries(out: &mut Vec<u8>, entries: &[(Key, Value)]) {
    out.push(b'{');
    for (key, value) in entries {
        match key {
            Key::Int(literal) => write_int(out, literal),
            Key::Str(bytes) => write_string(out, bytes),
        }
        write_value(out, value);
    }
    out.push(b'}');
}

fn write_int(out: &mut Vec<u8>, literal: &str) {
    out.extend_from_slice(b"i:");
    out.extend_from_slice(literal.as_bytes());
    out.push(b';');
}

fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(format!("s:{}:\"", bytes.len()).as_bytes());
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\";");
}
