//! Unit tests for the php-serialize crate.

use crate::{
    decode, decode_with_depth, encode, replace_bytes, replace_serialized, DecodeError, Key,
    Replaced, Value, MAX_DEPTH,
};

// ============================================================================
// Decoder Tests
// ============================================================================

#[test]
fn test_decode_scalars() {
    assert_eq!(decode(b"N;").unwrap(), Value::Null);
    assert_eq!(decode(b"b:1;").unwrap(), Value::Bool(true));
    assert_eq!(decode(b"i:-12;").unwrap(), Value::int(-12));
    assert_eq!(decode(b"d:0.1;").unwrap(), Value::Float("0.1".to_string()));
    assert_eq!(decode(br#"s:5:"hello";"#).unwrap(), Value::str("hello"));
}

#[test]
fn test_decode_counts_bytes_not_chars() {
    // "héllo" is six bytes in UTF-8
    let value = decode("s:6:\"héllo\";".as_bytes()).unwrap();
    assert_eq!(value, Value::str("héllo"));
    assert!(decode("s:5:\"héllo\";".as_bytes()).is_err());
}

#[test]
fn test_decode_string_containing_terminators() {
    let value = decode(br#"s:6:"a";b:{";"#).unwrap();
    assert_eq!(value, Value::str(r#"a";b:{"#));
}

#[test]
fn test_decode_nested_array() {
    let input = br#"a:2:{s:4:"name";s:4:"site";s:4:"urls";a:1:{i:0;s:18:"http://example.com";}}"#;
    let value = decode(input).unwrap();
    assert_eq!(
        value,
        Value::Array(vec![
            (Key::str("name"), Value::str("site")),
            (
                Key::str("urls"),
                Value::Array(vec![(Key::int(0), Value::str("http://example.com"))])
            ),
        ])
    );
}

#[test]
fn test_decode_object() {
    let input = br#"O:8:"stdClass":2:{s:3:"foo";s:3:"bar";s:3:"num";i:3;}"#;
    let value = decode(input).unwrap();
    assert_eq!(
        value,
        Value::Object {
            class: b"stdClass".to_vec(),
            properties: vec![
                (Key::str("foo"), Value::str("bar")),
                (Key::str("num"), Value::int(3)),
            ],
        }
    );
}

#[test]
fn test_decode_keeps_integer_literals() {
    assert_eq!(decode(b"i:007;").unwrap(), Value::Int("007".to_string()));
    assert_eq!(decode(b"i:+5;").unwrap(), Value::Int("+5".to_string()));
    for input in [&b"i:+5;"[..], b"a:1:{i:01;i:-0;}"] {
        assert_eq!(encode(&decode(input).unwrap()), input.to_vec());
    }
}

fn nested_arrays(levels: usize) -> Vec<u8> {
    let mut out = b"a:1:{i:0;".repeat(levels);
    out.extend_from_slice(b"N;");
    out.extend_from_slice(&b"}".repeat(levels));
    out
}

#[test]
fn test_decode_depth_limit() {
    assert!(decode(&nested_arrays(MAX_DEPTH)).is_ok());
    assert!(matches!(
        decode(&nested_arrays(MAX_DEPTH + 1)),
        Err(DecodeError::TooDeep { .. })
    ));
    assert!(matches!(
        decode_with_depth(&nested_arrays(3), 2),
        Err(DecodeError::TooDeep { max_depth: 2, .. })
    ));
}

#[test]
fn test_decode_rejects_malformed() {
    assert!(matches!(
        decode(br#"s:10:"hello";"#),
        Err(DecodeError::UnexpectedEnd { .. })
    ));
    assert!(matches!(
        decode(br#"s:3:"hello";"#),
        Err(DecodeError::Expected { .. })
    ));
    assert!(matches!(
        decode(b"i:1;i:2;"),
        Err(DecodeError::TrailingData { offset: 4 })
    ));
    assert!(matches!(
        decode(b"x:1;"),
        Err(DecodeError::UnknownTag { tag: 'x', .. })
    ));
    assert!(matches!(
        decode(b"a:1:{a:0:{}i:1;}"),
        Err(DecodeError::InvalidKey { found: "array", .. })
    ));
    assert!(decode(b"a:2:{i:0;i:1;}").is_err());
    assert!(decode(b"i:;").is_err());
    assert!(decode(b"").is_err());
}

// ============================================================================
// Encoder Tests
// ============================================================================

#[test]
fn test_encode_recomputes_lengths() {
    let value = Value::Array(vec![(Key::str("k"), Value::str("héllo"))]);
    assert_eq!(encode(&value), "a:1:{s:1:\"k\";s:6:\"héllo\";}".as_bytes());
}

#[test]
fn test_encode_preserves_float_literal() {
    let input = b"a:2:{i:0;d:0.10000000000000001;i:1;d:1.0E+25;}";
    assert_eq!(encode(&decode(input).unwrap()), input.to_vec());
}

// ============================================================================
// Replacer Tests
// ============================================================================

#[test]
fn test_replace_simple_string() {
    let out = replace_serialized(br#"s:3:"abc";"#, b"abc", b"xyz");
    assert_eq!(out, Replaced::Changed(br#"s:3:"xyz";"#.to_vec()));
}

#[test]
fn test_replace_updates_length_prefix() {
    let input = br#"a:1:{s:4:"home";s:18:"http://old.example";}"#;
    let out = replace_serialized(input, b"old.example", b"new-site.example.org");
    assert_eq!(
        out,
        Replaced::Changed(br#"a:1:{s:4:"home";s:27:"http://new-site.example.org";}"#.to_vec())
    );
}

#[test]
fn test_replace_in_keys() {
    let input = br#"a:1:{s:7:"old_key";i:1;}"#;
    let out = replace_serialized(input, b"old", b"new");
    assert_eq!(out, Replaced::Changed(br#"a:1:{s:7:"new_key";i:1;}"#.to_vec()));
}

#[test]
fn test_replace_skips_non_string_leaves() {
    let input = b"a:2:{i:123;i:123;i:1;d:123.5;}";
    assert_eq!(replace_serialized(input, b"123", b"999"), Replaced::Unchanged);
}

#[test]
fn test_replace_leaves_class_name_alone() {
    let input = br#"O:7:"Old_Cls":1:{s:1:"a";s:3:"Old";}"#;
    let out = replace_serialized(input, b"Old", b"New");
    assert_eq!(
        out,
        Replaced::Changed(br#"O:7:"Old_Cls":1:{s:1:"a";s:3:"New";}"#.to_vec())
    );
}

#[test]
fn test_replace_malformed_is_not_serialized() {
    assert_eq!(
        replace_serialized(br#"s:10:"hello";"#, b"hello", b"bye"),
        Replaced::NotSerialized
    );
    assert_eq!(
        replace_serialized(b"a:1:{i:0;s:3:\"abc\";", b"abc", b"x"),
        Replaced::NotSerialized
    );
}

#[test]
fn test_replace_without_match_is_unchanged() {
    let input = br#"a:1:{i:0;s:3:"abc";}"#;
    assert_eq!(replace_serialized(input, b"zzz", b"y"), Replaced::Unchanged);
    assert_eq!(replace_serialized(input, b"", b"y"), Replaced::Unchanged);
}

#[test]
fn test_replace_double_serialized() {
    // A string leaf holding another serialized array, as widget options often do.
    let inner = br#"a:1:{s:3:"url";s:14:"http://old.com";}"#;
    let outer = format!(
        "a:1:{{s:4:\"data\";s:{}:\"{}\";}}",
        inner.len(),
        String::from_utf8_lossy(inner)
    );
    let out = replace_serialized(outer.as_bytes(), b"old.com", b"brand-new.com");

    let new_inner = br#"a:1:{s:3:"url";s:20:"http://brand-new.com";}"#;
    let expected = format!(
        "a:1:{{s:4:\"data\";s:{}:\"{}\";}}",
        new_inner.len(),
        String::from_utf8_lossy(new_inner)
    );
    assert_eq!(out, Replaced::Changed(expected.into_bytes()));
}

#[test]
fn test_replace_leaves_integer_literals_as_written() {
    let input = br#"a:2:{i:0;s:3:"abc";i:1;i:007;}"#;
    assert_eq!(
        replace_serialized(input, b"abc", b"xyz"),
        Replaced::Changed(br#"a:2:{i:0;s:3:"xyz";i:1;i:007;}"#.to_vec())
    );
}

#[test]
fn test_replace_very_deep_value_is_not_serialized() {
    let mut input = b"a:1:{i:0;".repeat(30_000);
    input.extend_from_slice(br#"s:3:"abc";"#);
    input.extend_from_slice(&b"}".repeat(30_000));
    assert_eq!(
        replace_serialized(&input, b"abc", b"xyz"),
        Replaced::NotSerialized
    );
}

#[test]
fn test_replace_deeply_double_serialized_strings() {
    let mut value = br#"s:3:"abc";"#.to_vec();
    for _ in 0..2_000 {
        value = encode(&Value::Str(value));
    }
    match replace_serialized(&value, b"abc", b"xyz") {
        Replaced::Changed(out) => {
            assert!(decode(&out).is_ok());
            assert_eq!(out.len(), value.len());
        }
        other => panic!("expected a change, got {other:?}"),
    }
}

#[test]
fn test_replace_double_serialized_integer_only_match() {
    let inner = b"a:1:{i:0;i:777;}";
    let outer = format!("s:{}:\"{}\";", inner.len(), String::from_utf8_lossy(inner));
    assert_eq!(
        replace_serialized(outer.as_bytes(), b"777", b"1"),
        Replaced::Unchanged
    );
}

#[test]
fn test_replace_multibyte() {
    let out = replace_serialized(br#"s:5:"hello";"#, b"hello", "héllo wörld".as_bytes());
    assert_eq!(
        out,
        Replaced::Changed("s:13:\"héllo wörld\";".as_bytes().to_vec())
    );
}

#[test]
fn test_replace_bytes_all_occurrences() {
    assert_eq!(replace_bytes(b"aXbXc", b"X", b"--"), b"a--b--c".to_vec());
    assert_eq!(replace_bytes(b"aaaa", b"aa", b"b"), b"bb".to_vec());
    assert_eq!(replace_bytes(b"abc", b"", b"x"), b"abc".to_vec());
    assert_eq!(replace_bytes(b"abc", b"zz", b"x"), b"abc".to_vec());
}
