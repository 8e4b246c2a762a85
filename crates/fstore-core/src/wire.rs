//! JSON wire form of compacted documents.
//!
//! - value reference: `{"$ref": "<digest hex>"}`
//! - key reference: `"$<digest hex>"`
//! - a literal key starting with `$` gets one more `$` in front, so no
//!   literal key or object can take either reference shape.
//!
//! The encoding is fixed for the lifetime of a dictionary.

use crate::error::{FsError, Result};
use crate::hash::Digest;
use crate::value::{Key, Object, Reference, Value};

pub const REF_SIGIL: char = '$';
pub const VALUE_REF_KEY: &str = "$ref";

/// Encode a (possibly compacted) tree as JSON.
pub fn encode(value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Value::Number(n.to_json()?),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(encode).collect::<Result<Vec<_>>>()?)
        }
        Value::Object(obj) => {
            let mut map = serde_json::Map::with_capacity(obj.len());
            for (k, v) in obj {
                map.insert(encode_key(k), encode(v)?);
            }
            serde_json::Value::Object(map)
        }
        Value::Ref(r) => {
            let mut map = serde_json::Map::with_capacity(1);
            map.insert(VALUE_REF_KEY.to_string(), serde_json::Value::String(r.digest().to_hex()));
            serde_json::Value::Object(map)
        }
    })
}

pub fn encode_key(key: &Key) -> String {
    match key {
        Key::Name(name) if name.starts_with(REF_SIGIL) => format!("{REF_SIGIL}{name}"),
        Key::Name(name) => name.clone(),
        Key::Ref(r) => format!("{REF_SIGIL}{}", r.digest()),
    }
}

/// Decode the wire form back into a tree with reference nodes.
pub fn decode(json: &serde_json::Value) -> Result<Value> {
    Ok(match json {
        serde_json::Value::Object(map) => {
            if map.len() == 1 {
                if let Some(target) = map.get(VALUE_REF_KEY) {
                    return decode_value_ref(target);
                }
            }
            let mut members = Vec::with_capacity(map.len());
            for (k, v) in map {
                members.push((decode_key(k)?, decode(v)?));
            }
            Value::Object(Object::from_members(members)?)
        }
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(decode).collect::<Result<Vec<_>>>()?)
        }
        scalar => Value::from_json(scalar)?,
    })
}

pub fn decode_key(raw: &str) -> Result<Key> {
    match raw.strip_prefix(REF_SIGIL) {
        Some(rest) if rest.starts_with(REF_SIGIL) => Ok(Key::Name(rest.to_string())),
        Some(rest) => {
            let digest: Digest = rest.parse()?;
            Ok(Key::Ref(Reference::new(digest)))
        }
        None => Ok(Key::Name(raw.to_string())),
    }
}

fn decode_value_ref(target: &serde_json::Value) -> Result<Value> {
    match target {
        serde_json::Value::String(hex) => Ok(Value::Ref(Reference::new(hex.parse()?))),
        other => Err(FsError::MalformedReference(format!(
            "{VALUE_REF_KEY} must hold a digest string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{hash_key, hash_scalar};
    use crate::value::Scalar;
    use serde_json::json;

    #[test]
    fn test_plain_document_unchanged() {
        let doc = json!({"ip": "1.1.1.1:59418", "tls": {"ciphers": ["a", "b"]}, "n": null});
        let v = Value::from_json(&doc).unwrap();
        assert_eq!(encode(&v).unwrap(), doc);
        assert_eq!(decode(&doc).unwrap(), v);
    }

    #[test]
    fn test_value_ref_shape() {
        let d = hash_scalar(&Scalar::String("X".into()));
        let v = Value::Array(vec![Value::Ref(Reference::new(d))]);
        let wire = encode(&v).unwrap();
        assert_eq!(wire, json!([{"$ref": d.to_hex()}]));
        assert_eq!(decode(&wire).unwrap(), v);
    }

    #[test]
    fn test_key_ref_shape() {
        let d = hash_key("k");
        let mut obj = Object::new();
        obj.insert(Key::Ref(Reference::new(d)), 1).unwrap();
        let v = Value::Object(obj);
        let wire = encode(&v).unwrap();
        assert_eq!(wire, json!({ format!("${}", d.to_hex()): 1 }));
        assert_eq!(decode(&wire).unwrap(), v);
    }

    #[test]
    fn test_dollar_keys_escaped() {
        let doc = json!({"$ref": "not-a-digest"});
        let v = Value::from_json(&doc).unwrap();
        let wire = encode(&v).unwrap();
        assert_eq!(wire, json!({"$$ref": "not-a-digest"}));
        let back = decode(&wire).unwrap();
        assert_eq!(back, v);
        assert_eq!(back.to_json().unwrap(), doc);
    }

    #[test]
    fn test_double_dollar_literal() {
        let doc = json!({"$$x": 1, "$": 2, "plain$": 3});
        let v = Value::from_json(&doc).unwrap();
        let wire = encode(&v).unwrap();
        assert_eq!(wire, json!({"$$$x": 1, "$$": 2, "plain$": 3}));
        assert_eq!(decode(&wire).unwrap().to_json().unwrap(), doc);
    }

    #[test]
    fn test_malformed_value_ref() {
        assert!(matches!(decode(&json!({"$ref": 5})), Err(FsError::MalformedReference(_))));
        assert!(matches!(decode(&json!({"$ref": "xyz"})), Err(FsError::MalformedReference(_))));
    }

    #[test]
    fn test_malformed_key_ref() {
        assert!(matches!(decode(&json!({"$nothex": 1})), Err(FsError::MalformedReference(_))));
        // a bare `$ref` key beside other members is not a value reference
        assert!(matches!(
            decode(&json!({"$ref": "a", "b": 1})),
            Err(FsError::MalformedReference(_))
        ));
    }

    #[test]
    fn test_decode_key_variants() {
        assert_eq!(decode_key("name").unwrap(), Key::from("name"));
        assert_eq!(decode_key("$$name").unwrap(), Key::from("$name"));
        let d = hash_key("z");
        assert_eq!(decode_key(&format!("${d}")).unwrap(), Key::Ref(Reference::new(d)));
    }
}
