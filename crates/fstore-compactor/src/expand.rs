//! Decode-side walk: resolves references back into literal content.

use fstore_core::{Key, Result, Rewrite, Value};
use fstore_dict::ReferenceResolver;

struct Expander<'a, R: ReferenceResolver + ?Sized> {
    resolver: &'a R,
}

impl<R: ReferenceResolver + ?Sized> Rewrite for Expander<'_, R> {
    fn rewrite_key(&mut self, key: &Key) -> Result<Key> {
        match key {
            Key::Ref(r) => Ok(Key::Name(self.resolver.resolve_key(&r.digest())?)),
            name => Ok(name.clone()),
        }
    }

    fn rewrite_leaf(&mut self, leaf: &Value) -> Result<Value> {
        match leaf {
            Value::Ref(r) => Ok(Value::from(self.resolver.resolve_value(&r.digest())?)),
            other => Ok(other.clone()),
        }
    }
}

/// Rebuild the original document from a compacted one.
///
/// `resolver` can be the engine's live dictionary or any equivalent one,
/// such as a dictionary rebuilt from a snapshot. Fails with
/// `UnresolvedReference` on a digest the resolver does not know.
pub fn expand<R: ReferenceResolver + ?Sized>(
    document: &Value,
    resolver: &R,
    max_depth: usize,
) -> Result<Value> {
    document.rewrite(&mut Expander { resolver }, max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fstore_core::{hash_key, hash_scalar, FsError, Namespace, Object, Reference, Scalar};
    use fstore_dict::{Dictionary, DictionarySnapshot};

    fn dict_with(value: &str, key: &str) -> Dictionary {
        let dict = Dictionary::new();
        let v = Scalar::String(value.into());
        dict.put_value_if_absent(hash_scalar(&v), &v).unwrap();
        dict.put_key_if_absent(hash_key(key), key).unwrap();
        dict
    }

    #[test]
    fn test_passthrough_without_refs() {
        let dict = Dictionary::new();
        let doc = Value::from_json(&serde_json::json!({"a": [1, "b", null, true]})).unwrap();
        assert_eq!(expand(&doc, &dict, 16).unwrap(), doc);
    }

    #[test]
    fn test_resolves_keys_and_values() {
        let dict = dict_with("h2", "http_version");
        let mut obj = Object::new();
        obj.insert(
            Key::Ref(Reference::new(hash_key("http_version"))),
            Value::Ref(Reference::new(hash_scalar(&Scalar::String("h2".into())))),
        )
        .unwrap();
        let out = expand(&Value::Object(obj), &dict, 16).unwrap();
        assert_eq!(out.to_json().unwrap(), serde_json::json!({"http_version": "h2"}));
    }

    #[test]
    fn test_unresolved_value() {
        let dict = Dictionary::new();
        let d = hash_key("ghost");
        let doc = Value::Array(vec![Value::Ref(Reference::new(d))]);
        match expand(&doc, &dict, 16) {
            Err(FsError::UnresolvedReference { namespace, digest }) => {
                assert_eq!(namespace, Namespace::Value);
                assert_eq!(digest, d);
            }
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_key() {
        let dict = Dictionary::new();
        let mut obj = Object::new();
        obj.insert(Key::Ref(Reference::new(hash_key("ghost"))), 1).unwrap();
        assert!(matches!(
            expand(&Value::Object(obj), &dict, 16),
            Err(FsError::UnresolvedReference { namespace: Namespace::Key, .. })
        ));
    }

    #[test]
    fn test_expanded_duplicate_key_rejected() {
        let dict = dict_with("unused", "a");
        let mut obj = Object::new();
        obj.insert("a", 1).unwrap();
        obj.insert(Key::Ref(Reference::new(hash_key("a"))), 2).unwrap();
        assert!(matches!(
            expand(&Value::Object(obj), &dict, 16),
            Err(FsError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn test_snapshot_as_resolver() {
        let snap: DictionarySnapshot = dict_with("x", "k").snapshot();
        let doc = Value::Ref(Reference::new(hash_scalar(&Scalar::String("x".into()))));
        assert_eq!(expand(&doc, &snap, 4).unwrap(), Value::from("x"));
    }
}
