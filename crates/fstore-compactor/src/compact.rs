//! Store-side walk: replaces promoted keys and scalars with references.

use crate::stats::{CompactStats, KEY_REF_WIRE_LEN, VALUE_REF_WIRE_LEN};
use fstore_core::{
    hash_key, hash_scalar, Digest, FsError, Key, Namespace, Reference, Result, Rewrite, Value,
};
use fstore_dict::{Dictionary, DictionarySnapshot, Observation, OccurrenceTracker};

pub(crate) struct Compactor<'a> {
    tracker: &'a OccurrenceTracker,
    dictionary: &'a Dictionary,
    key_compression: bool,
    debug: bool,
    new_entries: DictionarySnapshot,
    stats: CompactStats,
}

impl<'a> Compactor<'a> {
    pub(crate) fn new(
        tracker: &'a OccurrenceTracker,
        dictionary: &'a Dictionary,
        key_compression: bool,
        debug: bool,
    ) -> Self {
        Self {
            tracker,
            dictionary,
            key_compression,
            debug,
            new_entries: DictionarySnapshot::new(),
            stats: CompactStats::default(),
        }
    }

    pub(crate) fn finish(self) -> (DictionarySnapshot, CompactStats) {
        (self.new_entries, self.stats)
    }

    fn log_promotion(&self, namespace: Namespace, digest: Digest, inserted: bool) {
        if self.debug {
            tracing::debug!(%namespace, %digest, inserted, "promoted");
        } else {
            tracing::trace!(%namespace, %digest, inserted, "promoted");
        }
    }
}

impl Rewrite for Compactor<'_> {
    fn rewrite_key(&mut self, key: &Key) -> Result<Key> {
        let name = match key {
            Key::Name(name) => name,
            Key::Ref(r) => {
                return Err(FsError::UnsupportedShape(format!(
                    "key reference {r} in uncompacted input"
                )))
            }
        };
        if !self.key_compression {
            self.stats.keys_inline += 1;
            return Ok(key.clone());
        }

        let digest = hash_key(name);
        let dictionary = self.dictionary;
        let mut inserted = false;
        let observation = self.tracker.observe(Namespace::Key, digest, || {
            inserted = dictionary.put_key_if_absent(digest, name)?;
            Ok(())
        })?;

        match observation {
            Observation::Inline { .. } => {
                self.stats.keys_inline += 1;
                return Ok(key.clone());
            }
            Observation::Promote => {
                self.stats.keys_promoted += 1;
                if inserted {
                    self.new_entries.keys.insert(digest, name.clone());
                }
                self.log_promotion(Namespace::Key, digest, inserted);
            }
            Observation::Reference => {}
        }
        self.stats.keys_referenced += 1;
        self.stats.bytes_replaced += name.len() as u64 + 2;
        self.stats.reference_bytes += KEY_REF_WIRE_LEN;
        Ok(Key::Ref(Reference::new(digest)))
    }

    fn rewrite_leaf(&mut self, leaf: &Value) -> Result<Value> {
        let scalar = match leaf {
            Value::Null => {
                self.stats.nulls += 1;
                return Ok(Value::Null);
            }
            Value::Ref(r) => {
                return Err(FsError::UnsupportedShape(format!(
                    "reference {r} in uncompacted input"
                )))
            }
            other => other.to_scalar().ok_or_else(|| {
                FsError::UnsupportedShape("container passed as leaf".into())
            })?,
        };

        let digest = hash_scalar(&scalar);
        let dictionary = self.dictionary;
        let mut inserted = false;
        let observation = self.tracker.observe(Namespace::Value, digest, || {
            inserted = dictionary.put_value_if_absent(digest, &scalar)?;
            Ok(())
        })?;

        match observation {
            Observation::Inline { .. } => {
                self.stats.values_inline += 1;
                return Ok(Value::from(scalar));
            }
            Observation::Promote => {
                self.stats.values_promoted += 1;
                self.log_promotion(Namespace::Value, digest, inserted);
            }
            Observation::Reference => {}
        }
        self.stats.values_referenced += 1;
        self.stats.bytes_replaced += scalar.encoded_len() as u64;
        self.stats.reference_bytes += VALUE_REF_WIRE_LEN;
        if inserted {
            self.new_entries.values.insert(digest, scalar);
        }
        Ok(Value::Ref(Reference::new(digest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fstore_core::Scalar;
    use serde_json::json;

    fn run(
        tracker: &OccurrenceTracker,
        dict: &Dictionary,
        keys: bool,
        doc: serde_json::Value,
    ) -> (Value, DictionarySnapshot, CompactStats) {
        let mut compactor = Compactor::new(tracker, dict, keys, false);
        let out = Value::from_json(&doc).unwrap().rewrite(&mut compactor, 64).unwrap();
        let (entries, stats) = compactor.finish();
        (out, entries, stats)
    }

    #[test]
    fn test_nulls_never_tracked() {
        let tracker = OccurrenceTracker::new(1).unwrap();
        let dict = Dictionary::new();
        let (out, entries, stats) = run(&tracker, &dict, false, json!([null, null, null]));
        assert_eq!(out, Value::Array(vec![Value::Null; 3]));
        assert!(entries.is_empty());
        assert_eq!(stats.nulls, 3);
        assert_eq!(tracker.tracked(Namespace::Value), 0);
    }

    #[test]
    fn test_entries_only_for_new_inserts() {
        let tracker = OccurrenceTracker::new(1).unwrap();
        let dict = Dictionary::new();
        let x = Scalar::String("X".into());
        dict.put_value_if_absent(hash_scalar(&x), &x).unwrap();

        let (_, entries, stats) = run(&tracker, &dict, false, json!(["X", "Y"]));
        assert_eq!(stats.values_promoted, 2);
        assert_eq!(entries.values.len(), 1);
        assert!(entries.values.contains_key(&hash_scalar(&Scalar::String("Y".into()))));
    }

    #[test]
    fn test_rejects_compacted_input() {
        let tracker = OccurrenceTracker::new(1).unwrap();
        let dict = Dictionary::new();
        let mut compactor = Compactor::new(&tracker, &dict, true, false);
        let doc = Value::Array(vec![Value::Ref(Reference::new(hash_key("x")))]);
        assert!(matches!(doc.rewrite(&mut compactor, 8), Err(FsError::UnsupportedShape(_))));
    }

    #[test]
    fn test_byte_accounting() {
        let tracker = OccurrenceTracker::new(1).unwrap();
        let dict = Dictionary::new();
        let (_, _, stats) = run(&tracker, &dict, true, json!({"abc": "hello"}));
        assert_eq!(stats.bytes_replaced, 5 + 7);
        assert_eq!(stats.reference_bytes, KEY_REF_WIRE_LEN + VALUE_REF_WIRE_LEN);
    }
}
