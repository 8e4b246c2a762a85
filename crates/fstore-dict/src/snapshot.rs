use fstore_core::{Digest, Namespace, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable copy of dictionary tables, ordered by digest.
///
/// Used both for full exports and for the entries created by a single
/// store call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionarySnapshot {
    #[serde(default)]
    pub values: BTreeMap<Digest, Scalar>,
    #[serde(default)]
    pub keys: BTreeMap<Digest, String>,
}

impl DictionarySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len() + self.keys.len()
    }

    pub fn len_of(&self, namespace: Namespace) -> usize {
        match namespace {
            Namespace::Key => self.keys.len(),
            Namespace::Value => self.values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.keys.is_empty()
    }

    /// Fold another snapshot into this one. Entries already present are
    /// left as they are.
    pub fn extend(&mut self, other: DictionarySnapshot) {
        for (digest, scalar) in other.values {
            self.values.entry(digest).or_insert(scalar);
        }
        for (digest, key) in other.keys {
            self.keys.entry(digest).or_insert(key);
        }
    }
}
