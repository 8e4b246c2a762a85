//! Append-only digest -> content tables.

use crate::snapshot::DictionarySnapshot;
use fstore_core::{hash_key, hash_scalar, Digest, FsError, Namespace, Result, Scalar};
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;

/// Shared dictionary with separate key and value tables.
///
/// Entries are never overwritten or removed, so any reference handed out
/// stays resolvable for as long as the dictionary (or a snapshot of it)
/// exists.
#[derive(Debug, Default)]
pub struct Dictionary {
    values: RwLock<HashMap<Digest, Scalar>>,
    keys: RwLock<HashMap<Digest, String>>,
}

fn put_if_absent<T, Q>(
    table: &RwLock<HashMap<Digest, T>>,
    namespace: Namespace,
    digest: Digest,
    content: &Q,
) -> Result<bool>
where
    T: Borrow<Q>,
    Q: PartialEq + ToOwned<Owned = T> + ?Sized,
{
    let mut table = table.write();
    match table.get(&digest) {
        Some(existing) if Borrow::<Q>::borrow(existing) == content => Ok(false),
        Some(_) => Err(FsError::DigestCollision { namespace, digest }),
        None => {
            table.insert(digest, content.to_owned());
            Ok(true)
        }
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a dictionary from an exported snapshot, verifying every
    /// digest against its content.
    pub fn from_snapshot(snapshot: DictionarySnapshot) -> Result<Self> {
        let dict = Self::new();
        dict.import(snapshot)?;
        Ok(dict)
    }

    /// Insert a value entry. Returns `true` when the entry is new; an equal
    /// entry is a no-op and different content under the same digest is a
    /// collision.
    pub fn put_value_if_absent(&self, digest: Digest, scalar: &Scalar) -> Result<bool> {
        put_if_absent(&self.values, Namespace::Value, digest, scalar)
    }

    pub fn put_key_if_absent(&self, digest: Digest, key: &str) -> Result<bool> {
        put_if_absent(&self.keys, Namespace::Key, digest, key)
    }

    pub fn get_value(&self, digest: &Digest) -> Result<Scalar> {
        self.values
            .read()
            .get(digest)
            .cloned()
            .ok_or(FsError::UnresolvedReference { namespace: Namespace::Value, digest: *digest })
    }

    pub fn get_key(&self, digest: &Digest) -> Result<String> {
        self.keys
            .read()
            .get(digest)
            .cloned()
            .ok_or(FsError::UnresolvedReference { namespace: Namespace::Key, digest: *digest })
    }

    pub fn contains(&self, namespace: Namespace, digest: &Digest) -> bool {
        match namespace {
            Namespace::Key => self.keys.read().contains_key(digest),
            Namespace::Value => self.values.read().contains_key(digest),
        }
    }

    pub fn len(&self, namespace: Namespace) -> usize {
        match namespace {
            Namespace::Key => self.keys.read().len(),
            Namespace::Value => self.values.read().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len(Namespace::Key) == 0 && self.len(Namespace::Value) == 0
    }

    /// Copy both tables out in digest order.
    pub fn snapshot(&self) -> DictionarySnapshot {
        DictionarySnapshot {
            values: self
                .values
                .read()
                .iter()
                .map(|(d, s)| (*d, s.clone()))
                .collect(),
            keys: self
                .keys
                .read()
                .iter()
                .map(|(d, k)| (*d, k.clone()))
                .collect(),
        }
    }

    /// Merge verified snapshot entries into this dictionary. Returns the
    /// number of entries that were new.
    pub fn import(&self, snapshot: DictionarySnapshot) -> Result<usize> {
        let mut inserted = 0;
        for (digest, scalar) in &snapshot.values {
            if hash_scalar(scalar) != *digest {
                return Err(FsError::CorruptDictionary(format!(
                    "value entry {digest} does not match its content"
                )));
            }
            if self.put_value_if_absent(*digest, scalar)? {
                inserted += 1;
            }
        }
        for (digest, key) in &snapshot.keys {
            if hash_key(key) != *digest {
                return Err(FsError::CorruptDictionary(format!(
                    "key entry {digest} does not match its content"
                )));
            }
            if self.put_key_if_absent(*digest, key)? {
                inserted += 1;
            }
        }
        tracing::debug!(inserted, total = snapshot.len(), "imported dictionary snapshot");
        Ok(inserted)
    }
}
