use crate::dictionary::Dictionary;
use crate::snapshot::DictionarySnapshot;
use fstore_core::{Digest, FsError, Namespace, Result, Scalar};

/// Read side of a dictionary, as the expander needs it.
pub trait ReferenceResolver: Send + Sync {
    fn resolve_value(&self, digest: &Digest) -> Result<Scalar>;
    fn resolve_key(&self, digest: &Digest) -> Result<String>;
}

/// Receives the entries created by a store call so they can be written to
/// durable storage.
pub trait DictionarySink: Send + Sync {
    fn flush(&self, entries: &DictionarySnapshot) -> anyhow::Result<()>;
}

impl ReferenceResolver for Dictionary {
    fn resolve_value(&self, digest: &Digest) -> Result<Scalar> {
        self.get_value(digest)
    }

    fn resolve_key(&self, digest: &Digest) -> Result<String> {
        self.get_key(digest)
    }
}

impl ReferenceResolver for DictionarySnapshot {
    fn resolve_value(&self, digest: &Digest) -> Result<Scalar> {
        self.values
            .get(digest)
            .cloned()
            .ok_or(FsError::UnresolvedReference { namespace: Namespace::Value, digest: *digest })
    }

    fn resolve_key(&self, digest: &Digest) -> Result<String> {
        self.keys
            .get(digest)
            .cloned()
            .ok_or(FsError::UnresolvedReference { namespace: Namespace::Key, digest: *digest })
    }
}
