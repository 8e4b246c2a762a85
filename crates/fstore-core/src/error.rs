use crate::hash::{Digest, Namespace};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),
    #[error("Unresolved {namespace} reference: {digest}")]
    UnresolvedReference { namespace: Namespace, digest: Digest },
    #[error("Malformed reference: {0}")]
    MalformedReference(String),
    #[error("Digest collision in {namespace} table: {digest}")]
    DigestCollision { namespace: Namespace, digest: Digest },
    #[error("Corrupt dictionary: {0}")]
    CorruptDictionary(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
