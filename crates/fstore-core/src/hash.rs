//! Canonical content hashing for scalars and key names.
//!
//! Every tracked piece of content is reduced to a type-tagged byte string
//! and hashed with SHA-256, truncated to 128 bits. There is no seed: the
//! same content yields the same digest in every process, which is what lets
//! a persisted dictionary be reloaded and keep resolving old references.

use crate::error::{FsError, Result};
use crate::value::Scalar;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest width in bytes.
pub const DIGEST_LEN: usize = 16;

const TAG_BOOL: u8 = b'b';
const TAG_NUMBER: u8 = b'n';
const TAG_STRING: u8 = b's';

/// Dictionary partition. A string's statistics as an object key are kept
/// apart from its statistics as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Key,
    Value,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-width content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Leading eight bytes as an integer, for shard selection.
    pub fn prefix_u64(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(head)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        let mut out = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut out)
            .map_err(|e| FsError::MalformedReference(format!("bad digest {s:?}: {e}")))?;
        Ok(Self(out))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

fn tagged(tag: u8, payload: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update([tag]);
    hasher.update(payload);
    let full = hasher.finalize();
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&full[..DIGEST_LEN]);
    Digest(out)
}

/// Hash a scalar value. Numbers are already canonical text, so `1`, `1.0`
/// and `1e0` all land on the same digest.
pub fn hash_scalar(scalar: &Scalar) -> Digest {
    match scalar {
        Scalar::Bool(b) => {
            let text: &[u8] = if *b { b"true" } else { b"false" };
            tagged(TAG_BOOL, text)
        }
        Scalar::Number(n) => tagged(TAG_NUMBER, n.as_str().as_bytes()),
        Scalar::String(s) => tagged(TAG_STRING, s.as_bytes()),
    }
}

/// Hash an object key name. Bytes are taken as-is.
pub fn hash_key(key: &str) -> Digest {
    tagged(TAG_STRING, key.as_bytes())
}
