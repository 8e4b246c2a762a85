//! Value model, canonical hashing and reference wire format for fstore.

pub mod config;
pub mod error;
pub mod hash;
mod ser;
pub mod value;
pub mod wire;

pub use config::EngineConfig;
pub use error::{FsError, Result};
pub use hash::{hash_key, hash_scalar, Digest, Namespace, DIGEST_LEN};
pub use value::{Key, Number, Object, Reference, Rewrite, Scalar, Value};
