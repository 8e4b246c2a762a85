//! fstore compactor: reference deduplication for repetitive documents.
//!
//! Stages per stored document:
//! 1. Walk the tree, hashing every key (when enabled) and scalar leaf
//! 2. Count each digest; promote it once it reaches the threshold
//! 3. Replace promoted content with a reference into the shared dictionary
//!
//! Expansion runs the same walk in reverse against the dictionary.

mod compact;
pub mod engine;
pub mod expand;
pub mod stats;

pub use engine::{Compacted, Engine};
pub use expand::expand;
pub use stats::{CompactStats, EngineStats};

pub use fstore_core::{wire, Digest, EngineConfig, FsError, Key, Namespace, Object, Result, Value};
pub use fstore_dict::{Dictionary, DictionarySink, DictionarySnapshot, ReferenceResolver};
