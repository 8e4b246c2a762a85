//! Occurrence tracking and the append-only reference dictionary.

pub mod dictionary;
pub mod snapshot;
pub mod tracker;
pub mod traits;

pub use dictionary::Dictionary;
pub use snapshot::DictionarySnapshot;
pub use tracker::{Observation, OccurrenceTracker, State};
pub use traits::{DictionarySink, ReferenceResolver};
