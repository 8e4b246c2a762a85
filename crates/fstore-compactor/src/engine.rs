//! Long-lived engine owning the dictionary and occurrence tracker.

use crate::compact::Compactor;
use crate::expand::expand;
use crate::stats::{CompactStats, EngineStats, StatsCounter};
use fstore_core::{wire, EngineConfig, Namespace, Result, Value};
use fstore_dict::{Dictionary, DictionarySink, DictionarySnapshot, OccurrenceTracker};
use parking_lot::Mutex;

/// Output of one store call.
#[derive(Debug, Clone)]
pub struct Compacted {
    pub document: Value,
    /// Dictionary entries created by this call, for the external persister.
    /// Also carries entries created by earlier calls that failed part way.
    pub new_entries: DictionarySnapshot,
    pub stats: CompactStats,
}

impl Compacted {
    /// The compacted document in its JSON wire form.
    pub fn to_wire(&self) -> Result<serde_json::Value> {
        wire::encode(&self.document)
    }
}

/// Deduplication engine.
///
/// Shareable across threads (`Arc<Engine>`); every method takes `&self`.
pub struct Engine {
    config: EngineConfig,
    dictionary: Dictionary,
    tracker: OccurrenceTracker,
    stats: StatsCounter,
    /// Entries inserted by calls that later failed, handed out with the
    /// next successful call.
    orphaned: Mutex<DictionarySnapshot>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_dictionary(config, Dictionary::new())
    }

    /// Resume from a previously persisted dictionary. Occurrence counts are
    /// not persisted, so counting restarts; content already in the
    /// dictionary is not inserted again when it is promoted.
    pub fn with_dictionary(config: EngineConfig, dictionary: Dictionary) -> Result<Self> {
        config.validate()?;
        let tracker = OccurrenceTracker::new(config.threshold)?;
        tracing::debug!(
            threshold = config.threshold,
            key_compression = config.key_compression,
            values = dictionary.len(Namespace::Value),
            keys = dictionary.len(Namespace::Key),
            "engine created"
        );
        Ok(Self {
            config,
            dictionary,
            tracker,
            stats: StatsCounter::default(),
            orphaned: Mutex::new(DictionarySnapshot::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn tracker(&self) -> &OccurrenceTracker {
        &self.tracker
    }

    /// Export the full dictionary.
    pub fn snapshot(&self) -> DictionarySnapshot {
        self.dictionary.snapshot()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.snapshot()
    }

    /// Compact one document, growing the shared dictionary.
    pub fn store(&self, document: &Value) -> Result<Compacted> {
        let mut compactor = Compactor::new(
            &self.tracker,
            &self.dictionary,
            self.config.key_compression,
            self.config.debug,
        );
        let result = document.rewrite(&mut compactor, self.config.max_depth);
        let (entries, stats) = compactor.finish();

        let compacted = match result {
            Ok(compacted) => compacted,
            Err(e) => {
                self.stats.record_failure();
                if !entries.is_empty() {
                    self.orphaned.lock().extend(entries);
                }
                return Err(e);
            }
        };

        let mut new_entries = std::mem::take(&mut *self.orphaned.lock());
        new_entries.extend(entries);
        self.stats.record(&stats);

        tracing::debug!(
            values_inline = stats.values_inline,
            values_referenced = stats.values_referenced,
            keys_referenced = stats.keys_referenced,
            promotions = stats.promotions(),
            new_entries = new_entries.len(),
            "stored document"
        );

        Ok(Compacted { document: compacted, new_entries, stats })
    }

    /// Compact one document, returning only the compacted tree.
    pub fn compact(&self, document: &Value) -> Result<Value> {
        self.store(document).map(|c| c.document)
    }

    /// Store, then hand the new dictionary entries to `sink` before
    /// returning.
    pub fn store_with_sink(&self, document: &Value, sink: &dyn DictionarySink) -> Result<Compacted> {
        let compacted = self.store(document)?;
        if !compacted.new_entries.is_empty() {
            if let Err(e) = sink.flush(&compacted.new_entries) {
                // keep the entries for the next call rather than lose them
                self.orphaned.lock().extend(compacted.new_entries.clone());
                return Err(e.into());
            }
        }
        Ok(compacted)
    }

    /// Rebuild the original of a document this engine compacted.
    pub fn expand(&self, document: &Value) -> Result<Value> {
        expand(document, &self.dictionary, self.config.max_depth)
    }

    /// Plain JSON in, compacted wire form out.
    pub fn store_json(&self, json: &serde_json::Value) -> Result<serde_json::Value> {
        let document = Value::from_json(json)?;
        self.store(&document)?.to_wire()
    }

    /// Compacted wire form in, plain JSON out.
    pub fn expand_json(&self, json: &serde_json::Value) -> Result<serde_json::Value> {
        let document = wire::decode(json)?;
        self.expand(&document)?.to_json()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("values", &self.dictionary.len(Namespace::Value))
            .field("keys", &self.dictionary.len(Namespace::Key))
            .finish()
    }
}
