//! End-to-end tests for fstore-compactor against captured fingerprint documents.

use fstore_compactor::{
    wire, Dictionary, DictionarySink, DictionarySnapshot, Engine, EngineConfig, FsError, Namespace,
    Value,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

const FINGERPRINT: &str = include_str!("fixtures/fingerprint.json");
const BROWSER: &str = include_str!("fixtures/browser.json");

fn fixture(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap()
}

fn engine(threshold: u64, keys: bool) -> Engine {
    Engine::new(
        EngineConfig::new()
            .with_threshold(threshold)
            .with_key_compression(keys),
    )
    .unwrap()
}

/// A slightly different capture of the same client each time.
fn variant(base: &serde_json::Value, i: usize) -> serde_json::Value {
    let mut doc = base.clone();
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("capture".into(), json!(i));
        obj.insert("session".into(), json!(format!("s-{}", i % 3)));
    }
    doc
}

// ============================================================
// Fixture round trips
// ============================================================

#[test]
fn test_fingerprint_round_trip_default_config() {
    let e = Engine::new(EngineConfig::default()).unwrap();
    let base = fixture(FINGERPRINT);
    for i in 0..8 {
        let input = variant(&base, i);
        let wire = e.store_json(&input).unwrap();
        assert_eq!(e.expand_json(&wire).unwrap(), input);
    }
}

#[test]
fn test_browser_round_trip_with_keys() {
    let e = engine(5, true);
    let base = fixture(BROWSER);
    for i in 0..6 {
        let input = variant(&base, i);
        let wire = e.store_json(&input).unwrap();
        assert_eq!(e.expand_json(&wire).unwrap(), input);
    }
    assert!(e.dictionary().len(Namespace::Key) > 0);
    assert!(e.dictionary().len(Namespace::Value) > 0);
}

#[test]
fn test_repeated_captures_shrink() {
    let e = engine(3, false);
    let base = fixture(FINGERPRINT);
    let plain = serde_json::to_string(&variant(&base, 4)).unwrap().len();

    let mut last = 0;
    for i in 0..5 {
        let wire = e.store_json(&variant(&base, i)).unwrap();
        last = serde_json::to_string(&wire).unwrap().len();
    }
    assert!(last < plain, "compacted {last} bytes, plain {plain} bytes");
    assert!(e.stats().totals.net_savings() > 0);
}

// ============================================================
// Persistence
// ============================================================

#[test]
fn test_snapshot_reload_expands_old_documents() {
    let e = engine(2, true);
    let base = fixture(FINGERPRINT);
    let wires: Vec<_> = (0..4).map(|i| e.store_json(&variant(&base, i)).unwrap()).collect();

    let persisted = serde_json::to_string(&e.snapshot()).unwrap();
    let snapshot: DictionarySnapshot = serde_json::from_str(&persisted).unwrap();
    let reloaded = Dictionary::from_snapshot(snapshot).unwrap();

    for (i, w) in wires.iter().enumerate() {
        let compacted = wire::decode(w).unwrap();
        let expanded = fstore_compactor::expand(&compacted, &reloaded, 512).unwrap();
        assert_eq!(expanded.to_json().unwrap(), variant(&base, i));
    }
}

#[test]
fn test_tampered_snapshot_rejected() {
    let e = engine(1, false);
    e.store_json(&json!(["a", "b"])).unwrap();
    let mut raw = serde_json::to_value(e.snapshot()).unwrap();
    for (_, v) in raw["values"].as_object_mut().unwrap().iter_mut() {
        *v = json!("tampered");
    }
    let snapshot: DictionarySnapshot = serde_json::from_value(raw).unwrap();
    assert!(matches!(Dictionary::from_snapshot(snapshot), Err(FsError::CorruptDictionary(_))));
}

#[derive(Default)]
struct MemorySink {
    flushed: Mutex<Vec<DictionarySnapshot>>,
}

impl DictionarySink for MemorySink {
    fn flush(&self, entries: &DictionarySnapshot) -> anyhow::Result<()> {
        self.flushed.lock().push(entries.clone());
        Ok(())
    }
}

#[test]
fn test_sink_receives_every_entry_once() {
    let e = engine(2, true);
    let sink = MemorySink::default();
    let base = fixture(FINGERPRINT);
    for i in 0..5 {
        let doc = Value::from_json(&variant(&base, i)).unwrap();
        e.store_with_sink(&doc, &sink).unwrap();
    }

    let mut merged = DictionarySnapshot::new();
    let flushed = sink.flushed.lock();
    for batch in flushed.iter() {
        assert!(!batch.is_empty());
        merged.extend(batch.clone());
    }
    let total: usize = flushed.iter().map(|b| b.len()).sum();
    assert_eq!(total, merged.len());
    assert_eq!(merged, e.snapshot());
}

// ============================================================
// Concurrency
// ============================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stores_promote_once() {
    let e = Arc::new(engine(3, true));
    let base = Arc::new(fixture(FINGERPRINT));

    let mut handles = Vec::new();
    for i in 0..16 {
        let e = e.clone();
        let base = base.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let input = variant(&base, i);
            let out = e.store(&Value::from_json(&input).unwrap()).unwrap();
            (input, out)
        }));
    }

    let mut outputs = Vec::new();
    for h in handles {
        outputs.push(h.await.unwrap());
    }

    let mut merged = DictionarySnapshot::new();
    let mut promotions = 0;
    for (_, out) in &outputs {
        promotions += out.stats.promotions();
        merged.extend(out.new_entries.clone());
    }
    // each promoted digest was inserted by exactly one call
    assert_eq!(promotions as usize, merged.len());
    assert_eq!(merged, e.snapshot());
    assert_eq!(
        e.tracker().promoted(Namespace::Value) + e.tracker().promoted(Namespace::Key),
        merged.len()
    );

    for (input, out) in &outputs {
        assert_eq!(e.expand(&out.document).unwrap().to_json().unwrap(), *input);
    }
    assert_eq!(e.stats().documents, 16);
}
