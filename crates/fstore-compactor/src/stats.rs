//! Per-call and lifetime counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Length of a value reference on the wire: `{"$ref":"<32 hex>"}`.
pub const VALUE_REF_WIRE_LEN: u64 = 42;
/// Length of a key reference on the wire: `"$<32 hex>"`.
pub const KEY_REF_WIRE_LEN: u64 = 35;

/// What one store call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactStats {
    pub values_inline: u64,
    pub values_referenced: u64,
    pub values_promoted: u64,
    pub keys_inline: u64,
    pub keys_referenced: u64,
    pub keys_promoted: u64,
    pub nulls: u64,
    /// Inline bytes of the content that was replaced by references.
    pub bytes_replaced: u64,
    /// Wire bytes of the references that replaced it.
    pub reference_bytes: u64,
}

impl CompactStats {
    pub fn references(&self) -> u64 {
        self.values_referenced + self.keys_referenced
    }

    pub fn promotions(&self) -> u64 {
        self.values_promoted + self.keys_promoted
    }

    /// Net bytes saved by referencing; negative when references cost more
    /// than the short content they replaced.
    pub fn net_savings(&self) -> i64 {
        self.bytes_replaced as i64 - self.reference_bytes as i64
    }
}

/// Lifetime totals for an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub documents: u64,
    pub failed: u64,
    pub totals: CompactStats,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    documents: AtomicU64,
    failed: AtomicU64,
    values_inline: AtomicU64,
    values_referenced: AtomicU64,
    values_promoted: AtomicU64,
    keys_inline: AtomicU64,
    keys_referenced: AtomicU64,
    keys_promoted: AtomicU64,
    nulls: AtomicU64,
    bytes_replaced: AtomicU64,
    reference_bytes: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn record(&self, stats: &CompactStats) {
        self.documents.fetch_add(1, Ordering::Relaxed);
        self.values_inline.fetch_add(stats.values_inline, Ordering::Relaxed);
        self.values_referenced.fetch_add(stats.values_referenced, Ordering::Relaxed);
        self.values_promoted.fetch_add(stats.values_promoted, Ordering::Relaxed);
        self.keys_inline.fetch_add(stats.keys_inline, Ordering::Relaxed);
        self.keys_referenced.fetch_add(stats.keys_referenced, Ordering::Relaxed);
        self.keys_promoted.fetch_add(stats.keys_promoted, Ordering::Relaxed);
        self.nulls.fetch_add(stats.nulls, Ordering::Relaxed);
        self.bytes_replaced.fetch_add(stats.bytes_replaced, Ordering::Relaxed);
        self.reference_bytes.fetch_add(stats.reference_bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EngineStats {
        EngineStats {
            documents: self.documents.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            totals: CompactStats {
                values_inline: self.values_inline.load(Ordering::Relaxed),
                values_referenced: self.values_referenced.load(Ordering::Relaxed),
                values_promoted: self.values_promoted.load(Ordering::Relaxed),
                keys_inline: self.keys_inline.load(Ordering::Relaxed),
                keys_referenced: self.keys_referenced.load(Ordering::Relaxed),
                keys_promoted: self.keys_promoted.load(Ordering::Relaxed),
                nulls: self.nulls.load(Ordering::Relaxed),
                bytes_replaced: self.bytes_replaced.load(Ordering::Relaxed),
                reference_bytes: self.reference_bytes.load(Ordering::Relaxed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_totals() {
        let stats = CompactStats {
            values_referenced: 3,
            keys_referenced: 2,
            values_promoted: 1,
            keys_promoted: 1,
            bytes_replaced: 100,
            reference_bytes: 160,
            ..Default::default()
        };
        assert_eq!(stats.references(), 5);
        assert_eq!(stats.promotions(), 2);
        assert_eq!(stats.net_savings(), -60);
    }

    #[test]
    fn test_counter_accumulates() {
        let counter = StatsCounter::default();
        let one = CompactStats { values_inline: 2, nulls: 1, ..Default::default() };
        counter.record(&one);
        counter.record(&one);
        counter.record_failure();
        let snap = counter.snapshot();
        assert_eq!(snap.documents, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.totals.values_inline, 4);
        assert_eq!(snap.totals.nulls, 2);
    }

    #[test]
    fn test_reference_wire_lengths() {
        let hex = "0".repeat(32);
        assert_eq!(format!(r#"{{"$ref":"{hex}"}}"#).len() as u64, VALUE_REF_WIRE_LEN);
        assert_eq!(format!(r#""${hex}""#).len() as u64, KEY_REF_WIRE_LEN);
    }
}
