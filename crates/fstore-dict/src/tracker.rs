//! Per-digest occurrence counters and the promotion state machine.
//!
//! Counters are sharded by digest. `observe` holds one shard lock across
//! the increment, the promotion callback and the promoted-flag flip, so a
//! digest is promoted exactly once and whatever the callback writes is
//! visible to every later caller that sees the digest as promoted.

use fstore_core::{Digest, FsError, Namespace, Result};
use parking_lot::Mutex;
use std::collections::HashMap;

pub const DEFAULT_SHARDS: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
struct Counter {
    count: u64,
    promoted: bool,
}

/// Where a digest sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unseen,
    Seen(u64),
    Promoted(u64),
}

/// Result of one sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Below threshold: emit the content inline.
    Inline { count: u64 },
    /// This sighting reached the threshold and created the dictionary entry.
    Promote,
    /// Already promoted earlier.
    Reference,
}

impl Observation {
    pub fn is_reference(&self) -> bool {
        !matches!(self, Self::Inline { .. })
    }
}

type Shard = Mutex<HashMap<Digest, Counter>>;

fn new_shards(n: usize) -> Box<[Shard]> {
    (0..n).map(|_| Mutex::new(HashMap::new())).collect()
}

pub struct OccurrenceTracker {
    threshold: u64,
    keys: Box<[Shard]>,
    values: Box<[Shard]>,
}

impl OccurrenceTracker {
    pub fn new(threshold: u64) -> Result<Self> {
        Self::with_shards(threshold, DEFAULT_SHARDS)
    }

    pub fn with_shards(threshold: u64, shards: usize) -> Result<Self> {
        if threshold == 0 {
            return Err(FsError::InvalidConfig("threshold must be at least 1".into()));
        }
        let shards = shards.max(1);
        Ok(Self {
            threshold,
            keys: new_shards(shards),
            values: new_shards(shards),
        })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    fn table(&self, namespace: Namespace) -> &[Shard] {
        match namespace {
            Namespace::Key => &self.keys,
            Namespace::Value => &self.values,
        }
    }

    fn shard(&self, namespace: Namespace, digest: &Digest) -> &Shard {
        let table = self.table(namespace);
        &table[(digest.prefix_u64() % table.len() as u64) as usize]
    }

    /// Record one sighting of `digest`.
    ///
    /// When the count reaches the threshold `on_promote` runs while the
    /// shard is still locked; it is where the caller writes the dictionary
    /// entry. If it fails the sighting is not counted and the digest stays
    /// unpromoted.
    pub fn observe<F>(&self, namespace: Namespace, digest: Digest, on_promote: F) -> Result<Observation>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut shard = self.shard(namespace, &digest).lock();
        let counter = shard.entry(digest).or_default();
        if counter.promoted {
            counter.count = counter.count.saturating_add(1);
            return Ok(Observation::Reference);
        }
        let next = counter.count + 1;
        if next < self.threshold {
            counter.count = next;
            return Ok(Observation::Inline { count: next });
        }
        if let Err(e) = on_promote() {
            if counter.count == 0 {
                shard.remove(&digest);
            }
            return Err(e);
        }
        counter.count = next;
        counter.promoted = true;
        Ok(Observation::Promote)
    }

    pub fn state(&self, namespace: Namespace, digest: &Digest) -> State {
        match self.shard(namespace, digest).lock().get(digest) {
            None => State::Unseen,
            Some(c) if c.promoted => State::Promoted(c.count),
            Some(c) => State::Seen(c.count),
        }
    }

    pub fn count(&self, namespace: Namespace, digest: &Digest) -> u64 {
        match self.state(namespace, digest) {
            State::Unseen => 0,
            State::Seen(n) | State::Promoted(n) => n,
        }
    }

    pub fn is_promoted(&self, namespace: Namespace, digest: &Digest) -> bool {
        matches!(self.state(namespace, digest), State::Promoted(_))
    }

    /// Number of distinct digests seen in a namespace.
    pub fn tracked(&self, namespace: Namespace) -> usize {
        self.table(namespace).iter().map(|s| s.lock().len()).sum()
    }

    pub fn promoted(&self, namespace: Namespace) -> usize {
        self.table(namespace)
            .iter()
            .map(|s| s.lock().values().filter(|c| c.promoted).count())
            .sum()
    }
}
