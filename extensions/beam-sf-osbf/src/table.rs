//! Fixed capacity open addressing table of feature buckets.
//!
//! A bucket is empty iff its value is zero, and empty buckets are all-zero.
//! Features are placed by linear probing from their home slot
//! (`hash % bucket_count`). Removing a bucket shifts the rest of its run back
//! so that every remaining bucket stays reachable from its home slot.

use beam::error::Error;
use serde::{Deserialize, Serialize};

use crate::store::FILE_VERSION;

/// Saturation point of a bucket value
pub const FEATURE_BUCKET_VALUE_MAX: u32 = 65535;

/// Bucket count of a newly created table
pub const DEFAULT_FILE_LENGTH: u32 = 94321;

/// Chains longer than this are groomed after an insert
pub const MICROGROOM_CHAIN_LENGTH: usize = 29;

/// Upper bound of evictions done by a single grooming pass
pub const MICROGROOM_STOP_AFTER: usize = 128;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureBucket {
    pub hash: u32,
    pub key: u32,
    pub value: u32,
}

impl FeatureBucket {
    pub fn is_empty(&self) -> bool {
        self.value == 0
    }

    pub fn matches(&self, hash: u32, key: u32) -> bool {
        self.hash == hash && self.key == key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: [u8; 4],
    /// Number of buckets, fixed when the table is created
    pub buckets: u32,
    /// Number of learning operations applied to the table
    pub learnings: u32,
}

/// Limits applied by [`ClassTable::microgroom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grooming {
    pub chain_length: usize,
    pub stop_after: usize,
}

impl Default for Grooming {
    fn default() -> Self {
        Grooming {
            chain_length: MICROGROOM_CHAIN_LENGTH,
            stop_after: MICROGROOM_STOP_AFTER,
        }
    }
}

/// Occupancy figures of a table
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableStatistics {
    pub buckets: u32,
    pub learnings: u32,
    pub used: usize,
    pub free: usize,
    /// Buckets stuck at [`FEATURE_BUCKET_VALUE_MAX`]
    pub saturated: usize,
    /// Longest run of occupied slots
    pub max_chain: usize,
    /// Mean number of slots probed to reach a stored feature
    pub average_probe: f64,
}

/// Header plus bucket array of one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTable {
    header: Header,
    buckets: Vec<FeatureBucket>,
    used: usize,
}

impl ClassTable {
    /// Creates an empty table
    pub fn new(buckets: u32) -> Result<Self, Error> {
        if buckets == 0 {
            return Err(Error::InvalidBucketCount(buckets));
        }
        Ok(ClassTable {
            header: Header {
                version: FILE_VERSION,
                buckets,
                learnings: 0,
            },
            buckets: vec![FeatureBucket::default(); buckets as usize],
            used: 0,
        })
    }

    /// Assembles a table from decoded parts
    pub fn from_parts(header: Header, buckets: Vec<FeatureBucket>) -> Result<Self, Error> {
        if header.buckets == 0 {
            return Err(Error::CorruptedClassTable {
                reason: "header announces zero buckets".into(),
            });
        }
        if buckets.len() != header.buckets as usize {
            return Err(Error::CorruptedClassTable {
                reason: format!(
                    "header announces {} buckets, found {}",
                    header.buckets,
                    buckets.len()
                ),
            });
        }
        if let Some(slot) = buckets
            .iter()
            .position(|b| b.value > FEATURE_BUCKET_VALUE_MAX)
        {
            return Err(Error::CorruptedClassTable {
                reason: format!("bucket {slot} exceeds the maximum value"),
            });
        }
        let used = buckets.iter().filter(|b| !b.is_empty()).count();
        Ok(ClassTable {
            header,
            buckets,
            used,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn buckets(&self) -> &[FeatureBucket] {
        &self.buckets
    }

    pub fn bucket(&self, slot: usize) -> &FeatureBucket {
        &self.buckets[slot]
    }

    pub fn bucket_count(&self) -> u32 {
        self.header.buckets
    }

    pub fn learnings(&self) -> u32 {
        self.header.learnings
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn free(&self) -> usize {
        self.buckets.len() - self.used
    }

    pub fn home(&self, hash: u32) -> usize {
        (hash % self.header.buckets) as usize
    }

    fn next(&self, slot: usize) -> usize {
        match slot + 1 {
            n if n == self.buckets.len() => 0,
            n => n,
        }
    }

    /// Looks up a feature, returning its slot
    pub fn find(&self, hash: u32, key: u32) -> Option<usize> {
        let start = self.home(hash);
        let mut slot = start;
        loop {
            let bucket = &self.buckets[slot];
            if bucket.is_empty() {
                return None;
            }
            if bucket.matches(hash, key) {
                return Some(slot);
            }
            slot = self.next(slot);
            if slot == start {
                return None;
            }
        }
    }

    /// Finds the feature, or claims the first empty slot of its chain for it.
    /// A claimed bucket starts at `weight` (at least one occurrence).
    pub fn insert(&mut self, hash: u32, key: u32, weight: u32) -> Result<usize, Error> {
        let start = self.home(hash);
        let mut slot = start;
        loop {
            let bucket = &self.buckets[slot];
            if bucket.is_empty() {
                break;
            }
            if bucket.matches(hash, key) {
                self.increment(slot, weight);
                return Ok(slot);
            }
            slot = self.next(slot);
            if slot == start {
                return Err(Error::ClassTableFull {
                    buckets: self.header.buckets,
                });
            }
        }

        self.buckets[slot] = FeatureBucket {
            hash,
            key,
            value: weight.clamp(1, FEATURE_BUCKET_VALUE_MAX),
        };
        self.used += 1;
        Ok(slot)
    }

    /// Adds `weight` to a bucket, saturating at [`FEATURE_BUCKET_VALUE_MAX`]
    pub fn increment(&mut self, slot: usize, weight: u32) -> u32 {
        let bucket = &mut self.buckets[slot];
        if bucket.is_empty() {
            return 0;
        }
        bucket.value = bucket
            .value
            .saturating_add(weight)
            .min(FEATURE_BUCKET_VALUE_MAX);
        bucket.value
    }

    /// Subtracts `weight` from a bucket, never going below zero. A bucket
    /// reaching zero is released. Returns the remaining value.
    pub fn decrement(&mut self, slot: usize, weight: u32) -> u32 {
        let bucket = &mut self.buckets[slot];
        if bucket.is_empty() {
            return 0;
        }
        if bucket.value <= weight {
            self.release(slot);
            return 0;
        }
        bucket.value -= weight;
        bucket.value
    }

    /// Empties a slot and shifts the rest of its run back so no stored
    /// feature becomes unreachable.
    pub fn release(&mut self, slot: usize) {
        if self.buckets[slot].is_empty() {
            return;
        }
        self.buckets[slot] = FeatureBucket::default();
        self.used -= 1;

        let mut hole = slot;
        let mut probe = self.next(slot);
        while !self.buckets[probe].is_empty() {
            let home = self.home(self.buckets[probe].hash);
            if !cyclic_between(home, hole, probe) {
                self.buckets[hole] = self.buckets[probe];
                self.buckets[probe] = FeatureBucket::default();
                hole = probe;
            }
            probe = self.next(probe);
        }
    }

    /// Number of consecutive occupied slots starting at `slot`
    pub fn chain_len(&self, slot: usize) -> usize {
        let mut len = 0;
        let mut probe = slot;
        while len < self.buckets.len() && !self.buckets[probe].is_empty() {
            len += 1;
            probe = self.next(probe);
        }
        len
    }

    /// Evicts the lowest valued buckets of the chain starting at `home` until
    /// it is no longer than `limits.chain_length`, or `limits.stop_after`
    /// buckets were evicted. The `keep` feature is never evicted.
    /// Returns the number of evicted buckets.
    pub fn microgroom(
        &mut self,
        home: usize,
        limits: &Grooming,
        keep: Option<(u32, u32)>,
    ) -> usize {
        let mut evicted = 0;
        while evicted < limits.stop_after {
            let len = self.chain_len(home);
            if len <= limits.chain_length {
                break;
            }

            let mut victim: Option<(usize, u32)> = None;
            let mut slot = home;
            for _ in 0..len {
                let bucket = &self.buckets[slot];
                let protected = keep.map_or(false, |(h, k)| bucket.matches(h, k));
                if !protected && victim.map_or(true, |(_, value)| bucket.value < value) {
                    victim = Some((slot, bucket.value));
                }
                slot = self.next(slot);
            }

            let Some((slot, value)) = victim else {
                break;
            };
            tracing::trace!(slot, value, chain = len, "evicting bucket");
            self.release(slot);
            evicted += 1;
        }

        if evicted > 0 {
            tracing::debug!(home, evicted, "microgroomed chain");
        }
        evicted
    }

    /// Re-inserts every stored bucket into a fresh array of the same size,
    /// compacting chains without changing lookup results.
    pub fn pack(&mut self) {
        let old = std::mem::replace(
            &mut self.buckets,
            vec![FeatureBucket::default(); self.header.buckets as usize],
        );
        self.used = 0;
        for bucket in old.into_iter().filter(|b| !b.is_empty()) {
            let mut slot = self.home(bucket.hash);
            while !self.buckets[slot].is_empty() {
                slot = self.next(slot);
            }
            self.buckets[slot] = bucket;
            self.used += 1;
        }
    }

    pub fn learned(&mut self) {
        self.header.learnings = self.header.learnings.saturating_add(1);
    }

    pub fn unlearned(&mut self) {
        self.header.learnings = self.header.learnings.saturating_sub(1);
    }

    pub fn statistics(&self) -> TableStatistics {
        let len = self.buckets.len();
        let saturated = self
            .buckets
            .iter()
            .filter(|b| b.value == FEATURE_BUCKET_VALUE_MAX)
            .count();

        let mut probes = 0usize;
        for (slot, bucket) in self.buckets.iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let home = self.home(bucket.hash);
            probes += (slot + len - home) % len + 1;
        }

        let max_chain = match self.free() {
            0 => len,
            _ => {
                // start right after an empty slot so no run is split by the wrap
                let start = self.buckets.iter().position(|b| b.is_empty()).unwrap_or(0);
                let mut max_chain = 0;
                let mut run = 0;
                for offset in 1..=len {
                    match self.buckets[(start + offset) % len].is_empty() {
                        true => run = 0,
                        false => {
                            run += 1;
                            max_chain = max_chain.max(run);
                        }
                    }
                }
                max_chain
            }
        };

        TableStatistics {
            buckets: self.header.buckets,
            learnings: self.header.learnings,
            used: self.used,
            free: self.free(),
            saturated,
            max_chain,
            average_probe: match self.used {
                0 => 0.0,
                used => probes as f64 / used as f64,
            },
        }
    }
}

/// Whether `x` lies in the cyclic interval `(lo, hi]`
fn cyclic_between(x: usize, lo: usize, hi: usize) -> bool {
    match lo <= hi {
        true => lo < x && x <= hi,
        false => lo < x || x <= hi,
    }
}
