//! Recent-block cache (C3).
//!
//! Tracks the last `capacity` blocks seen by one contract's worker, keyed by
//! block number, so the reorg detector (C4) can chain parent hashes without
//! an extra RPC round-trip for the common case. Deliberately one instance
//! per contract rather than shared across a chain's workers: duplicating a
//! few hundred bytes per contract buys isolation (one contract's recovery
//! never touches another's cache) at negligible cost.

use std::collections::BTreeMap;

use alloy::primitives::B256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedBlock {
    pub hash: B256,
    pub parent_hash: B256,
}

pub struct RecentBlockCache {
    capacity: usize,
    entries: BTreeMap<u64, CachedBlock>,
}

impl RecentBlockCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: BTreeMap::new(),
        }
    }

    pub fn put(&mut self, block_number: u64, hash: B256, parent_hash: B256) {
        self.entries
            .insert(block_number, CachedBlock { hash, parent_hash });
        while self.entries.len() > self.capacity {
            if let Some(&lowest) = self.entries.keys().next() {
                self.entries.remove(&lowest);
            }
        }
    }

    pub fn get(&self, block_number: u64) -> Option<CachedBlock> {
        self.entries.get(&block_number).copied()
    }

    /// Whether any cached block carries this hash, regardless of number.
    pub fn contains(&self, hash: B256) -> bool {
        self.entries.values().any(|entry| entry.hash == hash)
    }

    /// Drop every cached entry for a block at or above `block_number`, used
    /// after reorg recovery rewinds state to the fork point.
    pub fn evict_from(&mut self, block_number: u64) {
        self.entries.retain(|&num, _| num < block_number);
    }

    pub fn oldest_block_number(&self) -> Option<u64> {
        self.entries.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
