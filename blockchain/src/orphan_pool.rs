//! Orphan pool: blocks received but not yet connected to the main chain.
//!
//! Blocks are kept in arrival order. A block whose oldest pooled ancestor does
//! not link to the main chain is parked under the missing parent's hash until
//! that parent connects, then requeued by the organizer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use mvs_types::BlockHash;

use crate::block_detail::BlockDetail;

pub struct OrphanPool {
    capacity: usize,
    buffer: RwLock<Vec<Arc<BlockDetail>>>,
    /// Missing parent hash -> blocks waiting on it.
    pending: Mutex<HashMap<BlockHash, Vec<Arc<BlockDetail>>>>,
}

impl OrphanPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: RwLock::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Insert `block`. Returns `false` for a duplicate or when the pool is full.
    pub fn add(&self, block: Arc<BlockDetail>) -> bool {
        let mut buffer = self.buffer.write().unwrap();
        let hash = block.hash();
        if buffer.iter().any(|b| b.hash() == hash) {
            tracing::debug!(hash = %hash, "duplicate block rejected by orphan pool");
            return false;
        }
        if buffer.len() >= self.capacity {
            tracing::debug!(hash = %hash, capacity = self.capacity, "orphan pool full");
            return false;
        }
        buffer.push(block);
        tracing::debug!(hash = %hash, size = buffer.len(), "block added to orphan pool");
        true
    }

    pub fn add_all(&self, blocks: impl IntoIterator<Item = Arc<BlockDetail>>) {
        for block in blocks {
            self.add(block);
        }
    }

    pub fn remove(&self, hash: &BlockHash) -> bool {
        let mut buffer = self.buffer.write().unwrap();
        let before = buffer.len();
        buffer.retain(|b| b.hash() != *hash);
        let removed = buffer.len() != before;
        if removed {
            tracing::debug!(hash = %hash, size = buffer.len(), "block removed from orphan pool");
        }
        removed
    }

    pub fn exists(&self, hash: &BlockHash) -> bool {
        self.buffer.read().unwrap().iter().any(|b| b.hash() == *hash)
    }

    pub fn get(&self, hash: &BlockHash) -> Option<Arc<BlockDetail>> {
        self.buffer.read().unwrap().iter().find(|b| b.hash() == *hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.buffer.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strip inventory hashes the pool already holds.
    pub fn filter(&self, hashes: Vec<BlockHash>) -> Vec<BlockHash> {
        let buffer = self.buffer.read().unwrap();
        hashes
            .into_iter()
            .filter(|h| !buffer.iter().any(|b| b.hash() == *h))
            .collect()
    }

    /// The pooled ancestry of `block`, oldest first and ending with `block`.
    pub fn trace(&self, block: &Arc<BlockDetail>) -> Vec<Arc<BlockDetail>> {
        let buffer = self.buffer.read().unwrap();
        let mut chain = vec![Arc::clone(block)];
        let mut previous = block.previous_hash();

        while let Some(parent) = buffer.iter().find(|b| b.hash() == previous) {
            if chain.iter().any(|b| b.hash() == parent.hash()) {
                break;
            }
            previous = parent.previous_hash();
            chain.push(Arc::clone(parent));
        }

        chain.reverse();
        chain
    }

    /// Unprocessed blocks, most recently added first.
    pub fn unprocessed(&self) -> Vec<Arc<BlockDetail>> {
        self.buffer
            .read()
            .unwrap()
            .iter()
            .rev()
            .filter(|b| !b.is_processed())
            .cloned()
            .collect()
    }

    /// Park `block` until `missing` connects.
    pub fn add_pending_block(&self, missing: BlockHash, block: Arc<BlockDetail>) {
        let mut pending = self.pending.lock().unwrap();
        let waiting = pending.entry(missing).or_default();
        if !waiting.iter().any(|b| b.hash() == block.hash()) {
            tracing::debug!(missing = %missing, hash = %block.hash(), "block pending on missing parent");
            waiting.push(block);
        }
    }

    /// Take the blocks waiting on `hash`.
    pub fn delete_pending_block(&self, hash: &BlockHash) -> Vec<Arc<BlockDetail>> {
        self.pending.lock().unwrap().remove(hash).unwrap_or_default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().values().map(Vec::len).sum()
    }
}
