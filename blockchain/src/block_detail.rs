//! A received block plus the organizer's bookkeeping for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use mvs_types::{Block, BlockHash};

use crate::ValidationError;

/// Shared between the orphan pool and the organizer behind an `Arc`.
#[derive(Debug)]
pub struct BlockDetail {
    block: Block,
    hash: BlockHash,
    processed: AtomicBool,
    checked_work_proof: AtomicBool,
    error: Mutex<Option<ValidationError>>,
    /// Set once the block is on the main chain.
    height: Mutex<Option<u64>>,
}

impl BlockDetail {
    pub fn new(block: Block) -> Self {
        let hash = block.hash();
        Self {
            block,
            hash,
            processed: AtomicBool::new(false),
            checked_work_proof: AtomicBool::new(false),
            error: Mutex::new(None),
            height: Mutex::new(None),
        }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    pub fn previous_hash(&self) -> BlockHash {
        self.block.header.previous_hash
    }

    pub fn is_processed(&self) -> bool {
        self.processed.load(Ordering::Acquire)
    }

    pub fn set_processed(&self, processed: bool) {
        self.processed.store(processed, Ordering::Release);
    }

    pub fn is_checked_work_proof(&self) -> bool {
        self.checked_work_proof.load(Ordering::Acquire)
    }

    pub fn set_checked_work_proof(&self, checked: bool) {
        self.checked_work_proof.store(checked, Ordering::Release);
    }

    pub fn error(&self) -> Option<ValidationError> {
        self.error.lock().unwrap().clone()
    }

    pub fn set_error(&self, error: ValidationError) {
        *self.error.lock().unwrap() = Some(error);
    }

    pub fn height(&self) -> Option<u64> {
        *self.height.lock().unwrap()
    }

    pub fn set_height(&self, height: u64) {
        *self.height.lock().unwrap() = Some(height);
    }
}
