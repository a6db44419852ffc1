//! Nullable mempool: records evictions.

use std::sync::Mutex;

use mvs_blockchain::Mempool;
use mvs_types::TxHash;

#[derive(Default)]
pub struct NullMempool {
    evicted: Mutex<Vec<TxHash>>,
}

impl NullMempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes passed to `delete_tx`, in call order.
    pub fn evicted(&self) -> Vec<TxHash> {
        self.evicted.lock().unwrap().clone()
    }
}

impl Mempool for NullMempool {
    fn delete_tx(&self, hash: &TxHash) {
        self.evicted.lock().unwrap().push(*hash);
    }
}
