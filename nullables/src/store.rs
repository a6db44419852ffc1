//! Nullable chain store: thread-safe in-memory main chain for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use mvs_store::{AssetStore, BlockStore, ChainWriter, StoreError, TransactionStore};
use mvs_types::{Attachment, Block, BlockHash, CertType, Header, OutPoint, PublicKey, Transaction, TxHash, U256};
use mvs_work::block_work;

#[derive(Default)]
struct Inner {
    /// Indexed by height.
    blocks: Vec<Block>,
    heights: HashMap<BlockHash, u64>,
    transactions: HashMap<TxHash, (Transaction, u64)>,
    spenders: HashMap<OutPoint, TxHash>,
    assets: HashMap<String, u64>,
    certs: HashMap<(String, CertType), u64>,
    mits: HashMap<String, u64>,
    dids: HashMap<String, u64>,
}

impl Inner {
    fn index(&mut self, block: &Block, height: u64) {
        self.heights.insert(block.hash(), height);
        for tx in &block.transactions {
            let hash = tx.hash();
            self.transactions.insert(hash, (tx.clone(), height));
            for input in tx.inputs.iter().filter(|i| !i.previous_output.is_null()) {
                self.spenders.insert(input.previous_output, hash);
            }
            for output in &tx.outputs {
                match &output.attachment {
                    Attachment::AssetIssue { symbol } => {
                        self.assets.entry(symbol.clone()).or_insert(height);
                    }
                    Attachment::AssetCert { symbol, cert } => {
                        self.certs.entry((symbol.clone(), *cert)).or_insert(height);
                    }
                    Attachment::AssetMit { symbol } => {
                        self.mits.entry(symbol.clone()).or_insert(height);
                    }
                    Attachment::DidRegister { symbol, .. } => {
                        self.dids.entry(symbol.clone()).or_insert(height);
                    }
                    _ => {}
                }
            }
        }
    }

    fn unindex(&mut self, block: &Block) {
        let height = self.heights.remove(&block.hash());
        for tx in &block.transactions {
            self.transactions.remove(&tx.hash());
            for input in &tx.inputs {
                self.spenders.remove(&input.previous_output);
            }
            for output in &tx.outputs {
                match &output.attachment {
                    // Only the registering block takes a registration with it.
                    Attachment::AssetIssue { symbol } => {
                        if self.assets.get(symbol) == height.as_ref() {
                            self.assets.remove(symbol);
                        }
                    }
                    Attachment::AssetCert { symbol, cert } => {
                        let key = (symbol.clone(), *cert);
                        if self.certs.get(&key) == height.as_ref() {
                            self.certs.remove(&key);
                        }
                    }
                    Attachment::AssetMit { symbol } => {
                        if self.mits.get(symbol) == height.as_ref() {
                            self.mits.remove(symbol);
                        }
                    }
                    Attachment::DidRegister { symbol, .. } => {
                        if self.dids.get(symbol) == height.as_ref() {
                            self.dids.remove(symbol);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

/// An in-memory main chain starting from a genesis block.
pub struct NullChainStore {
    inner: Mutex<Inner>,
    /// (candidate, stake, locked until height)
    stakes: Mutex<Vec<(PublicKey, u64, u64)>>,
    fail_push_at: Mutex<Option<u64>>,
    fail_next_pop: Mutex<bool>,
}

impl NullChainStore {
    pub fn new(genesis: Block) -> Self {
        let mut inner = Inner::default();
        inner.index(&genesis, 0);
        inner.blocks.push(genesis);
        Self {
            inner: Mutex::new(inner),
            stakes: Mutex::new(Vec::new()),
            fail_push_at: Mutex::new(None),
            fail_next_pop: Mutex::new(false),
        }
    }

    /// Register a witness candidate.
    pub fn add_witness_stake(&self, public_key: PublicKey, stake: u64, locked_until: u64) {
        self.stakes.lock().unwrap().push((public_key, stake, locked_until));
    }

    /// Make every push at `height` fail with a backend error.
    pub fn fail_push_at(&self, height: u64) {
        *self.fail_push_at.lock().unwrap() = Some(height);
    }

    /// Make the next `pop_from` fail with a backend error.
    pub fn fail_next_pop(&self) {
        *self.fail_next_pop.lock().unwrap() = true;
    }

    pub fn tip(&self) -> Block {
        let inner = self.inner.lock().unwrap();
        inner.blocks[inner.blocks.len() - 1].clone()
    }

    pub fn hashes(&self) -> Vec<BlockHash> {
        self.inner.lock().unwrap().blocks.iter().map(Block::hash).collect()
    }
}

impl BlockStore for NullChainStore {
    fn header_at(&self, height: u64) -> Result<Option<Header>, StoreError> {
        Ok(self.block_at(height)?.map(|b| b.header))
    }

    fn block_at(&self, height: u64) -> Result<Option<Block>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(usize::try_from(height).ok().and_then(|h| inner.blocks.get(h)).cloned())
    }

    fn height_of(&self, hash: &BlockHash) -> Result<Option<u64>, StoreError> {
        Ok(self.inner.lock().unwrap().heights.get(hash).copied())
    }

    fn last_height(&self) -> Result<u64, StoreError> {
        Ok(self.inner.lock().unwrap().blocks.len() as u64 - 1)
    }

    fn difficulty_at(&self, height: u64) -> Result<U256, StoreError> {
        let inner = self.inner.lock().unwrap();
        let start = usize::try_from(height).unwrap_or(usize::MAX);
        Ok(inner
            .blocks
            .iter()
            .skip(start)
            .fold(U256::zero(), |total, b| total.saturating_add(block_work(b.header.bits))))
    }
}

impl TransactionStore for NullChainStore {
    fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<(Transaction, u64)>, StoreError> {
        Ok(self.inner.lock().unwrap().transactions.get(hash).cloned())
    }

    fn outpoint_spender(&self, outpoint: &OutPoint) -> Result<Option<TxHash>, StoreError> {
        Ok(self.inner.lock().unwrap().spenders.get(outpoint).copied())
    }
}

impl AssetStore for NullChainStore {
    fn asset_height(&self, symbol: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.inner.lock().unwrap().assets.get(symbol).copied())
    }

    fn cert_height(&self, symbol: &str, cert: CertType) -> Result<Option<u64>, StoreError> {
        Ok(self.inner.lock().unwrap().certs.get(&(symbol.to_string(), cert)).copied())
    }

    fn mit_height(&self, symbol: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.inner.lock().unwrap().mits.get(symbol).copied())
    }

    fn did_height(&self, symbol: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.inner.lock().unwrap().dids.get(symbol).copied())
    }

    fn witness_stakes(&self, lock_until: u64) -> Result<Vec<(PublicKey, u64)>, StoreError> {
        Ok(self
            .stakes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, locked)| *locked >= lock_until)
            .map(|(key, stake, _)| (*key, *stake))
            .collect())
    }
}

impl ChainWriter for NullChainStore {
    fn push(&self, block: Block, height: u64) -> Result<(), StoreError> {
        if *self.fail_push_at.lock().unwrap() == Some(height) {
            return Err(StoreError::Backend(format!("injected push failure at {height}")));
        }
        let mut inner = self.inner.lock().unwrap();
        let expected = inner.blocks.len() as u64;
        if height != expected {
            return Err(StoreError::HeightMismatch {
                expected,
                actual: height,
            });
        }
        let hash = block.hash();
        if inner.heights.contains_key(&hash) {
            return Err(StoreError::Duplicate(hash.to_string()));
        }
        inner.index(&block, height);
        inner.blocks.push(block);
        Ok(())
    }

    fn pop_from(&self, height: u64) -> Result<Vec<Block>, StoreError> {
        if std::mem::take(&mut *self.fail_next_pop.lock().unwrap()) {
            return Err(StoreError::Backend("injected pop failure".into()));
        }
        let mut inner = self.inner.lock().unwrap();
        let tip = inner.blocks.len() as u64 - 1;
        if height == 0 || height > tip + 1 {
            return Err(StoreError::PopBeyondTip { height, tip });
        }
        let popped = inner.blocks.split_off(height as usize);
        for block in popped.iter().rev() {
            inner.unindex(block);
        }
        Ok(popped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainBuilder;

    #[test]
    fn push_requires_next_height_and_unique_hash() {
        let builder = ChainBuilder::regtest();
        let genesis = builder.genesis();
        let store = NullChainStore::new(genesis.clone());
        let block = builder.pow_block(&genesis.header, 0, Vec::new());

        assert!(matches!(
            store.push(block.clone(), 2),
            Err(StoreError::HeightMismatch { expected: 1, actual: 2 })
        ));
        store.push(block.clone(), 1).unwrap();
        assert_eq!(store.last_height().unwrap(), 1);
        assert_eq!(store.height_of(&block.hash()).unwrap(), Some(1));
    }

    #[test]
    fn pop_returns_ascending_blocks_and_unindexes() {
        let builder = ChainBuilder::regtest();
        let genesis = builder.genesis();
        let store = NullChainStore::new(genesis.clone());
        let blocks = builder.pow_chain(&genesis.header, 3, 0);
        for (i, b) in blocks.iter().enumerate() {
            store.push(b.clone(), i as u64 + 1).unwrap();
        }

        let popped = store.pop_from(2).unwrap();
        assert_eq!(popped, blocks[1..].to_vec());
        assert_eq!(store.last_height().unwrap(), 1);
        let coinbase = blocks[2].transactions[0].hash();
        assert!(store.transaction_by_hash(&coinbase).unwrap().is_none());
        assert!(store.pop_from(2).unwrap().is_empty());
    }

    #[test]
    fn difficulty_sums_work_from_height() {
        let builder = ChainBuilder::regtest();
        let genesis = builder.genesis();
        let store = NullChainStore::new(genesis.clone());
        for (i, b) in builder.pow_chain(&genesis.header, 2, 0).into_iter().enumerate() {
            store.push(b, i as u64 + 1).unwrap();
        }
        let per_block = block_work(genesis.header.bits);
        assert_eq!(store.difficulty_at(1).unwrap(), per_block * U256::from(2));
        assert_eq!(store.difficulty_at(3).unwrap(), U256::zero());
    }

    #[test]
    fn registrations_record_and_drop_with_their_block() {
        let builder = ChainBuilder::regtest();
        let genesis = builder.genesis();
        let store = NullChainStore::new(genesis.clone());
        let mut issue = ChainBuilder::spend(&genesis.transactions[0], 0, 1, &ChainBuilder::key(3).public);
        issue.outputs[0].attachment = Attachment::AssetIssue {
            symbol: "GOLD".to_string(),
        };
        let block = builder.pow_block(&genesis.header, 0, vec![issue]);
        store.push(block, 1).unwrap();
        assert_eq!(store.asset_height("GOLD").unwrap(), Some(1));

        store.pop_from(1).unwrap();
        assert_eq!(store.asset_height("GOLD").unwrap(), None);
    }

    #[test]
    fn injected_failures_fire() {
        let builder = ChainBuilder::regtest();
        let genesis = builder.genesis();
        let store = NullChainStore::new(genesis.clone());
        store.fail_push_at(1);
        let block = builder.pow_block(&genesis.header, 0, Vec::new());
        assert!(matches!(store.push(block, 1), Err(StoreError::Backend(_))));

        store.fail_next_pop();
        assert!(store.pop_from(1).is_err());
        assert!(store.pop_from(1).unwrap().is_empty());
    }
}
