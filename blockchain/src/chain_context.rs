//! Lookups across the main chain and an in-flight candidate chain.
//!
//! A candidate chain forks off the main chain at `fork_height`. While block
//! `index` of the candidate is verified, the visible chain is the main chain
//! up to the fork followed by candidate blocks `0..=index`. [`StoreView`]
//! answers for the first part, [`CandidateView`] for the second, and
//! [`ChainContext`] asks the candidate first and falls back to the store.

use std::sync::Arc;

use mvs_consensus::{StakeHolder, WitnessContext};
use mvs_store::{ChainStore, StoreError};
use mvs_types::{Attachment, Block, CertType, Header, OutPoint, Transaction, TxHash};

use crate::block_detail::BlockDetail;

/// Position of a transaction input, used to keep an input from counting as
/// its own double spend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputRef {
    pub height: u64,
    pub tx_index: usize,
    pub input_index: usize,
}

/// One layer of the visible chain.
pub trait ChainView: Sync {
    fn header_at(&self, height: u64) -> Result<Option<Header>, StoreError>;

    fn block_at(&self, height: u64) -> Result<Option<Block>, StoreError>;

    /// A visible transaction and the height of the block holding it.
    fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<(Transaction, u64)>, StoreError>;

    /// Whether a visible input other than `spender` consumes `outpoint`.
    fn is_output_spent(&self, outpoint: &OutPoint, spender: Option<InputRef>) -> Result<bool, StoreError>;

    fn asset_exists(&self, symbol: &str) -> Result<bool, StoreError>;

    fn cert_exists(&self, symbol: &str, cert: CertType) -> Result<bool, StoreError>;

    fn mit_exists(&self, symbol: &str) -> Result<bool, StoreError>;

    fn did_exists(&self, symbol: &str) -> Result<bool, StoreError>;
}

/// The persisted main chain, cut off at `fork_height`.
#[derive(Clone, Copy)]
pub struct StoreView<'a> {
    store: &'a dyn ChainStore,
    fork_height: u64,
}

impl<'a> StoreView<'a> {
    pub fn new(store: &'a dyn ChainStore, fork_height: u64) -> Self {
        Self { store, fork_height }
    }

    pub fn fork_height(&self) -> u64 {
        self.fork_height
    }

    /// Registrations above the fork belong to blocks about to be popped.
    fn visible(&self, registered_at: Option<u64>) -> bool {
        registered_at.is_some_and(|height| height <= self.fork_height)
    }
}

impl ChainView for StoreView<'_> {
    fn header_at(&self, height: u64) -> Result<Option<Header>, StoreError> {
        if height > self.fork_height {
            return Ok(None);
        }
        self.store.header_at(height)
    }

    fn block_at(&self, height: u64) -> Result<Option<Block>, StoreError> {
        if height > self.fork_height {
            return Ok(None);
        }
        self.store.block_at(height)
    }

    fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<(Transaction, u64)>, StoreError> {
        Ok(self
            .store
            .transaction_by_hash(hash)?
            .filter(|(_, height)| *height <= self.fork_height))
    }

    fn is_output_spent(&self, outpoint: &OutPoint, _spender: Option<InputRef>) -> Result<bool, StoreError> {
        let Some(spender) = self.store.outpoint_spender(outpoint)? else {
            return Ok(false);
        };
        Ok(self.transaction_by_hash(&spender)?.is_some())
    }

    fn asset_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self.visible(self.store.asset_height(symbol)?))
    }

    fn cert_exists(&self, symbol: &str, cert: CertType) -> Result<bool, StoreError> {
        Ok(self.visible(self.store.cert_height(symbol, cert)?))
    }

    fn mit_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self.visible(self.store.mit_height(symbol)?))
    }

    fn did_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self.visible(self.store.did_height(symbol)?))
    }
}

/// Candidate blocks `0..=index`, block `i` sitting at `fork_height + 1 + i`.
#[derive(Clone, Copy)]
pub struct CandidateView<'a> {
    fork_height: u64,
    chain: &'a [Arc<BlockDetail>],
}

impl<'a> CandidateView<'a> {
    pub fn new(fork_height: u64, chain: &'a [Arc<BlockDetail>], index: usize) -> Self {
        let end = (index + 1).min(chain.len());
        Self {
            fork_height,
            chain: &chain[..end],
        }
    }

    fn height_of_index(&self, index: usize) -> u64 {
        self.fork_height + 1 + index as u64
    }

    fn detail_at(&self, height: u64) -> Option<&'a Arc<BlockDetail>> {
        let offset = height.checked_sub(self.fork_height + 1)?;
        self.chain.get(usize::try_from(offset).ok()?)
    }

    /// Blocks before the one being verified.
    fn ancestors(&self) -> impl Iterator<Item = &'a Block> {
        let chain = self.chain;
        chain[..chain.len().saturating_sub(1)].iter().map(|d| d.block())
    }

    fn ancestor_attachments(&self) -> impl Iterator<Item = &'a Attachment> {
        self.ancestors()
            .flat_map(|b| b.transactions.iter())
            .flat_map(|tx| tx.outputs.iter())
            .map(|o| &o.attachment)
    }
}

impl ChainView for CandidateView<'_> {
    fn header_at(&self, height: u64) -> Result<Option<Header>, StoreError> {
        Ok(self.detail_at(height).map(|d| d.block().header.clone()))
    }

    fn block_at(&self, height: u64) -> Result<Option<Block>, StoreError> {
        Ok(self.detail_at(height).map(|d| d.block().clone()))
    }

    fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<(Transaction, u64)>, StoreError> {
        for (index, detail) in self.chain.iter().enumerate() {
            if let Some(tx) = detail.block().transactions.iter().find(|tx| tx.hash() == *hash) {
                return Ok(Some((tx.clone(), self.height_of_index(index))));
            }
        }
        Ok(None)
    }

    fn is_output_spent(&self, outpoint: &OutPoint, spender: Option<InputRef>) -> Result<bool, StoreError> {
        for (index, detail) in self.chain.iter().enumerate() {
            let height = self.height_of_index(index);
            for (tx_index, tx) in detail.block().transactions.iter().enumerate() {
                for (input_index, input) in tx.inputs.iter().enumerate() {
                    let here = InputRef {
                        height,
                        tx_index,
                        input_index,
                    };
                    if spender == Some(here) {
                        continue;
                    }
                    if input.previous_output == *outpoint {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn asset_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self
            .ancestor_attachments()
            .any(|a| matches!(a, Attachment::AssetIssue { symbol: s } if s == symbol)))
    }

    fn cert_exists(&self, symbol: &str, cert: CertType) -> Result<bool, StoreError> {
        Ok(self.ancestor_attachments().any(
            |a| matches!(a, Attachment::AssetCert { symbol: s, cert: c } if s == symbol && *c == cert),
        ))
    }

    fn mit_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self
            .ancestor_attachments()
            .any(|a| matches!(a, Attachment::AssetMit { symbol: s } if s == symbol)))
    }

    fn did_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self
            .ancestor_attachments()
            .any(|a| matches!(a, Attachment::DidRegister { symbol: s, .. } if s == symbol)))
    }
}

/// The chain as seen while verifying candidate block `index`.
pub struct ChainContext<'a> {
    store: StoreView<'a>,
    candidate: CandidateView<'a>,
    current: &'a Arc<BlockDetail>,
    index: usize,
}

impl<'a> ChainContext<'a> {
    /// `index` must be within `chain`.
    pub fn new(
        store: &'a dyn ChainStore,
        fork_height: u64,
        chain: &'a [Arc<BlockDetail>],
        index: usize,
    ) -> Self {
        Self {
            store: StoreView::new(store, fork_height),
            candidate: CandidateView::new(fork_height, chain, index),
            current: &chain[index],
            index,
        }
    }

    pub fn fork_height(&self) -> u64 {
        self.store.fork_height()
    }

    /// Height the block under verification would occupy.
    pub fn height(&self) -> u64 {
        self.fork_height() + 1 + self.index as u64
    }

    pub fn current(&self) -> &'a BlockDetail {
        self.current
    }

    /// Header at `height`, or a not-found store error.
    pub fn require_header(&self, height: u64) -> Result<Header, StoreError> {
        ChainView::header_at(self, height)?
            .ok_or_else(|| StoreError::NotFound(format!("header at height {height}")))
    }

    /// Like `transaction_by_hash`, ignoring the block under verification.
    pub fn previous_transaction(&self, hash: &TxHash) -> Result<Option<(Transaction, u64)>, StoreError> {
        let ancestors = CandidateView {
            fork_height: self.candidate.fork_height,
            chain: &self.candidate.chain[..self.index],
        };
        match ancestors.transaction_by_hash(hash)? {
            Some(found) => Ok(Some(found)),
            None => self.store.transaction_by_hash(hash),
        }
    }
}

impl ChainView for ChainContext<'_> {
    fn header_at(&self, height: u64) -> Result<Option<Header>, StoreError> {
        match self.candidate.header_at(height)? {
            Some(header) => Ok(Some(header)),
            None => ChainView::header_at(&self.store, height),
        }
    }

    fn block_at(&self, height: u64) -> Result<Option<Block>, StoreError> {
        match self.candidate.block_at(height)? {
            Some(block) => Ok(Some(block)),
            None => ChainView::block_at(&self.store, height),
        }
    }

    fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<(Transaction, u64)>, StoreError> {
        match self.candidate.transaction_by_hash(hash)? {
            Some(found) => Ok(Some(found)),
            None => self.store.transaction_by_hash(hash),
        }
    }

    fn is_output_spent(&self, outpoint: &OutPoint, spender: Option<InputRef>) -> Result<bool, StoreError> {
        Ok(self.candidate.is_output_spent(outpoint, spender)? || self.store.is_output_spent(outpoint, spender)?)
    }

    fn asset_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self.candidate.asset_exists(symbol)? || self.store.asset_exists(symbol)?)
    }

    fn cert_exists(&self, symbol: &str, cert: CertType) -> Result<bool, StoreError> {
        Ok(self.candidate.cert_exists(symbol, cert)? || self.store.cert_exists(symbol, cert)?)
    }

    fn mit_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self.candidate.mit_exists(symbol)? || self.store.mit_exists(symbol)?)
    }

    fn did_exists(&self, symbol: &str) -> Result<bool, StoreError> {
        Ok(self.candidate.did_exists(symbol)? || self.store.did_exists(symbol)?)
    }
}

fn stake_holders(store: &dyn ChainStore, lock_until: u64) -> Vec<StakeHolder> {
    match store.witness_stakes(lock_until) {
        Ok(stakes) => stakes
            .into_iter()
            .map(|(public_key, stake)| StakeHolder::new(public_key, stake))
            .collect(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load witness stakes");
            Vec::new()
        }
    }
}

// Witness lookups treat store failures as missing data; the caller reports
// a missing header or vote block.
impl WitnessContext for StoreView<'_> {
    fn header_at(&self, height: u64) -> Option<Header> {
        ChainView::header_at(self, height).ok().flatten()
    }

    fn block_at(&self, height: u64) -> Option<Block> {
        ChainView::block_at(self, height).ok().flatten()
    }

    fn stake_holders(&self, lock_until: u64) -> Vec<StakeHolder> {
        stake_holders(self.store, lock_until)
    }
}

impl WitnessContext for ChainContext<'_> {
    fn header_at(&self, height: u64) -> Option<Header> {
        ChainView::header_at(self, height).ok().flatten()
    }

    fn block_at(&self, height: u64) -> Option<Block> {
        ChainView::block_at(self, height).ok().flatten()
    }

    fn stake_holders(&self, lock_until: u64) -> Vec<StakeHolder> {
        stake_holders(self.store.store, lock_until)
    }
}
