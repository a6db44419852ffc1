//! Main-chain block and header lookups.

use crate::StoreError;
use mvs_types::{Block, BlockHash, Header, U256};

/// Read access to the main chain, indexed by height.
pub trait BlockStore {
    /// Header of the main-chain block at `height`.
    fn header_at(&self, height: u64) -> Result<Option<Header>, StoreError>;

    /// Full main-chain block at `height`.
    fn block_at(&self, height: u64) -> Result<Option<Block>, StoreError>;

    /// Height of a main-chain block, `None` if it is not on the main chain.
    fn height_of(&self, hash: &BlockHash) -> Result<Option<u64>, StoreError>;

    /// Height of the current tip.
    fn last_height(&self) -> Result<u64, StoreError>;

    /// Cumulative work of the main chain from `height` up to and including the
    /// tip. Zero when `height` is above the tip.
    fn difficulty_at(&self, height: u64) -> Result<U256, StoreError>;
}
