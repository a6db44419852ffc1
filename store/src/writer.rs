//! Main-chain mutation.

use crate::StoreError;
use mvs_types::Block;

/// Appends and removes main-chain blocks.
///
/// Callers serialise all writes behind a single write lock.
pub trait ChainWriter {
    /// Append `block` at `height`, which must be `last_height() + 1`.
    /// Implementations reject a block whose hash is already stored.
    fn push(&self, block: Block, height: u64) -> Result<(), StoreError>;

    /// Remove every block from `height` to the tip, returning them in
    /// ascending height order. Popping from `tip + 1` removes nothing.
    fn pop_from(&self, height: u64) -> Result<Vec<Block>, StoreError>;
}
