//! Transaction and spend lookups.

use crate::StoreError;
use mvs_types::{OutPoint, Transaction, TxHash};

pub trait TransactionStore {
    /// A main-chain transaction and the height of the block containing it.
    fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<(Transaction, u64)>, StoreError>;

    /// Hash of the main-chain transaction spending `outpoint`, if any.
    fn outpoint_spender(&self, outpoint: &OutPoint) -> Result<Option<TxHash>, StoreError>;
}
