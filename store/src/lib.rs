//! Abstract storage traits for the chain.
//!
//! Every storage backend (memory-mapped tables, in-memory for testing) implements
//! these traits. The consensus engine depends only on the traits.

pub mod asset;
pub mod block;
pub mod error;
pub mod transaction;
pub mod writer;

pub use asset::AssetStore;
pub use block::BlockStore;
pub use error::StoreError;
pub use transaction::TransactionStore;
pub use writer::ChainWriter;

/// The full persisted-chain collaborator.
pub trait ChainStore: BlockStore + TransactionStore + AssetStore + ChainWriter + Send + Sync {}

impl<T> ChainStore for T where T: BlockStore + TransactionStore + AssetStore + ChainWriter + Send + Sync {}
