//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the organizer talks to (clock, chain store, mempool,
//! script engine) is abstracted behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! [`ChainBuilder`] mines valid regtest blocks to feed them.

pub mod chain_builder;
pub mod clock;
pub mod mempool;
pub mod script;
pub mod store;

pub use chain_builder::ChainBuilder;
pub use clock::NullClock;
pub use mempool::NullMempool;
pub use script::NullScriptEngine;
pub use store::NullChainStore;
