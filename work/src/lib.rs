//! Proof-of-work arithmetic.
//!
//! Targets are carried in headers as Bitcoin-style compact `bits`. The work
//! a block contributes to its chain is `2^256 / (target + 1)`, and fork choice
//! compares the sum of that value over competing runs of blocks.

pub mod difficulty;
pub mod error;
pub mod generator;
pub mod validator;

pub use difficulty::{block_work, compact_to_target, retarget_bits, target_to_compact};
pub use error::WorkError;
pub use generator::WorkGenerator;
pub use validator::check_proof_of_work;

/// The result of PoW generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkNonce(pub u64);
