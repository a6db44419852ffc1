//! Consensus rules beyond proof of work.
//!
//! - [`epoch`]: witness parameters and epoch arithmetic.
//! - [`witness`]: the DPoS witness registry, vote results and signer slots.
//! - [`fts`]: follow-the-satoshi stake-weighted selection.
//! - [`pos`]: proof-of-stake kernel and stake capability.

pub mod epoch;
pub mod error;
pub mod fts;
pub mod pos;
pub mod witness;

pub use epoch::WitnessParams;
pub use error::ConsensusError;
pub use fts::{hash_to_seed, select_by_fts, StakeHolder};
pub use pos::{check_stake_kernel, stake_kernel_hash, StakeParams, COIN};
pub use witness::{
    calc_mixhash, calc_witness_list, create_vote_result_output, verify_vote_result,
    WitnessContext, WitnessRegistry, WitnessSchedule, WitnessSnapshot,
};
