//! Block validation in three stages of increasing cost.
//!
//! - `check_block`: proof, signature, timestamp and structural rules.
//! - `accept_block`: work target and minimum version for the height.
//! - `connect_block`: inputs, fees, rewards and business-object uniqueness.
//!   Only run past the last checkpoint.
//!
//! Every loop polls the stop signal and bails out with
//! [`ValidationError::ServiceStopped`].

mod accept;
mod check;
mod connect;
pub mod proof;

use mvs_consensus::WitnessRegistry;
use mvs_utils::Clock;

use crate::cancel::StopSignal;
use crate::checkpoint::Checkpoints;
use crate::collaborators::{Mempool, ScriptEngine};
use crate::settings::ChainParams;
use crate::ValidationError;

pub use accept::work_required;
pub use proof::ProofRules;

/// Borrowed collaborators for one verification pass.
#[derive(Clone, Copy)]
pub struct BlockValidator<'a> {
    pub params: &'a ChainParams,
    pub checkpoints: &'a Checkpoints,
    pub witness: &'a dyn WitnessRegistry,
    pub scripts: &'a dyn ScriptEngine,
    pub mempool: &'a dyn Mempool,
    pub clock: &'a dyn Clock,
    pub stop: &'a StopSignal,
    /// Check transaction inputs on the rayon pool.
    pub parallel: bool,
}

impl BlockValidator<'_> {
    fn poll(&self) -> Result<(), ValidationError> {
        if self.stop.is_stopped() {
            Err(ValidationError::ServiceStopped)
        } else {
            Ok(())
        }
    }
}
