//! Witness parameters and epoch arithmetic.
//!
//! An epoch is `epoch_cycle_height` blocks long, counted from `enable_height`.
//! The block at the beginning of each epoch carries the vote result that fixes
//! the witness list for the rest of the epoch. Within an epoch the witnesses
//! take turns in rounds of `witness_count` blocks.

use mvs_types::NetworkId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessParams {
    /// First height at which DPoS blocks are accepted.
    pub enable_height: u64,
    /// Committee size.
    pub witness_number: u32,
    pub epoch_cycle_height: u64,
    /// Blocks on either side of an epoch boundary during which a vote is not yet settled.
    pub vote_maturity: u64,
    /// Candidates considered after sorting by stake.
    pub max_candidate_count: u32,
    /// How far past the epoch a candidate's stake must remain locked.
    pub register_lock_height: u64,
}

impl WitnessParams {
    pub fn mainnet() -> Self {
        Self {
            enable_height: 2_000_000,
            witness_number: 23,
            epoch_cycle_height: 20_000,
            vote_maturity: 24,
            max_candidate_count: 10_000,
            register_lock_height: 10_000,
        }
    }

    pub fn testnet() -> Self {
        Self {
            enable_height: 1_000_000,
            witness_number: 5,
            epoch_cycle_height: 1_000,
            vote_maturity: 6,
            max_candidate_count: 10_000,
            register_lock_height: 500,
        }
    }

    pub fn regtest() -> Self {
        Self {
            enable_height: 100,
            witness_number: 23,
            epoch_cycle_height: 100,
            vote_maturity: 6,
            max_candidate_count: 10_000,
            register_lock_height: 50,
        }
    }

    pub fn for_network(network: NetworkId) -> Self {
        match network {
            NetworkId::Mainnet => Self::mainnet(),
            NetworkId::Testnet => Self::testnet(),
            NetworkId::Regtest => Self::regtest(),
        }
    }

    pub fn is_witness_enabled(&self, height: u64) -> bool {
        height >= self.enable_height
    }

    /// Offset of `height` within its epoch. Zero before enablement.
    pub fn height_in_epoch(&self, height: u64) -> u64 {
        if !self.is_witness_enabled(height) {
            return 0;
        }
        (height - self.enable_height) % self.epoch_cycle_height.max(1)
    }

    /// Height of the block carrying the vote result for `height`'s epoch,
    /// zero when witnesses are not enabled.
    pub fn vote_result_height(&self, height: u64) -> u64 {
        if self.is_witness_enabled(height) {
            height - self.height_in_epoch(height)
        } else {
            0
        }
    }

    pub fn is_begin_of_epoch(&self, height: u64) -> bool {
        self.is_witness_enabled(height) && self.height_in_epoch(height) == 0
    }

    /// Two heights share an epoch when they resolve to the same vote result, or
    /// when the later epoch began less than `vote_maturity` blocks after the
    /// earlier height.
    pub fn is_in_same_epoch(&self, a: u64, b: u64) -> bool {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let vote_low = self.vote_result_height(low);
        let vote_high = self.vote_result_height(high);

        if vote_low == vote_high {
            return true;
        }
        if vote_high == vote_low + self.epoch_cycle_height {
            return vote_high - low < self.vote_maturity;
        }
        false
    }

    /// First height of the signing round containing `height`, zero when
    /// disabled or the committee is empty.
    pub fn round_begin_height(&self, height: u64, witness_count: usize) -> u64 {
        if !self.is_witness_enabled(height) || witness_count == 0 {
            return 0;
        }
        height - (height - self.enable_height) % witness_count as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> WitnessParams {
        WitnessParams {
            enable_height: 100,
            witness_number: 3,
            epoch_cycle_height: 10,
            vote_maturity: 2,
            max_candidate_count: 10,
            register_lock_height: 5,
        }
    }

    #[test]
    fn disabled_before_enable_height() {
        let p = params();
        assert!(!p.is_witness_enabled(99));
        assert_eq!(p.vote_result_height(99), 0);
        assert!(!p.is_begin_of_epoch(99));
    }

    #[test]
    fn epoch_boundaries() {
        let p = params();
        assert!(p.is_begin_of_epoch(100));
        assert!(p.is_begin_of_epoch(110));
        assert!(!p.is_begin_of_epoch(115));
        assert_eq!(p.height_in_epoch(117), 7);
        assert_eq!(p.vote_result_height(117), 110);
    }

    #[test]
    fn same_epoch_respects_vote_maturity() {
        let p = params();
        assert!(p.is_in_same_epoch(111, 119));
        // 109 is one block before the 110 vote: still the same vote window.
        assert!(p.is_in_same_epoch(109, 112));
        // 105 is five blocks before it: a different epoch.
        assert!(!p.is_in_same_epoch(105, 112));
        assert!(!p.is_in_same_epoch(101, 125));
    }

    #[test]
    fn round_begin_tracks_committee_size() {
        let p = params();
        assert_eq!(p.round_begin_height(100, 3), 100);
        assert_eq!(p.round_begin_height(104, 3), 103);
        assert_eq!(p.round_begin_height(104, 0), 0);
    }
}
