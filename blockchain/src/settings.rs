//! Blockchain settings (operator configuration) and chain parameters
//! (consensus constants per network).

use mvs_consensus::{StakeParams, WitnessParams, COIN};
use mvs_types::NetworkId;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{Checkpoint, Checkpoints};
use crate::BlockchainError;

fn default_block_pool_capacity() -> usize {
    5_000
}

fn default_parallel_connect() -> bool {
    true
}

/// A checkpoint as written in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub height: u64,
    /// 64 hex characters.
    pub hash: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockchainSettings {
    #[serde(default)]
    pub network: NetworkId,

    /// Maximum blocks held in the orphan pool.
    #[serde(default = "default_block_pool_capacity")]
    pub block_pool_capacity: usize,

    /// Apply testnet consensus parameters regardless of `network`.
    #[serde(default)]
    pub use_testnet_rules: bool,

    #[serde(default)]
    pub checkpoints: Vec<CheckpointConfig>,

    /// Check transaction inputs on the rayon pool.
    #[serde(default = "default_parallel_connect")]
    pub parallel_connect: bool,
}

impl Default for BlockchainSettings {
    fn default() -> Self {
        Self {
            network: NetworkId::default(),
            block_pool_capacity: default_block_pool_capacity(),
            use_testnet_rules: false,
            checkpoints: Vec::new(),
            parallel_connect: default_parallel_connect(),
        }
    }
}

impl BlockchainSettings {
    pub fn params(&self) -> ChainParams {
        if self.use_testnet_rules {
            ChainParams::for_network(NetworkId::Testnet)
        } else {
            ChainParams::for_network(self.network)
        }
    }

    /// Parse the configured checkpoints into a sorted list.
    pub fn checkpoints(&self) -> Result<Checkpoints, BlockchainError> {
        let parsed = self
            .checkpoints
            .iter()
            .map(|c| {
                Checkpoint::from_hex(c.height, &c.hash).ok_or_else(|| {
                    BlockchainError::Config(format!("invalid checkpoint hash at {}: {}", c.height, c.hash))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Checkpoints::new(parsed))
    }
}

/// Consensus constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainParams {
    pub network: NetworkId,

    /// Easiest allowed target, compact encoded.
    pub pow_limit_bits: u32,
    /// Whether PoW difficulty retargets at interval boundaries.
    pub retarget: bool,
    pub retarget_interval: u64,
    pub target_spacing: u64,
    pub target_timespan: u64,

    /// Seconds a block timestamp may run ahead of local time.
    pub timestamp_future_window: u64,
    /// From this height a block may not be older than its predecessor.
    pub monotonic_timestamp_height: u64,

    pub max_block_size: u64,
    pub max_block_sigops: usize,
    pub coinbase_maturity: u64,
    pub max_money: u64,

    pub initial_subsidy: u64,
    pub subsidy_halving_interval: u64,
    pub pos_reward: u64,
    pub dpos_reward: u64,
    /// Mining-subsidy token paid alongside the coinbase.
    pub mst_symbol: String,
    pub initial_mst_subsidy: u64,
    pub mst_halving_interval: u64,

    /// Preceding blocks sampled for the minimum version rule.
    pub version_sample: usize,
    /// Blocks at or above a version needed to enforce it.
    pub version_enforce: usize,

    /// A losing fork whose length is a multiple of this asks peers for more blocks.
    pub locator_size: usize,

    pub stake: StakeParams,
    pub witness: WitnessParams,
}

const MAX_BLOCK_SIZE: u64 = 1_000_000;

impl ChainParams {
    pub fn mainnet() -> Self {
        Self {
            network: NetworkId::Mainnet,
            pow_limit_bits: 0x1d00_ffff,
            retarget: true,
            retarget_interval: 2_016,
            target_spacing: 600,
            target_timespan: 2_016 * 600,
            timestamp_future_window: 2 * 60 * 60,
            monotonic_timestamp_height: 1_270_000,
            max_block_size: MAX_BLOCK_SIZE,
            max_block_sigops: (MAX_BLOCK_SIZE / 50) as usize,
            coinbase_maturity: 1_000,
            max_money: 100_000_000 * COIN,
            initial_subsidy: 3 * COIN,
            subsidy_halving_interval: 4_000_000,
            pos_reward: COIN,
            dpos_reward: COIN,
            mst_symbol: "MST.ETP".to_string(),
            initial_mst_subsidy: 10_000,
            mst_halving_interval: 500_000,
            version_sample: 100,
            version_enforce: 75,
            locator_size: 500,
            stake: StakeParams::mainnet(),
            witness: WitnessParams::mainnet(),
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: NetworkId::Testnet,
            monotonic_timestamp_height: 0,
            coinbase_maturity: 100,
            version_sample: 1_000,
            version_enforce: 950,
            stake: StakeParams::testnet(),
            witness: WitnessParams::testnet(),
            ..Self::mainnet()
        }
    }

    /// Trivial difficulty, no retargeting, short maturities.
    pub fn regtest() -> Self {
        Self {
            network: NetworkId::Regtest,
            pow_limit_bits: 0x207f_ffff,
            retarget: false,
            monotonic_timestamp_height: 0,
            coinbase_maturity: 2,
            subsidy_halving_interval: 150,
            mst_halving_interval: 150,
            locator_size: 5,
            stake: StakeParams::regtest(),
            witness: WitnessParams::regtest(),
            ..Self::mainnet()
        }
    }

    pub fn for_network(network: NetworkId) -> Self {
        match network {
            NetworkId::Mainnet => Self::mainnet(),
            NetworkId::Testnet => Self::testnet(),
            NetworkId::Regtest => Self::regtest(),
        }
    }

    /// PoW block subsidy, halving every `subsidy_halving_interval` blocks.
    pub fn pow_subsidy(&self, height: u64) -> u64 {
        let halvings = height / self.subsidy_halving_interval.max(1);
        if halvings >= 64 {
            0
        } else {
            self.initial_subsidy >> halvings
        }
    }

    /// Mining-subsidy token reward at `height`.
    pub fn mst_subsidy(&self, height: u64) -> u64 {
        let halvings = height / self.mst_halving_interval.max(1);
        if halvings >= 64 {
            0
        } else {
            self.initial_mst_subsidy >> halvings
        }
    }
}
