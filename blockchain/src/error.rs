use mvs_consensus::ConsensusError;
use mvs_store::StoreError;
use mvs_types::{BlockHash, TxHash};
use thiserror::Error;

/// Why a block failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block size or transaction count out of limits")]
    SizeLimits,

    #[error("declared height {declared} does not match position {expected}")]
    HeightMismatch { expected: u64, declared: u64 },

    #[error("proof of work does not meet its target")]
    ProofOfWork,

    #[error("bits {actual:#010x} differ from required {expected:#010x}")]
    IncorrectProofOfWork { expected: u32, actual: u32 },

    #[error("invalid proof of stake: {0}")]
    ProofOfStake(&'static str),

    #[error("dpos is not enabled at this height")]
    WitnessNotEnabled,

    #[error("signer does not own the witness slot")]
    WitnessMismatch,

    #[error("witness vote result rejected: {0}")]
    VoteResult(ConsensusError),

    #[error("block timestamp too far in the future")]
    FuturisticTimestamp,

    #[error("block timestamp earlier than its predecessor")]
    TimestampTooEarly,

    #[error("block hash conflicts with a checkpoint")]
    CheckpointsFailed,

    #[error("missing or invalid block signature")]
    BlockSignature,

    #[error("first transaction is not a coinbase")]
    FirstNotCoinbase,

    #[error("more than one coinbase")]
    ExtraCoinbases,

    #[error("coinbase outputs are malformed")]
    InvalidCoinbaseOutputs,

    #[error("coinstake missing from second position")]
    MissingCoinstake,

    #[error("more than one coinstake")]
    ExtraCoinstakes,

    #[error("transaction {hash} is malformed: {reason}")]
    InvalidTransaction { hash: TxHash, reason: &'static str },

    #[error("duplicate transaction in block")]
    Duplicate,

    #[error("too many signature operations")]
    TooManySigs,

    #[error("merkle root mismatch")]
    MerkleMismatch,

    #[error("block version below the enforced minimum {0}")]
    OldVersionBlock(u32),

    #[error("transaction duplicates an unspent one")]
    DuplicateOrSpent,

    #[error("inputs of transaction {0} failed validation")]
    ValidateInputsFailed(TxHash),

    #[error("transaction fees out of range")]
    FeesOutOfRange,

    #[error("coinbase pays more than subsidy plus fees")]
    CoinbaseTooLarge,

    #[error("mining token reward too large")]
    MstRewardTooLarge,

    #[error("asset {0} already exists")]
    DuplicateAsset(String),

    #[error("certificate for {0} already issued")]
    DuplicateCert(String),

    #[error("mit {0} already exists")]
    DuplicateMit(String),

    #[error("did {0} already exists")]
    DuplicateDid(String),

    #[error("previous block is invalid")]
    PreviousBlockInvalid,

    #[error("service stopped")]
    ServiceStopped,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ValidationError {
    /// Cancellation, never a verdict on the block.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::ServiceStopped)
    }

    /// Failures that say nothing about the block itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceStopped | Self::Store(_))
    }
}

#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("block {0} already known")]
    Duplicate(BlockHash),

    #[error("service stopped")]
    ServiceStopped,
}
