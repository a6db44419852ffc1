use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("header at height {0} is unavailable")]
    MissingHeader(u64),

    #[error("vote result block at height {0} is unavailable")]
    MissingVoteBlock(u64),

    #[error("height {0} is not the beginning of an epoch")]
    NotBeginOfEpoch(u64),

    #[error("invalid vote result at height {height}: {reason}")]
    InvalidVoteResult { height: u64, reason: &'static str },

    #[error("vote result mixhash mismatch at height {0}")]
    MixhashMismatch(u64),
}
