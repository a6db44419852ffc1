use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("compact target {0:#010x} is negative, zero or overflows")]
    InvalidBits(u32),

    #[error("target {bits:#010x} is easier than the limit {limit:#010x}")]
    AboveLimit { bits: u32, limit: u32 },

    #[error("hash does not meet target {0:#010x}")]
    InsufficientWork(u32),

    #[error("nonce search exhausted after {0} attempts")]
    Exhausted(u64),
}
