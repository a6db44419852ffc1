use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("block at height {actual} does not extend tip, expected height {expected}")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("cannot pop from height {height}, tip is {tip}")]
    PopBeyondTip { height: u64, tip: u64 },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}
