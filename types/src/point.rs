//! Output points: references to a specific output of a previous transaction.

use crate::hash::TxHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one output of a transaction by hash and index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: TxHash,
    pub index: u32,
}

impl OutPoint {
    /// The out-point spent by a coinbase input.
    pub const NULL: Self = Self {
        hash: TxHash::ZERO,
        index: u32::MAX,
    };

    pub fn new(hash: TxHash, index: u32) -> Self {
        Self { hash, index }
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX && self.hash.is_zero()
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.hash, self.index)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.index)
    }
}
