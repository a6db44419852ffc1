//! Proof-of-work validation.

use mvs_types::{BlockHash, U256};

use crate::difficulty::compact_to_target;
use crate::WorkError;

/// Check that `hash` meets the target encoded in `bits`, and that the target
/// itself is no easier than `limit_bits`.
pub fn check_proof_of_work(hash: &BlockHash, bits: u32, limit_bits: u32) -> Result<(), WorkError> {
    let target = match compact_to_target(bits) {
        Some(target) if !target.is_zero() => target,
        _ => return Err(WorkError::InvalidBits(bits)),
    };
    let limit = compact_to_target(limit_bits).ok_or(WorkError::InvalidBits(limit_bits))?;
    if target > limit {
        return Err(WorkError::AboveLimit { bits, limit: limit_bits });
    }
    if U256::from_big_endian(hash.as_bytes()) > target {
        return Err(WorkError::InsufficientWork(bits));
    }
    Ok(())
}
