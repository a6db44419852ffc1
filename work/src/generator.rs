//! Proof-of-work nonce search (multi-threaded CPU).

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::validator::check_proof_of_work;
use crate::{WorkError, WorkNonce};
use mvs_types::Header;

/// Searches the nonce space of a header using all available CPU cores.
pub struct WorkGenerator {
    /// Total nonces tried before giving up.
    pub max_attempts: u64,
}

impl Default for WorkGenerator {
    fn default() -> Self {
        Self {
            max_attempts: 1 << 32,
        }
    }
}

/// Batch size per thread before checking the found flag.
const BATCH_SIZE: u64 = 4096;

impl WorkGenerator {
    /// Find a nonce for which the header hash meets `header.bits`.
    ///
    /// Splits the nonce space across rayon threads by stride. The first thread
    /// to succeed signals the others to stop; the lowest nonce found wins so
    /// the result is deterministic.
    pub fn generate(&self, header: &Header, limit_bits: u32) -> Result<WorkNonce, WorkError> {
        let found = AtomicU64::new(u64::MAX);
        let num_threads = rayon::current_num_threads().max(1) as u64;
        let max_attempts = self.max_attempts;

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let mut candidate = header.clone();
            let mut nonce = thread_id;

            while nonce < max_attempts {
                if found.load(Ordering::Relaxed) < nonce {
                    return;
                }

                let end = nonce
                    .saturating_add(BATCH_SIZE * num_threads)
                    .min(max_attempts);
                while nonce < end {
                    candidate.nonce = nonce;
                    if check_proof_of_work(&candidate.hash(), candidate.bits, limit_bits).is_ok() {
                        found.fetch_min(nonce, Ordering::Relaxed);
                        return;
                    }
                    nonce += num_threads;
                }
            }
        });

        match found.load(Ordering::Relaxed) {
            u64::MAX => Err(WorkError::Exhausted(max_attempts)),
            nonce => Ok(WorkNonce(nonce)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvs_types::{BlockHash, ProofKind, TxHash};

    const LIMIT: u32 = 0x207f_ffff;

    fn header(bits: u32) -> Header {
        Header {
            version: 1,
            proof: ProofKind::Pow,
            previous_hash: BlockHash::new([0x42; 32]),
            merkle_root: TxHash::ZERO,
            timestamp: 1_000,
            bits,
            nonce: 0,
            number: 1,
        }
    }

    #[test]
    fn generated_nonce_meets_target() {
        let mut h = header(LIMIT);
        let nonce = WorkGenerator::default().generate(&h, LIMIT).unwrap();
        h.nonce = nonce.0;
        assert!(check_proof_of_work(&h.hash(), h.bits, LIMIT).is_ok());
    }

    #[test]
    fn search_is_deterministic() {
        let h = header(LIMIT);
        let a = WorkGenerator::default().generate(&h, LIMIT).unwrap();
        let b = WorkGenerator::default().generate(&h, LIMIT).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn impossible_target_exhausts() {
        // Target of 1: effectively unreachable in a handful of attempts.
        let h = header(0x0300_0001);
        let generator = WorkGenerator { max_attempts: 64 };
        assert_eq!(generator.generate(&h, LIMIT), Err(WorkError::Exhausted(64)));
    }
}
