//! Follow-the-satoshi: stake-weighted, seed-deterministic selection.
//!
//! Holders are laid out as the leaves of a binary sum tree. Each draw walks
//! from the root, going left with probability proportional to the left
//! subtree's stake. The chosen holder is removed and the tree rebuilt for the
//! next draw.

use mvs_types::{blake2b_256, PublicKey};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeHolder {
    pub public_key: PublicKey,
    pub stake: u64,
}

impl StakeHolder {
    pub fn new(public_key: PublicKey, stake: u64) -> Self {
        Self { public_key, stake }
    }
}

/// Implicit sum tree: node `i` has children `2i` and `2i + 1`, leaves start at `len`.
struct StakeTree {
    sums: Vec<u64>,
    leaves: usize,
}

impl StakeTree {
    fn build(holders: &[StakeHolder]) -> Self {
        let leaves = holders.len();
        let mut sums = vec![0u64; leaves * 2];
        for (i, holder) in holders.iter().enumerate() {
            sums[leaves + i] = holder.stake;
        }
        for i in (1..leaves).rev() {
            sums[i] = sums[2 * i].saturating_add(sums[2 * i + 1]);
        }
        Self { sums, leaves }
    }

    /// Index into the holder slice of the leaf reached from the root.
    fn select(&self, seed: u32) -> usize {
        let mut node = 1;
        let mut step = 0u32;
        while node < self.leaves {
            let total = self.sums[node];
            let left = self.sums[2 * node];
            let r = if total == 0 { 0 } else { draw(seed, step) % total };
            node = if r < left { 2 * node } else { 2 * node + 1 };
            step += 1;
        }
        node - self.leaves
    }
}

fn draw(seed: u32, step: u32) -> u64 {
    let digest = blake2b_256(&[&seed.to_le_bytes(), &step.to_le_bytes()]);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Pick `count` holders. All holders are returned, in order, when there are
/// no more than `count` of them.
pub fn select_by_fts(holders: &[StakeHolder], seed: u32, count: usize) -> Vec<StakeHolder> {
    if holders.len() <= count {
        return holders.to_vec();
    }

    let mut remaining = holders.to_vec();
    let mut selected = Vec::with_capacity(count);
    while selected.len() < count && remaining.len() > 1 {
        let index = StakeTree::build(&remaining).select(seed);
        selected.push(remaining.remove(index));
    }

    let missing = count - selected.len();
    selected.extend(remaining.into_iter().take(missing));
    selected
}

/// Fold a 32-byte hash into a 32-bit seed by XOR over big-endian words.
pub fn hash_to_seed(hash: &[u8; 32]) -> u32 {
    hash.chunks(4).fold(0u32, |acc, word| {
        acc ^ u32::from_be_bytes([word[0], word[1], word[2], word[3]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holders(stakes: &[u64]) -> Vec<StakeHolder> {
        stakes
            .iter()
            .enumerate()
            .map(|(i, s)| StakeHolder::new(PublicKey([i as u8; 32]), *s))
            .collect()
    }

    #[test]
    fn small_sets_are_taken_whole() {
        let all = holders(&[5, 1, 3]);
        assert_eq!(select_by_fts(&all, 7, 3), all);
        assert_eq!(select_by_fts(&all, 7, 10), all);
    }

    #[test]
    fn selection_is_deterministic_and_distinct() {
        let all = holders(&[333, 331, 333, 8, 9, 1, 2, 7, 12, 26]);
        let a = select_by_fts(&all, 42, 4);
        let b = select_by_fts(&all, 42, 4);
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        for (i, x) in a.iter().enumerate() {
            assert!(a[i + 1..].iter().all(|y| y.public_key != x.public_key));
        }
    }

    #[test]
    fn zero_stake_holder_is_never_drawn_over_staked_ones() {
        let all = holders(&[0, 100, 100]);
        let picked = select_by_fts(&all, 9, 2);
        assert!(picked.iter().all(|h| h.stake == 100));
    }

    #[test]
    fn seed_folds_words() {
        let mut hash = [0u8; 32];
        hash[3] = 1;
        hash[7] = 3;
        assert_eq!(hash_to_seed(&hash), 2);
    }
}
