//! Checkpoints pin historical blocks. Validation before the last checkpoint is
//! relaxed; past it every block is fully connected.

use mvs_types::BlockHash;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub height: u64,
    pub hash: BlockHash,
}

impl Checkpoint {
    pub fn new(height: u64, hash: BlockHash) -> Self {
        Self { height, hash }
    }

    pub fn from_hex(height: u64, hash: &str) -> Option<Self> {
        BlockHash::from_hex(hash).map(|hash| Self { height, hash })
    }
}

/// Sorted by height, one entry per height.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Checkpoints {
    list: Vec<Checkpoint>,
}

impl Checkpoints {
    pub fn new(mut list: Vec<Checkpoint>) -> Self {
        list.sort_by_key(|c| c.height);
        list.dedup_by_key(|c| c.height);
        Self { list }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn last_height(&self) -> Option<u64> {
        self.list.last().map(|c| c.height)
    }

    /// False only when a checkpoint exists at `height` with a different hash.
    pub fn validate(&self, hash: &BlockHash, height: u64) -> bool {
        match self.list.binary_search_by_key(&height, |c| c.height) {
            Ok(index) => self.list[index].hash == *hash,
            Err(_) => true,
        }
    }

    /// Whether a fork at `fork_height` lies past every checkpoint.
    pub fn is_strict(&self, fork_height: u64) -> bool {
        self.last_height().map_or(true, |last| fork_height >= last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(b: u8) -> BlockHash {
        BlockHash::new([b; 32])
    }

    #[test]
    fn only_matching_height_is_checked() {
        let cps = Checkpoints::new(vec![Checkpoint::new(10, hash(1)), Checkpoint::new(5, hash(2))]);
        assert!(cps.validate(&hash(1), 10));
        assert!(!cps.validate(&hash(9), 10));
        assert!(cps.validate(&hash(9), 11));
        assert_eq!(cps.last_height(), Some(10));
    }

    #[test]
    fn strictness_starts_at_last_checkpoint() {
        assert!(Checkpoints::default().is_strict(0));
        let cps = Checkpoints::new(vec![Checkpoint::new(10, hash(1))]);
        assert!(!cps.is_strict(9));
        assert!(cps.is_strict(10));
    }
}
