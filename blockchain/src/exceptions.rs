//! Historical blocks accepted on mainnet that fail rules added by later
//! upgrades. Only consulted once a block has already failed verification.

use mvs_types::BlockHash;

const EXCEPTIONS: &[(u64, &str)] = &[
    (91_842, "00000000000a4d0a398161ffc163c503763b1f4360639393e0e4c8e300e0caec"),
    (91_880, "00000000000743f190a18c5577a3c2d2a1f610ae9601ac046a38084ccb7cd721"),
];

/// `(height, hash)` pairs the organizer accepts even when verification fails.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExceptionAllowList {
    entries: Vec<(u64, BlockHash)>,
}

impl ExceptionAllowList {
    pub fn new(entries: Vec<(u64, BlockHash)>) -> Self {
        Self { entries }
    }

    /// The built-in historical table.
    pub fn historical() -> Self {
        Self::new(
            EXCEPTIONS
                .iter()
                .filter_map(|(height, hex)| BlockHash::from_hex(hex).map(|hash| (*height, hash)))
                .collect(),
        )
    }

    pub fn contains(&self, height: u64, hash: &BlockHash) -> bool {
        self.entries.iter().any(|(h, entry)| *h == height && entry == hash)
    }
}
