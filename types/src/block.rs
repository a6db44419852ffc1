//! Block hash, header and block types.

use crate::hash::{blake2b_256, TxHash};
use crate::keys::{PublicKey, Signature};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte block hash (the hash of the block header).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHash([u8; 32]);

impl Default for BlockHash {
    fn default() -> Self {
        Self::ZERO
    }
}

impl BlockHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "\u{2026})")
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// How a block proves its right to extend the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofKind {
    /// Proof of work: header hash below the target encoded in `bits`.
    Pow,
    /// Proof of stake: a coinstake transaction spends a mature stake output.
    Pos,
    /// Delegated proof of stake: signed by the witness owning the height's slot.
    Dpos,
}

impl ProofKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pow => "pow",
            Self::Pos => "pos",
            Self::Dpos => "dpos",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub proof: ProofKind,
    pub previous_hash: BlockHash,
    pub merkle_root: TxHash,
    pub timestamp: u32,
    /// Compact-encoded target.
    pub bits: u32,
    pub nonce: u64,
    /// Declared height.
    pub number: u64,
}

impl Header {
    /// Blake2b-256 of the canonical encoding.
    pub fn hash(&self) -> BlockHash {
        let bytes = bincode::serialize(self).expect("header is always serializable");
        BlockHash::new(blake2b_256(&[&bytes]))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    /// Signer key: the coinstake owner (PoS) or the witness (DPoS).
    pub public_key: Option<PublicKey>,
    /// Signature by `public_key` over the header hash.
    pub signature: Option<Signature>,
}

impl Block {
    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    pub fn proof(&self) -> ProofKind {
        self.header.proof
    }

    /// Encoded size in bytes.
    pub fn serialized_size(&self) -> u64 {
        bincode::serialized_size(self).expect("block is always serializable")
    }

    pub fn input_count(&self) -> usize {
        self.transactions.iter().map(|tx| tx.inputs.len()).sum()
    }
}

/// Merkle root over transaction hashes. The last node is paired with itself on odd levels.
pub fn generate_merkle_root(transactions: &[Transaction]) -> TxHash {
    if transactions.is_empty() {
        return TxHash::ZERO;
    }

    let mut level: Vec<[u8; 32]> = transactions.iter().map(|tx| *tx.hash().as_bytes()).collect();
    while level.len() > 1 {
        if level.len() % 2 != 0 {
            if let Some(last) = level.last().copied() {
                level.push(last);
            }
        }
        level = level
            .chunks(2)
            .map(|pair| blake2b_256(&[&pair[0], &pair[1]]))
            .collect();
    }
    TxHash::new(level[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::OutPoint;
    use crate::script::Script;
    use crate::transaction::{Input, Output};

    fn tx(value: u64) -> Transaction {
        Transaction::new(
            vec![Input::new(OutPoint::NULL, Script::default())],
            vec![Output::new(value, Script::default())],
        )
    }

    fn header() -> Header {
        Header {
            version: 1,
            proof: ProofKind::Pow,
            previous_hash: BlockHash::ZERO,
            merkle_root: TxHash::ZERO,
            timestamp: 1_000,
            bits: 0x207f_ffff,
            nonce: 0,
            number: 0,
        }
    }

    #[test]
    fn header_hash_depends_on_nonce() {
        let a = header();
        let mut b = header();
        b.nonce = 1;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn merkle_root_of_single_tx_is_its_hash() {
        let t = tx(1);
        assert_eq!(generate_merkle_root(&[t.clone()]), t.hash());
    }

    #[test]
    fn merkle_root_is_order_sensitive() {
        let a = generate_merkle_root(&[tx(1), tx(2), tx(3)]);
        let b = generate_merkle_root(&[tx(2), tx(1), tx(3)]);
        assert_ne!(a, b);
    }

    #[test]
    fn block_hash_hex_round_trip() {
        let hex = "00000000000a4d0a398161ffc163c503763b1f4360639393e0e4c8e300e0caec";
        let hash = BlockHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_string(), hex);
        assert!(BlockHash::from_hex("zz").is_none());
    }
}
