//! Fundamental types for the chain.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! hashes, keys, out-points, scripts, transactions, headers, blocks and the
//! 256-bit integer used for targets and chain work.

pub mod attachment;
pub mod block;
pub mod hash;
pub mod keys;
pub mod network;
pub mod point;
pub mod script;
pub mod transaction;

pub use attachment::{Attachment, CertType};
pub use block::{generate_merkle_root, Block, BlockHash, Header, ProofKind};
pub use hash::{blake2b_256, TxHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use point::OutPoint;
pub use primitive_types::U256;
pub use script::{Opcode, Operation, Script};
pub use transaction::{Input, Output, Transaction};
