//! Cryptographic primitives for block signers.
//!
//! - **Ed25519** for signing and signature verification
//! - Block signatures are made over the Blake2b header hash

pub mod keys;
pub mod sign;

pub use keys::keypair_from_seed;
pub use sign::{sign_header, sign_message, verify_header_signature, verify_signature};
