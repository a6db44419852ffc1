//! Script representation.
//!
//! Scripts are kept as parsed operation lists. Execution belongs to the script
//! engine collaborator; this module only answers the structural questions block
//! validation needs: push-only detection, pay-to-public-key ownership, and
//! legacy signature-operation counting.

use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};

/// Sigops charged for a multisig check when the key count is not known.
pub const MULTISIG_DEFAULT_SIGOPS: usize = 20;

/// The opcode subset that matters to block-level rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// Pushes the operation's data onto the stack.
    PushData,
    /// `OP_1` .. `OP_16`, carrying `n`.
    Number(u8),
    Dup,
    Hash160,
    EqualVerify,
    CheckSig,
    CheckSigVerify,
    CheckMultiSig,
    CheckMultiSigVerify,
    Return,
    /// Any other opcode, by raw value.
    Other(u8),
}

impl Opcode {
    pub fn is_push(&self) -> bool {
        matches!(self, Opcode::PushData | Opcode::Number(_))
    }
}

/// A single script operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub code: Opcode,
    pub data: Vec<u8>,
}

impl Operation {
    pub fn new(code: Opcode) -> Self {
        Self {
            code,
            data: Vec::new(),
        }
    }

    pub fn push(data: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Opcode::PushData,
            data: data.into(),
        }
    }
}

/// A parsed script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub operations: Vec<Operation>,
}

impl Script {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// `<pubkey> OP_CHECKSIG`
    pub fn pay_to_public_key(key: &PublicKey) -> Self {
        Self::new(vec![
            Operation::push(key.as_bytes().to_vec()),
            Operation::new(Opcode::CheckSig),
        ])
    }

    /// The key this script pays to, if it has pay-to-public-key shape.
    pub fn public_key(&self) -> Option<PublicKey> {
        match self.operations.as_slice() {
            [key, check] if key.code == Opcode::PushData && check.code == Opcode::CheckSig => {
                PublicKey::from_slice(&key.data)
            }
            _ => None,
        }
    }

    pub fn is_push_only(&self) -> bool {
        self.operations.iter().all(|op| op.code.is_push())
    }

    /// Count signature operations.
    ///
    /// With `accurate`, a multisig preceded by `OP_n` is charged `n`; otherwise
    /// every multisig is charged [`MULTISIG_DEFAULT_SIGOPS`].
    pub fn sigop_count(&self, accurate: bool) -> usize {
        let mut total = 0;
        let mut last: Option<Opcode> = None;
        for op in &self.operations {
            match op.code {
                Opcode::CheckSig | Opcode::CheckSigVerify => total += 1,
                Opcode::CheckMultiSig | Opcode::CheckMultiSigVerify => {
                    total += match last {
                        Some(Opcode::Number(n)) if accurate && (1..=16).contains(&n) => {
                            n as usize
                        }
                        _ => MULTISIG_DEFAULT_SIGOPS,
                    };
                }
                _ => {}
            }
            last = Some(op.code);
        }
        total
    }
}
