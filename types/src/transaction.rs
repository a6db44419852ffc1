//! Transactions in the UTXO model.

use crate::attachment::Attachment;
use crate::hash::{blake2b_256, TxHash};
use crate::point::OutPoint;
use crate::script::Script;
use serde::{Deserialize, Serialize};

/// A transaction input spending a previous output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub previous_output: OutPoint,
    pub script: Script,
    pub sequence: u32,
}

impl Input {
    pub fn new(previous_output: OutPoint, script: Script) -> Self {
        Self {
            previous_output,
            script,
            sequence: u32::MAX,
        }
    }
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: u64,
    pub script: Script,
    pub attachment: Attachment,
}

impl Output {
    pub fn new(value: u64, script: Script) -> Self {
        Self {
            value,
            script,
            attachment: Attachment::Etp,
        }
    }

    /// Zero value, empty script, no business object. Marks a coinstake.
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.script.is_empty() && self.attachment.is_etp()
    }

    /// A witness vote result: zero-value plain output holding one push-only operation.
    pub fn is_vote_result(&self) -> bool {
        self.value == 0
            && self.attachment.is_etp()
            && self.script.operations.len() == 1
            && self.script.is_push_only()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        Self {
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Blake2b-256 of the canonical encoding.
    pub fn hash(&self) -> TxHash {
        let bytes = bincode::serialize(self).expect("transaction is always serializable");
        TxHash::new(blake2b_256(&[&bytes]))
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    pub fn is_coinstake(&self) -> bool {
        !self.inputs.is_empty()
            && !self.inputs[0].previous_output.is_null()
            && self.outputs.len() >= 2
            && self.outputs[0].is_empty()
    }

    /// Sum of output values, `None` on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |total, output| total.checked_add(output.value))
    }

    /// Signature operations over all input and output scripts (inaccurate multisig).
    pub fn legacy_sigops(&self) -> usize {
        let inputs: usize = self.inputs.iter().map(|i| i.script.sigop_count(false)).sum();
        let outputs: usize = self.outputs.iter().map(|o| o.script.sigop_count(false)).sum();
        inputs + outputs
    }
}
