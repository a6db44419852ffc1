//! Nullable script engine: accepts every input unless told otherwise.

use std::collections::HashSet;
use std::sync::Mutex;

use mvs_blockchain::ScriptEngine;
use mvs_types::{Script, Transaction, TxHash};

#[derive(Default)]
pub struct NullScriptEngine {
    rejected: Mutex<HashSet<TxHash>>,
}

impl NullScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail script verification for every input of `tx`.
    pub fn reject(&self, tx: TxHash) {
        self.rejected.lock().unwrap().insert(tx);
    }
}

impl ScriptEngine for NullScriptEngine {
    fn verify_input(&self, _prev_script: &Script, tx: &Transaction, _input_index: usize) -> bool {
        !self.rejected.lock().unwrap().contains(&tx.hash())
    }

    fn script_hash_sigops(&self, _prev_script: &Script, _input_script: &Script) -> Option<usize> {
        None
    }
}
