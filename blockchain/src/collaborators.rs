//! Services the validator calls out to without owning.

use mvs_types::{Script, Transaction, TxHash};

/// Transaction pool. Only eviction is needed here.
pub trait Mempool: Send + Sync {
    fn delete_tx(&self, hash: &TxHash);
}

/// Opaque script interpreter.
pub trait ScriptEngine: Send + Sync {
    /// Whether input `input_index` of `tx` satisfies `prev_script`.
    fn verify_input(&self, prev_script: &Script, tx: &Transaction, input_index: usize) -> bool;

    /// Extra sigops contributed by a pay-to-script-hash redemption, `None`
    /// when `prev_script` is not a script hash.
    fn script_hash_sigops(&self, prev_script: &Script, input_script: &Script) -> Option<usize>;
}
