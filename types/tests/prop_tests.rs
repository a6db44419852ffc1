use proptest::prelude::*;

use mvs_types::{
    generate_merkle_root, BlockHash, Input, Opcode, Operation, OutPoint, Output, Script,
    Transaction, TxHash,
};

fn value_tx(value: u64) -> Transaction {
    Transaction::new(
        vec![Input::new(OutPoint::new(TxHash::new([9u8; 32]), 0), Script::default())],
        vec![Output::new(value, Script::default())],
    )
}

proptest! {
    /// BlockHash display output parses back to the same hash.
    #[test]
    fn block_hash_hex_parses_back(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        prop_assert_eq!(BlockHash::from_hex(&hash.to_string()), Some(hash));
    }

    /// Changing any single transaction changes the merkle root.
    #[test]
    fn merkle_root_commits_to_every_transaction(
        values in prop::collection::vec(0u64..1_000_000, 1..12),
        index in 0usize..12,
    ) {
        let txs: Vec<Transaction> = values.iter().map(|v| value_tx(*v)).collect();
        let index = index % txs.len();
        let mut altered = txs.clone();
        altered[index].outputs[0].value = altered[index].outputs[0].value.wrapping_add(1);
        prop_assert_ne!(generate_merkle_root(&txs), generate_merkle_root(&altered));
    }

    /// Legacy sigops are additive over input and output scripts.
    #[test]
    fn legacy_sigops_are_additive(checksigs in 0usize..20, multisigs in 0usize..5) {
        let mut ops = vec![Operation::new(Opcode::CheckSig); checksigs];
        ops.extend(vec![Operation::new(Opcode::CheckMultiSig); multisigs]);
        let mut tx = value_tx(1);
        tx.outputs[0].script = Script::new(ops.clone());
        tx.inputs[0].script = Script::new(ops);
        prop_assert_eq!(tx.legacy_sigops(), 2 * (checksigs + 20 * multisigs));
    }

    /// Only the null out-point makes a single-input transaction a coinbase.
    #[test]
    fn coinbase_requires_null_outpoint(bytes in prop::array::uniform32(0u8..), index in 0u32..u32::MAX) {
        let tx = Transaction::new(
            vec![Input::new(OutPoint::new(TxHash::new(bytes), index), Script::default())],
            vec![Output::new(1, Script::default())],
        );
        prop_assert!(!tx.is_coinbase());
    }
}
