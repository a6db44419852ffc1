use proptest::prelude::*;

use mvs_consensus::{select_by_fts, StakeHolder, WitnessParams};
use mvs_types::PublicKey;

fn params() -> WitnessParams {
    WitnessParams {
        enable_height: 1_000,
        witness_number: 5,
        epoch_cycle_height: 50,
        vote_maturity: 4,
        max_candidate_count: 100,
        register_lock_height: 10,
    }
}

proptest! {
    /// Vote result heights are epoch starts no later than the height itself.
    #[test]
    fn vote_result_height_is_epoch_start(height in 1_000u64..100_000) {
        let p = params();
        let vote = p.vote_result_height(height);
        prop_assert!(vote <= height);
        prop_assert!(p.is_begin_of_epoch(vote));
        prop_assert!(height - vote < p.epoch_cycle_height);
    }

    /// Epoch membership is symmetric.
    #[test]
    fn same_epoch_is_symmetric(a in 0u64..10_000, b in 0u64..10_000) {
        let p = params();
        prop_assert_eq!(p.is_in_same_epoch(a, b), p.is_in_same_epoch(b, a));
    }

    /// Selection returns min(count, len) distinct holders.
    #[test]
    fn fts_picks_distinct_holders(
        stakes in prop::collection::vec(0u64..1_000_000, 0..40),
        seed in any::<u32>(),
        count in 0usize..30,
    ) {
        let holders: Vec<StakeHolder> = stakes
            .iter()
            .enumerate()
            .map(|(i, s)| StakeHolder::new(PublicKey([i as u8; 32]), *s))
            .collect();
        let picked = select_by_fts(&holders, seed, count);
        prop_assert_eq!(picked.len(), count.min(holders.len()));
        for (i, a) in picked.iter().enumerate() {
            prop_assert!(picked[i + 1..].iter().all(|b| b.public_key != a.public_key));
        }
    }
}
