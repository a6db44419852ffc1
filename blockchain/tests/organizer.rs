//! Organizer behaviour end to end: orphans, forks, reorganizations and the
//! witness registry around them.

mod common;

use common::Fixture;
use mvs_blockchain::{ExceptionAllowList, OrganizerEvent, ValidationError};
use mvs_consensus::{create_vote_result_output, StakeHolder, WitnessContext, WitnessRegistry};
use mvs_nullables::ChainBuilder;
use mvs_store::{AssetStore, BlockStore};
use mvs_types::{Attachment, Block, Output, Script, TxHash};

#[test]
fn linear_blocks_extend_the_chain() {
    let f = Fixture::new();
    let blocks = f.builder.pow_chain(&f.genesis.header, 3, 1);

    let details = f.organize(&blocks);

    assert_eq!(f.store.last_height().unwrap(), 3);
    for (i, detail) in details.iter().enumerate() {
        assert_eq!(detail.height(), Some(i as u64 + 1));
        assert!(detail.error().is_none());
        assert!(!f.organizer.pool().exists(&detail.hash()));
    }
    assert_eq!(f.reorgs(), vec![(0, 1, 0), (1, 1, 0), (2, 1, 0)]);
}

#[test]
fn heavier_fork_replaces_the_main_chain() {
    let f = Fixture::new();
    let main = f.builder.pow_chain(&f.genesis.header, 2, 1);
    let fork = f.builder.pow_chain(&f.genesis.header, 3, 2);
    f.organize(&main);
    f.events.lock().unwrap().clear();

    f.organize(&fork);

    let mut expected = vec![f.genesis.hash()];
    expected.extend(fork.iter().map(Block::hash));
    assert_eq!(f.store.hashes(), expected);

    let events = f.events.lock().unwrap();
    let Some(OrganizerEvent::Reorganized {
        fork_point,
        pushed,
        released,
    }) = events.last()
    else {
        panic!("expected a reorganization");
    };
    assert_eq!(*fork_point, 0);
    assert_eq!(pushed, &fork);
    assert_eq!(released, &main);
    drop(events);

    // Released blocks stay pooled, already processed, and the old tip is a fork tip.
    for block in &main {
        let detail = f.organizer.pool().get(&block.hash()).expect("released block pooled");
        assert!(detail.is_processed());
    }
    assert!(f.organizer.fork_chain_tips().contains(&(main[1].hash(), 2)));
}

#[test]
fn equal_work_fork_leaves_the_chain_alone() {
    let f = Fixture::new();
    let main = f.builder.pow_chain(&f.genesis.header, 2, 1);
    let fork = f.builder.pow_chain(&f.genesis.header, 2, 2);
    f.organize(&main);
    f.events.lock().unwrap().clear();

    let details = f.organize(&fork);

    assert_eq!(f.store.tip().hash(), main[1].hash());
    assert!(f.events.lock().unwrap().is_empty());
    assert_eq!(f.organizer.fork_chain_tips(), vec![(fork[0].hash(), 1), (fork[1].hash(), 2)]);
    for detail in &details {
        assert!(detail.is_processed());
        assert!(detail.is_checked_work_proof());
        assert!(detail.error().is_none());
        assert!(f.organizer.pool().exists(&detail.hash()));
    }
}

#[test]
fn verified_blocks_are_counted_without_checks() {
    let f = Fixture::new();
    let main = f.builder.pow_chain(&f.genesis.header, 1, 1);
    f.organize(&main);

    // A block marked verified is trusted as is, even with a broken merkle root.
    let mut first = f.builder.pow_block(&f.genesis.header, 2, Vec::new());
    first.header.merkle_root = TxHash::ZERO;
    f.builder.mine(&mut first.header);
    let second = f.builder.pow_block(&first.header, 2, Vec::new());

    let trusted = f.submit(&first);
    trusted.set_checked_work_proof(true);
    let fresh = f.submit(&second);
    f.organizer.organize().unwrap();

    assert_eq!(f.store.tip().hash(), second.hash());
    assert!(trusted.error().is_none());
    assert_eq!(trusted.height(), Some(1));
    assert!(fresh.is_checked_work_proof());
}

#[test]
fn losing_fork_keeps_its_verification() {
    let f = Fixture::new();
    let main = f.builder.pow_chain(&f.genesis.header, 1, 1);
    let fork = f.builder.pow_chain(&f.genesis.header, 2, 2);
    f.organize(&main);

    let first = f.organize(&fork[..1]).remove(0);
    assert!(first.is_checked_work_proof());
    assert_eq!(first.height(), None);

    f.organize(&fork[1..]);
    assert_eq!(f.store.tip().hash(), fork[1].hash());
    assert_eq!(first.height(), Some(1));
}

#[test]
fn orphan_connects_once_its_parent_arrives() {
    let f = Fixture::new();
    let blocks = f.builder.pow_chain(&f.genesis.header, 3, 1);

    let late = f.organize(&blocks[1..]);
    assert_eq!(f.store.last_height().unwrap(), 0);
    assert!(late.iter().all(|d| d.is_processed() && d.height().is_none()));
    assert!(f.organizer.pool().pending_len() > 0);

    f.organize(&blocks[..1]);

    assert_eq!(f.store.last_height().unwrap(), 3);
    assert_eq!(f.store.tip().hash(), blocks[2].hash());
    assert_eq!(f.organizer.pool().pending_len(), 0);
}

#[test]
fn invalid_block_clips_itself_and_its_descendants() {
    let f = Fixture::new();
    let b1 = f.builder.pow_block(&f.genesis.header, 1, Vec::new());
    let mut b2 = f.builder.pow_block(&b1.header, 1, Vec::new());
    b2.header.merkle_root = TxHash::ZERO;
    f.builder.mine(&mut b2.header);
    let b3 = f.builder.pow_block(&b2.header, 1, Vec::new());

    // The child is processed first, so one trace covers the whole ancestry.
    let details = f.organize(&[b3.clone(), b2.clone(), b1.clone()]);

    assert_eq!(f.store.hashes(), vec![f.genesis.hash(), b1.hash()]);
    assert_eq!(details[1].error(), Some(ValidationError::MerkleMismatch));
    assert_eq!(details[0].error(), Some(ValidationError::PreviousBlockInvalid));
    assert!(!f.organizer.pool().exists(&b2.hash()));
    assert!(!f.organizer.pool().exists(&b3.hash()));
}

#[test]
fn pending_children_of_an_invalid_parent_are_dropped() {
    let f = Fixture::new();
    let b1 = f.builder.pow_block(&f.genesis.header, 1, Vec::new());
    let mut b2 = f.builder.pow_block(&b1.header, 1, Vec::new());
    b2.header.merkle_root = TxHash::ZERO;
    f.builder.mine(&mut b2.header);
    let b3 = f.builder.pow_block(&b2.header, 1, Vec::new());

    let child = f.organize(&[b3.clone()]).remove(0);
    assert!(child.error().is_none());

    f.organize(&[b1, b2]);

    assert_eq!(child.error(), Some(ValidationError::PreviousBlockInvalid));
    assert!(!f.organizer.pool().exists(&b3.hash()));
    assert_eq!(f.store.last_height().unwrap(), 1);
}

#[test]
fn push_failure_keeps_the_connected_prefix() {
    let f = Fixture::new();
    let blocks = f.builder.pow_chain(&f.genesis.header, 3, 1);
    f.store.fail_push_at(2);

    f.submit(&blocks[2]);
    f.submit(&blocks[1]);
    f.submit(&blocks[0]);
    f.organizer.organize().unwrap();

    assert_eq!(f.store.last_height().unwrap(), 1);
    assert_eq!(f.reorgs()[0], (0, 1, 0));
    assert!(f.organizer.pool().exists(&blocks[1].hash()));
}

#[test]
fn pop_failure_changes_nothing() {
    let f = Fixture::new();
    let main = f.builder.pow_chain(&f.genesis.header, 1, 1);
    let fork = f.builder.pow_chain(&f.genesis.header, 2, 2);
    f.organize(&main);
    f.events.lock().unwrap().clear();
    f.store.fail_next_pop();

    f.organize(&fork);

    assert_eq!(f.store.tip().hash(), main[0].hash());
    assert!(f.reorgs().is_empty());
}

#[test]
fn stopped_organizer_does_nothing() {
    let f = Fixture::new();
    let blocks = f.builder.pow_chain(&f.genesis.header, 2, 1);
    f.organizer.stop();
    assert!(f.organizer.stopped());

    let details = f.organize(&blocks);

    assert_eq!(f.store.last_height().unwrap(), 0);
    assert!(details.iter().all(|d| !d.is_processed()));
    assert!(matches!(f.events.lock().unwrap().last(), Some(OrganizerEvent::Stopped)));

    f.organizer.start();
    f.organizer.organize().unwrap();
    assert_eq!(f.store.last_height().unwrap(), 2);
}

#[test]
fn long_losing_fork_asks_for_more_blocks() {
    let f = Fixture::new();
    let locator = f.builder.params().locator_size;
    let main = f.builder.pow_chain(&f.genesis.header, locator, 1);
    let fork = f.builder.pow_chain(&f.genesis.header, locator, 2);
    f.push_main(&main);

    f.organize(&fork);

    let events = f.events.lock().unwrap();
    let hints: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            OrganizerEvent::NeedMoreBlocks { fork_point, tip, length } => Some((*fork_point, *tip, *length)),
            _ => None,
        })
        .collect();
    assert_eq!(hints, vec![(0, locator as u64, locator)]);
}

#[test]
fn allow_listed_block_is_accepted_despite_failing() {
    let builder = ChainBuilder::regtest();
    let genesis = builder.genesis();
    let mut exception = builder.pow_block(&genesis.header, 2, Vec::new());
    exception.header.merkle_root = TxHash::ZERO;
    builder.mine(&mut exception.header);
    let child = builder.pow_block(&exception.header, 2, Vec::new());

    let f = Fixture::with_exceptions(ExceptionAllowList::new(vec![(1, exception.hash())]));
    let main = f.builder.pow_chain(&f.genesis.header, 1, 1);
    f.push_main(&main);

    let details = f.organize(&[exception.clone(), child.clone()]);

    // Two blocks only outweigh the main chain if the excepted one counts.
    assert_eq!(f.store.hashes(), vec![f.genesis.hash(), exception.hash(), child.hash()]);
    assert!(details[0].error().is_none());
    assert!(details[0].is_checked_work_proof());
    assert_eq!(details[0].height(), Some(1));
}

#[test]
fn fork_may_reissue_an_asset_from_a_replaced_block() {
    let f = Fixture::new();
    let main = f.builder.pow_chain(&f.genesis.header, 3, 1);
    f.push_main(&main);

    let mut gold = ChainBuilder::spend(&main[0].transactions[0], 0, 1, &ChainBuilder::key(3).public);
    gold.outputs.push(Output {
        value: 0,
        script: Script::default(),
        attachment: Attachment::AssetIssue {
            symbol: "GOLD".to_string(),
        },
    });
    let issued = f.builder.pow_block(&main[2].header, 1, vec![gold.clone()]);
    f.push_main(&[issued]);
    assert_eq!(f.store.asset_height("GOLD").unwrap(), Some(4));

    let f4 = f.builder.pow_block(&main[2].header, 2, vec![gold]);
    let f5 = f.builder.pow_block(&f4.header, 2, Vec::new());
    let details = f.organize(&[f4, f5.clone()]);

    assert!(details.iter().all(|d| d.error().is_none()));
    assert_eq!(f.store.tip().hash(), f5.hash());
    assert_eq!(f.store.asset_height("GOLD").unwrap(), Some(4));
}

#[test]
fn filter_orphans_strips_pooled_hashes() {
    let f = Fixture::new();
    let blocks = f.builder.pow_chain(&f.genesis.header, 2, 1);
    f.organize(&blocks[1..]);

    let unknown = f.builder.pow_block(&f.genesis.header, 9, Vec::new()).hash();
    let kept = f.organizer.filter_orphans(vec![blocks[1].hash(), unknown]);
    assert_eq!(kept, vec![unknown]);
}

// ── Witness registry ────────────────────────────────────────────────────

/// Main chain up to just before DPoS is enabled, with one witness candidate.
fn before_witness_epoch(f: &Fixture) -> (Block, mvs_types::KeyPair) {
    let enable = f.builder.params().witness.enable_height;
    let main = f.builder.pow_chain(&f.genesis.header, enable as usize - 1, 1);
    f.push_main(&main);

    let witness = ChainBuilder::key(7);
    f.store.add_witness_stake(witness.public, 10, enable + 1_000);
    (main[main.len() - 1].clone(), witness)
}

struct StoreContext<'a>(&'a Fixture);

impl WitnessContext for StoreContext<'_> {
    fn header_at(&self, height: u64) -> Option<mvs_types::Header> {
        self.0.store.header_at(height).ok().flatten()
    }

    fn block_at(&self, height: u64) -> Option<Block> {
        self.0.store.block_at(height).ok().flatten()
    }

    fn stake_holders(&self, lock_until: u64) -> Vec<StakeHolder> {
        self.0
            .store
            .witness_stakes(lock_until)
            .unwrap_or_default()
            .into_iter()
            .map(|(public_key, stake)| StakeHolder { public_key, stake })
            .collect()
    }
}

#[test]
fn vote_result_block_installs_the_witness_list() {
    let f = Fixture::new();
    let (parent, witness) = before_witness_epoch(&f);
    let height = parent.header.number + 1;
    let vote = create_vote_result_output(&f.builder.params().witness, height, &StoreContext(&f)).unwrap();

    let block = f.builder.dpos_block(&parent.header, 0, &witness, vec![vote]);
    let detail = f.organize(&[block.clone()]).remove(0);

    assert_eq!(detail.error(), None);
    assert_eq!(f.store.tip().hash(), block.hash());
    assert_eq!(f.witness.witness_list(), vec![witness.public]);
}

#[test]
fn wrong_vote_result_is_rejected() {
    let f = Fixture::new();
    let (parent, witness) = before_witness_epoch(&f);
    // Commit to an empty committee instead of the registered candidate.
    let vote = mvs_types::Output::new(
        0,
        mvs_types::Script::new(vec![mvs_types::Operation::push(
            mvs_consensus::calc_mixhash(&[]).to_vec(),
        )]),
    );

    let block = f.builder.dpos_block(&parent.header, 0, &witness, vec![vote]);
    let detail = f.organize(&[block]).remove(0);

    assert!(matches!(detail.error(), Some(ValidationError::VoteResult(_))));
    assert_eq!(f.store.last_height().unwrap(), parent.header.number);
    assert_eq!(f.witness_list_len(), 0);
}

#[test]
fn failed_attempt_restores_the_witness_list() {
    let f = Fixture::new();
    let (parent, witness) = before_witness_epoch(&f);
    let height = parent.header.number + 1;
    let vote = create_vote_result_output(&f.builder.params().witness, height, &StoreContext(&f)).unwrap();

    let previous = ChainBuilder::key(9).public;
    f.witness.swap_witness_list(vec![previous]);

    // The vote result verifies, so the list is swapped during the check;
    // the broken merkle root fails the block afterwards.
    let mut block = f.builder.dpos_block(&parent.header, 0, &witness, vec![vote]);
    block.header.merkle_root = TxHash::ZERO;
    ChainBuilder::sign(&mut block, &witness);
    let detail = f.organize(&[block]).remove(0);

    assert_eq!(detail.error(), Some(ValidationError::MerkleMismatch));
    assert_eq!(f.witness.witness_list(), vec![previous]);
}

#[test]
fn dpos_block_from_a_non_witness_is_rejected() {
    let f = Fixture::new();
    let (parent, _) = before_witness_epoch(&f);
    let height = parent.header.number + 1;
    let vote = create_vote_result_output(&f.builder.params().witness, height, &StoreContext(&f)).unwrap();

    let intruder = ChainBuilder::key(8);
    let block = f.builder.dpos_block(&parent.header, 0, &intruder, vec![vote]);
    let detail = f.organize(&[block]).remove(0);

    assert_eq!(detail.error(), Some(ValidationError::WitnessMismatch));
}

#[test]
fn extended_losing_fork_reinstalls_its_witness_list() {
    let f = Fixture::new();
    let (parent, witness) = before_witness_epoch(&f);
    let height = parent.header.number + 1;
    let vote = create_vote_result_output(&f.builder.params().witness, height, &StoreContext(&f)).unwrap();
    f.push_main(&f.builder.pow_chain(&parent.header, 2, 1));

    let first = f.builder.dpos_block(&parent.header, 0, &witness, vec![vote]);
    let opener = f.organize(&[first.clone()]).remove(0);
    assert!(opener.is_checked_work_proof());
    assert_eq!(opener.height(), None);
    assert_eq!(f.witness_list_len(), 0);

    // Later blocks of the epoch are signed against the list the opener installs.
    let second = f.builder.dpos_block(&first.header, 0, &witness, Vec::new());
    let third = f.builder.dpos_block(&second.header, 0, &witness, Vec::new());
    let details = f.organize(&[second, third.clone()]);

    assert!(details.iter().all(|d| d.error().is_none()));
    assert_eq!(f.store.tip().hash(), third.hash());
    assert_eq!(opener.height(), Some(height));
    assert_eq!(f.witness.witness_list(), vec![witness.public]);
}
