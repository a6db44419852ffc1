//! DPoS witness schedule.
//!
//! The witness list for an epoch is derived from the stake of registered
//! candidates at the epoch's first block, and that block's coinbase commits to
//! the list through a mixhash output. During the epoch, the witness owning the
//! height's slot is the only valid signer.
//!
//! The registry holds process-wide mutable state. Callers that try a fork and
//! may abandon it take a [`WitnessSnapshot`] first and restore it on failure.

use std::sync::{Mutex, RwLock};

use mvs_types::{blake2b_256, Block, Header, Operation, Output, PublicKey, Script};

use crate::epoch::WitnessParams;
use crate::fts::{hash_to_seed, select_by_fts, StakeHolder};
use crate::ConsensusError;

/// Chain lookups the witness computations need. Implementations decide
/// whether not-yet-committed candidate blocks are visible.
pub trait WitnessContext {
    fn header_at(&self, height: u64) -> Option<Header>;

    fn block_at(&self, height: u64) -> Option<Block>;

    /// Registered witness candidates whose stake stays locked until at least `lock_until`.
    fn stake_holders(&self, lock_until: u64) -> Vec<StakeHolder>;
}

/// Value copy of the registry's lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WitnessSnapshot {
    pub witnesses: Vec<PublicKey>,
    pub candidates: Vec<StakeHolder>,
}

pub trait WitnessRegistry: Send + Sync {
    fn params(&self) -> &WitnessParams;

    fn witness_list(&self) -> Vec<PublicKey>;

    /// Replace the witness list, returning the previous one.
    fn swap_witness_list(&self, list: Vec<PublicKey>) -> Vec<PublicKey>;

    fn candidate_list(&self) -> Vec<StakeHolder>;

    /// Replace the candidate list, returning the previous one.
    fn swap_candidate_list(&self, list: Vec<StakeHolder>) -> Vec<StakeHolder>;

    /// Whether `public_key` owns the signing slot at `height`.
    fn verify_signer(&self, public_key: &PublicKey, height: u64, ctx: &dyn WitnessContext) -> bool;

    fn snapshot(&self) -> WitnessSnapshot {
        WitnessSnapshot {
            witnesses: self.witness_list(),
            candidates: self.candidate_list(),
        }
    }

    fn restore(&self, snapshot: WitnessSnapshot) {
        self.swap_witness_list(snapshot.witnesses);
        self.swap_candidate_list(snapshot.candidates);
    }

    fn is_begin_of_epoch(&self, height: u64) -> bool {
        self.params().is_begin_of_epoch(height)
    }

    /// Height of the vote-result block governing `height`.
    fn vote_result_epoch(&self, height: u64) -> u64 {
        self.params().vote_result_height(height)
    }

    /// Load the witness list in force at `height` from its vote-result block.
    /// Before enablement the list is cleared.
    fn update_witness_list(&self, height: u64, ctx: &dyn WitnessContext) -> Result<(), ConsensusError> {
        if !self.params().is_witness_enabled(height) {
            self.swap_witness_list(Vec::new());
            self.swap_candidate_list(Vec::new());
            return Ok(());
        }

        let vote_height = self.vote_result_epoch(height);
        let block = ctx
            .block_at(vote_height)
            .ok_or(ConsensusError::MissingVoteBlock(vote_height))?;
        self.update_witness_list_from_block(&block, ctx)
    }

    /// Verify a vote-result block and adopt the list it commits to.
    fn update_witness_list_from_block(
        &self,
        block: &Block,
        ctx: &dyn WitnessContext,
    ) -> Result<(), ConsensusError> {
        let (witnesses, candidates) = verify_vote_result(self.params(), block, ctx)?;
        tracing::debug!(
            height = block.header.number,
            witnesses = witnesses.len(),
            "witness list updated"
        );
        self.swap_witness_list(witnesses);
        self.swap_candidate_list(candidates);
        Ok(())
    }
}

/// Commitment to an ordered witness list.
pub fn calc_mixhash(witnesses: &[PublicKey]) -> [u8; 32] {
    let count = (witnesses.len() as u64).to_le_bytes();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(witnesses.len() + 1);
    parts.push(&count);
    parts.extend(witnesses.iter().map(|w| w.as_bytes().as_slice()));
    blake2b_256(&parts)
}

/// Compute the witness list (and the stake-ranked candidates it was drawn
/// from) for the epoch beginning at `height`.
pub fn calc_witness_list(
    params: &WitnessParams,
    height: u64,
    ctx: &dyn WitnessContext,
) -> Result<(Vec<PublicKey>, Vec<StakeHolder>), ConsensusError> {
    if !params.is_begin_of_epoch(height) {
        return Err(ConsensusError::NotBeginOfEpoch(height));
    }

    let mut candidates = ctx.stake_holders(height + params.register_lock_height);
    candidates.sort_by(|a, b| b.stake.cmp(&a.stake));
    candidates.truncate(params.max_candidate_count as usize);

    let witness_number = params.witness_number as usize;
    let selected = if candidates.len() <= witness_number {
        candidates.clone()
    } else {
        let previous = height
            .checked_sub(1)
            .and_then(|h| ctx.header_at(h))
            .ok_or(ConsensusError::MissingHeader(height.saturating_sub(1)))?;
        let seed = hash_to_seed(previous.hash().as_bytes());
        select_by_fts(&candidates, seed, witness_number)
    };

    let witnesses = selected.into_iter().map(|h| h.public_key).collect();
    Ok((witnesses, candidates))
}

/// The coinbase output committing to the witness list at `height`.
pub fn create_vote_result_output(
    params: &WitnessParams,
    height: u64,
    ctx: &dyn WitnessContext,
) -> Result<Output, ConsensusError> {
    let (witnesses, _) = calc_witness_list(params, height, ctx)?;
    let mixhash = calc_mixhash(&witnesses);
    Ok(Output::new(0, Script::new(vec![Operation::push(mixhash.to_vec())])))
}

/// Check that `block` carries exactly a coinbase whose second output commits
/// to the recomputed witness list.
pub fn verify_vote_result(
    params: &WitnessParams,
    block: &Block,
    ctx: &dyn WitnessContext,
) -> Result<(Vec<PublicKey>, Vec<StakeHolder>), ConsensusError> {
    let height = block.header.number;
    let invalid = |reason| ConsensusError::InvalidVoteResult { height, reason };

    let [coinbase] = block.transactions.as_slice() else {
        return Err(invalid("vote result block must hold only the coinbase"));
    };
    if coinbase.outputs.len() != 2 {
        return Err(invalid("coinbase has no vote result output"));
    }
    let output = &coinbase.outputs[1];
    if !output.is_vote_result() {
        return Err(invalid("malformed vote result output"));
    }

    let (witnesses, candidates) = calc_witness_list(params, height, ctx)?;
    if output.script.operations[0].data != calc_mixhash(&witnesses) {
        return Err(ConsensusError::MixhashMismatch(height));
    }
    Ok((witnesses, candidates))
}

/// In-memory registry with a cached per-round slot offset.
pub struct WitnessSchedule {
    params: WitnessParams,
    witnesses: RwLock<Vec<PublicKey>>,
    candidates: RwLock<Vec<StakeHolder>>,
    /// (round begin height, hash seed of the header before it) -> offset.
    slot_offset: Mutex<Option<((u64, u32), u32)>>,
}

impl WitnessSchedule {
    pub fn new(params: WitnessParams) -> Self {
        Self {
            params,
            witnesses: RwLock::new(Vec::new()),
            candidates: RwLock::new(Vec::new()),
            slot_offset: Mutex::new(None),
        }
    }

    pub fn slot_of(&self, public_key: &PublicKey) -> Option<usize> {
        let witnesses = self.witnesses.read().unwrap();
        witnesses.iter().position(|w| w == public_key)
    }

    /// Slot expected to sign `height`. Outside the first round of an epoch,
    /// the rotation is shifted by the XOR of the previous round's header hashes.
    pub fn calc_slot_num(&self, height: u64, ctx: &dyn WitnessContext) -> Option<usize> {
        let size = self.witnesses.read().unwrap().len();
        if !self.params.is_witness_enabled(height) || size == 0 {
            return None;
        }

        let slot = ((height - self.params.enable_height) % size as u64) as usize;
        let round_begin = self.params.round_begin_height(height, size);
        if self.params.is_begin_of_epoch(round_begin) {
            return Some(slot);
        }

        let anchor = ctx.header_at(round_begin.checked_sub(1)?)?;
        let key = (round_begin, hash_to_seed(anchor.hash().as_bytes()));
        if let Some((cached, offset)) = *self.slot_offset.lock().unwrap() {
            if cached == key {
                return Some((slot + offset as usize) % size);
            }
        }

        let mut offset = 0u32;
        for h in round_begin.checked_sub(size as u64)?..round_begin {
            let header = ctx.header_at(h)?;
            offset ^= hash_to_seed(header.hash().as_bytes());
        }
        let offset = offset % size as u32;
        *self.slot_offset.lock().unwrap() = Some((key, offset));

        Some((slot + offset as usize) % size)
    }
}

impl WitnessRegistry for WitnessSchedule {
    fn params(&self) -> &WitnessParams {
        &self.params
    }

    fn witness_list(&self) -> Vec<PublicKey> {
        self.witnesses.read().unwrap().clone()
    }

    fn swap_witness_list(&self, list: Vec<PublicKey>) -> Vec<PublicKey> {
        std::mem::replace(&mut *self.witnesses.write().unwrap(), list)
    }

    fn candidate_list(&self) -> Vec<StakeHolder> {
        self.candidates.read().unwrap().clone()
    }

    fn swap_candidate_list(&self, list: Vec<StakeHolder>) -> Vec<StakeHolder> {
        std::mem::replace(&mut *self.candidates.write().unwrap(), list)
    }

    fn verify_signer(&self, public_key: &PublicKey, height: u64, ctx: &dyn WitnessContext) -> bool {
        match (self.slot_of(public_key), self.calc_slot_num(height, ctx)) {
            (Some(slot), Some(expected)) => slot == expected,
            _ => false,
        }
    }
}
