//! Organizer: connects pooled blocks to the main chain.
//!
//! For each unprocessed block the organizer traces its pooled ancestry,
//! finds where that ancestry forks off the main chain, verifies the candidate
//! blocks and replaces the main chain when the candidate carries more work.
//! Blocks whose ancestry does not reach the main chain are parked until the
//! missing parent connects.
//!
//! The witness registry is process-wide state that verification mutates at
//! epoch boundaries. Each attempt snapshots it first and restores it when the
//! attempt leaves the main chain untouched.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use mvs_consensus::{WitnessContext, WitnessRegistry};
use mvs_store::ChainStore;
use mvs_types::{Block, BlockHash, ProofKind, U256};
use mvs_utils::{format_millis, Clock};
use mvs_work::block_work;

use crate::block_detail::BlockDetail;
use crate::cancel::StopSignal;
use crate::chain_context::{ChainContext, StoreView};
use crate::checkpoint::Checkpoints;
use crate::collaborators::{Mempool, ScriptEngine};
use crate::events::{EventBus, OrganizerEvent};
use crate::exceptions::ExceptionAllowList;
use crate::orphan_pool::OrphanPool;
use crate::settings::{BlockchainSettings, ChainParams};
use crate::validate::BlockValidator;
use crate::{BlockchainError, ValidationError};

/// Result of one `replace_chain` attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Main-chain blocks removed.
    pub popped: usize,
    /// Candidate blocks connected.
    pub pushed: usize,
    /// Main-chain height afterwards.
    pub height: u64,
}

impl ReplaceOutcome {
    fn unchanged(height: u64) -> Self {
        Self {
            popped: 0,
            pushed: 0,
            height,
        }
    }
}

pub struct Organizer {
    params: ChainParams,
    checkpoints: Checkpoints,
    exceptions: ExceptionAllowList,
    parallel_connect: bool,
    stop: StopSignal,
    pool: OrphanPool,
    process_queue: Mutex<Vec<Arc<BlockDetail>>>,
    /// Last block of each losing fork -> its height.
    fork_tips: Mutex<HashMap<BlockHash, u64>>,
    events: RwLock<EventBus>,
    store: Arc<dyn ChainStore>,
    witness: Arc<dyn WitnessRegistry>,
    mempool: Arc<dyn Mempool>,
    scripts: Arc<dyn ScriptEngine>,
    clock: Arc<dyn Clock>,
}

impl Organizer {
    /// Created stopped; call [`Organizer::start`] before organizing.
    pub fn new(
        settings: &BlockchainSettings,
        store: Arc<dyn ChainStore>,
        witness: Arc<dyn WitnessRegistry>,
        mempool: Arc<dyn Mempool>,
        scripts: Arc<dyn ScriptEngine>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BlockchainError> {
        Ok(Self {
            params: settings.params(),
            checkpoints: settings.checkpoints()?,
            exceptions: ExceptionAllowList::historical(),
            parallel_connect: settings.parallel_connect,
            stop: StopSignal::stopped(),
            pool: OrphanPool::new(settings.block_pool_capacity),
            process_queue: Mutex::new(Vec::new()),
            fork_tips: Mutex::new(HashMap::new()),
            events: RwLock::new(EventBus::new()),
            store,
            witness,
            mempool,
            scripts,
            clock,
        })
    }

    /// Replace the blocks accepted despite failing verification.
    pub fn with_exceptions(mut self, exceptions: ExceptionAllowList) -> Self {
        self.exceptions = exceptions;
        self
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn pool(&self) -> &OrphanPool {
        &self.pool
    }

    pub fn start(&self) {
        self.stop.start();
    }

    pub fn stop(&self) {
        self.stop.stop();
        self.events.read().unwrap().emit(&OrganizerEvent::Stopped);
    }

    pub fn stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Shares the organizer's cancellation flag.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn subscribe(&self, listener: Box<dyn Fn(&OrganizerEvent) + Send + Sync>) {
        self.events.write().unwrap().subscribe(listener);
    }

    /// Queue `block` for organizing. `false` if it is already pooled or the
    /// pool is full.
    pub fn add(&self, block: Block) -> bool {
        self.pool.add(Arc::new(BlockDetail::new(block)))
    }

    /// Inventory hashes not held in the orphan pool.
    pub fn filter_orphans(&self, hashes: Vec<BlockHash>) -> Vec<BlockHash> {
        self.pool.filter(hashes)
    }

    pub fn fork_chain_tips(&self) -> Vec<(BlockHash, u64)> {
        let tips = self.fork_tips.lock().unwrap();
        let mut list: Vec<_> = tips.iter().map(|(h, height)| (*h, *height)).collect();
        list.sort_by_key(|(_, height)| *height);
        list
    }

    pub fn add_fork_chain_tip(&self, hash: BlockHash, height: u64) {
        self.fork_tips.lock().unwrap().insert(hash, height);
    }

    pub fn delete_fork_chain_tip(&self, hash: &BlockHash) -> bool {
        self.fork_tips.lock().unwrap().remove(hash).is_some()
    }

    /// Whether a fork at `fork_height` is past every checkpoint and must be
    /// fully connected.
    pub fn strict(&self, fork_height: u64) -> bool {
        self.checkpoints.is_strict(fork_height)
    }

    pub fn count_inputs(block: &Block) -> usize {
        block.input_count()
    }

    /// Process every unprocessed pooled block, oldest first, until none are
    /// left or the organizer is stopped.
    pub fn organize(&self) -> Result<(), BlockchainError> {
        *self.process_queue.lock().unwrap() = self.pool.unprocessed();

        loop {
            if self.stopped() {
                return Ok(());
            }
            let next = self.process_queue.lock().unwrap().pop();
            let Some(detail) = next else {
                return Ok(());
            };
            if detail.is_processed() {
                continue;
            }
            self.process(&detail)?;
        }
    }

    fn process(&self, detail: &Arc<BlockDetail>) -> Result<(), BlockchainError> {
        // Connected or clipped by an earlier attempt.
        if !self.pool.exists(&detail.hash()) {
            detail.set_processed(true);
            return Ok(());
        }

        let chain = self.pool.trace(detail);
        let missing = chain[0].previous_hash();
        let Some(fork_height) = self.store.height_of(&missing)? else {
            if let Some(last) = chain.last() {
                self.pool.add_pending_block(missing, Arc::clone(last));
            }
            detail.set_processed(true);
            return Ok(());
        };

        let tip = self.store.last_height()?;
        let snapshot = self.witness.snapshot();
        if !self.params.witness.is_in_same_epoch(fork_height, tip) {
            self.refresh_witness_list(fork_height);
        }

        let outcome = match self.replace_chain(fork_height, &chain) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.witness.restore(snapshot);
                return match e {
                    BlockchainError::ServiceStopped => Ok(()),
                    other => Err(other),
                };
            }
        };

        if outcome.popped == 0 && outcome.pushed == 0 {
            self.witness.restore(snapshot);
        } else if outcome.popped != 0
            && outcome.pushed == 0
            && !self.params.witness.is_in_same_epoch(outcome.height, tip)
        {
            self.refresh_witness_list(outcome.height);
        }

        self.requeue_pending_children(&chain);
        for block in &chain {
            block.set_processed(true);
        }
        Ok(())
    }

    /// Children parked on any block of `chain` can be traced now. Children of
    /// clipped blocks are invalid too.
    fn requeue_pending_children(&self, chain: &[Arc<BlockDetail>]) {
        let mut queue = self.process_queue.lock().unwrap();
        for parent in chain {
            for child in self.pool.delete_pending_block(&parent.hash()) {
                if parent.error().is_some() {
                    child.set_error(ValidationError::PreviousBlockInvalid);
                    child.set_processed(true);
                    self.pool.remove(&child.hash());
                } else {
                    child.set_processed(false);
                    queue.push(child);
                }
            }
        }
    }

    fn refresh_witness_list(&self, height: u64) {
        let view = StoreView::new(self.store.as_ref(), height);
        let ctx: &dyn WitnessContext = &view;
        if let Err(e) = self.witness.update_witness_list(height, ctx) {
            tracing::warn!(height, error = %e, "failed to refresh witness list");
        }
    }

    /// Verify `chain` on top of `fork_height` and make it the main chain if it
    /// carries more work than the main-chain blocks above the fork.
    pub fn replace_chain(
        &self,
        fork_height: u64,
        chain: &[Arc<BlockDetail>],
    ) -> Result<ReplaceOutcome, BlockchainError> {
        let mut chain = chain.to_vec();
        let mut candidate_work = U256::zero();

        let mut index = 0;
        while index < chain.len() {
            if self.stopped() {
                return Err(BlockchainError::ServiceStopped);
            }
            let detail = Arc::clone(&chain[index]);
            let height = fork_height + 1 + index as u64;

            let checked = if detail.is_checked_work_proof() {
                self.replay_vote_result(fork_height, &chain, index)
            } else {
                self.verify(fork_height, &chain, index).map(|()| detail.set_checked_work_proof(true))
            };
            match checked {
                Ok(()) => {}
                Err(ValidationError::ServiceStopped) => return Err(BlockchainError::ServiceStopped),
                Err(ValidationError::Store(e)) => return Err(BlockchainError::Store(e)),
                Err(e) if self.exceptions.contains(height, &detail.hash()) => {
                    tracing::info!(height, hash = %detail.hash(), error = %e, "accepting historical exception block");
                    detail.set_checked_work_proof(true);
                }
                Err(e) => {
                    tracing::warn!(height, hash = %detail.hash(), error = %e, "invalid block");
                    self.clip_orphans(&mut chain, index, e);
                    break;
                }
            }

            candidate_work = candidate_work.saturating_add(block_work(detail.block().header.bits));
            index += 1;
        }

        let tip = self.store.last_height()?;
        let Some(last) = chain.last() else {
            return Ok(ReplaceOutcome::unchanged(tip));
        };

        let main_work = self.store.difficulty_at(fork_height + 1)?;
        if candidate_work <= main_work {
            let length = chain.len();
            self.add_fork_chain_tip(last.hash(), fork_height + length as u64);
            tracing::debug!(fork_height, length, "candidate chain has insufficient work");
            if length % self.params.locator_size.max(1) == 0 {
                self.events.read().unwrap().emit(&OrganizerEvent::NeedMoreBlocks {
                    fork_point: fork_height,
                    tip,
                    length,
                });
            }
            return Ok(ReplaceOutcome::unchanged(tip));
        }

        let released = match self.store.pop_from(fork_height + 1) {
            Ok(released) => released,
            Err(e) => {
                tracing::error!(fork_height, error = %e, "failed to pop main chain blocks");
                return Ok(ReplaceOutcome::unchanged(tip));
            }
        };

        let mut pushed = Vec::with_capacity(chain.len());
        let mut height = fork_height;
        for detail in &chain {
            if let Err(e) = self.store.push(detail.block().clone(), height + 1) {
                tracing::error!(height = height + 1, hash = %detail.hash(), error = %e, "failed to push block");
                break;
            }
            height += 1;
            detail.set_height(height);
            self.pool.remove(&detail.hash());
            self.delete_fork_chain_tip(&detail.hash());
            pushed.push(detail.block().clone());
        }

        self.pool.add_all(released.iter().map(|block| {
            let detail = Arc::new(BlockDetail::new(block.clone()));
            detail.set_processed(true);
            detail
        }));
        if let Some(old_tip) = released.last() {
            self.add_fork_chain_tip(old_tip.hash(), tip);
        }

        let outcome = ReplaceOutcome {
            popped: released.len(),
            pushed: pushed.len(),
            height,
        };
        if outcome.popped > 0 {
            tracing::warn!(fork_height, popped = outcome.popped, pushed = outcome.pushed, height, "chain reorganized");
        } else {
            tracing::debug!(fork_height, pushed = outcome.pushed, height, "chain extended");
        }

        self.notify_reorganize(fork_height, pushed, released);
        Ok(outcome)
    }

    /// Tell subscribers which blocks actually moved.
    fn notify_reorganize(&self, fork_point: u64, pushed: Vec<Block>, released: Vec<Block>) {
        self.events.read().unwrap().emit(&OrganizerEvent::Reorganized {
            fork_point,
            pushed,
            released,
        });
    }

    /// A verified block skips its checks, but an epoch's first witness block
    /// still has to install the list later blocks are signed against.
    fn replay_vote_result(
        &self,
        fork_height: u64,
        chain: &[Arc<BlockDetail>],
        index: usize,
    ) -> Result<(), ValidationError> {
        let ctx = ChainContext::new(self.store.as_ref(), fork_height, chain, index);
        let block = ctx.current().block();
        if block.proof() != ProofKind::Dpos || !self.witness.is_begin_of_epoch(ctx.height()) {
            return Ok(());
        }
        let witness_ctx: &dyn WitnessContext = &ctx;
        self.witness
            .update_witness_list_from_block(block, witness_ctx)
            .map_err(ValidationError::VoteResult)
    }

    fn validator(&self) -> BlockValidator<'_> {
        BlockValidator {
            params: &self.params,
            checkpoints: &self.checkpoints,
            witness: self.witness.as_ref(),
            scripts: self.scripts.as_ref(),
            mempool: self.mempool.as_ref(),
            clock: self.clock.as_ref(),
            stop: &self.stop,
            parallel: self.parallel_connect,
        }
    }

    /// Run every validation stage on `chain[index]`. Full connection only
    /// happens past the last checkpoint.
    pub fn verify(
        &self,
        fork_height: u64,
        chain: &[Arc<BlockDetail>],
        index: usize,
    ) -> Result<(), ValidationError> {
        let started = Instant::now();
        let ctx = ChainContext::new(self.store.as_ref(), fork_height, chain, index);
        let validator = self.validator();

        validator.check_block(&ctx)?;
        validator.accept_block(&ctx)?;
        if self.strict(fork_height) {
            validator.connect_block(&ctx)?;
        }

        let block = ctx.current().block();
        tracing::info!(
            height = ctx.height(),
            hash = %ctx.current().hash(),
            txs = block.transactions.len(),
            inputs = Self::count_inputs(block),
            elapsed = %format_millis(started.elapsed()),
            "block verified"
        );
        Ok(())
    }

    /// Mark `chain[index]` with `error` and every later block as having an
    /// invalid ancestor, drop them from the pool and cut the chain there.
    pub fn clip_orphans(&self, chain: &mut Vec<Arc<BlockDetail>>, index: usize, error: ValidationError) {
        if index >= chain.len() {
            return;
        }

        let mut clipped = HashSet::new();
        for (offset, detail) in chain[index..].iter().enumerate() {
            let reason = if offset == 0 {
                error.clone()
            } else {
                ValidationError::PreviousBlockInvalid
            };
            detail.set_error(reason);
            detail.set_processed(true);
            self.pool.remove(&detail.hash());
            self.delete_fork_chain_tip(&detail.hash());
            clipped.insert(detail.hash());
        }

        self.process_queue
            .lock()
            .unwrap()
            .retain(|b| !clipped.contains(&b.hash()));
        chain.truncate(index);
    }
}
