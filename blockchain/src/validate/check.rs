use std::collections::HashSet;

use mvs_consensus::{check_stake_kernel, stake_kernel_hash, WitnessContext};
use mvs_crypto::verify_header_signature;
use mvs_types::{generate_merkle_root, Attachment, Block, ProofKind, Transaction};
use mvs_work::check_proof_of_work;

use super::{BlockValidator, ProofRules};
use crate::chain_context::{ChainContext, ChainView};
use crate::ValidationError;

impl BlockValidator<'_> {
    /// Rules that need at most the previous header and the stake output.
    pub fn check_block(&self, ctx: &ChainContext<'_>) -> Result<(), ValidationError> {
        self.poll()?;
        let detail = ctx.current();
        let block = detail.block();
        let height = ctx.height();

        if block.transactions.is_empty() || block.serialized_size() > self.params.max_block_size {
            return Err(ValidationError::SizeLimits);
        }
        if block.header.number != height {
            return Err(ValidationError::HeightMismatch {
                expected: height,
                declared: block.header.number,
            });
        }

        if !detail.is_checked_work_proof() {
            self.check_work(ctx)?;
            self.check_block_signature(block)?;
        }

        let now = self.clock.now_secs();
        if u64::from(block.header.timestamp) > now + self.params.timestamp_future_window {
            return Err(ValidationError::FuturisticTimestamp);
        }
        if height >= self.params.monotonic_timestamp_height {
            let previous = ctx.require_header(height - 1)?;
            if block.header.timestamp < previous.timestamp {
                return Err(ValidationError::TimestampTooEarly);
            }
        }

        if !self.checkpoints.validate(&detail.hash(), height) {
            return Err(ValidationError::CheckpointsFailed);
        }

        self.check_coinbase(block)?;

        let leading = if block.proof() == ProofKind::Pos { 2 } else { 1 };
        for tx in &block.transactions[leading..] {
            if tx.is_coinbase() {
                return Err(ValidationError::ExtraCoinbases);
            }
            if tx.is_coinstake() {
                return Err(ValidationError::ExtraCoinstakes);
            }
        }

        let mut hashes = HashSet::with_capacity(block.transactions.len());
        let mut sigops = 0usize;
        for tx in &block.transactions {
            self.poll()?;
            self.check_transaction(tx)?;
            if !hashes.insert(tx.hash()) {
                return Err(ValidationError::Duplicate);
            }
            sigops += tx.legacy_sigops();
        }
        if sigops > self.params.max_block_sigops {
            return Err(ValidationError::TooManySigs);
        }

        if generate_merkle_root(&block.transactions) != block.header.merkle_root {
            return Err(ValidationError::MerkleMismatch);
        }
        Ok(())
    }

    fn check_work(&self, ctx: &ChainContext<'_>) -> Result<(), ValidationError> {
        let block = ctx.current().block();
        match block.proof() {
            ProofKind::Pow => check_proof_of_work(&block.hash(), block.header.bits, self.params.pow_limit_bits)
                .map_err(|_| ValidationError::ProofOfWork),
            ProofKind::Pos => self.check_proof_of_stake(ctx),
            ProofKind::Dpos => self.check_witness_signer(ctx),
        }
    }

    fn check_proof_of_stake(&self, ctx: &ChainContext<'_>) -> Result<(), ValidationError> {
        let block = ctx.current().block();
        let height = ctx.height();
        if !self.params.stake.is_enabled(height) {
            return Err(ValidationError::ProofOfStake("proof of stake not enabled"));
        }

        let coinstake = block
            .transactions
            .get(1)
            .filter(|tx| tx.is_coinstake())
            .ok_or(ValidationError::MissingCoinstake)?;
        let stake = coinstake.inputs[0].previous_output;

        let (stake_tx, stake_height) = ctx
            .transaction_by_hash(&stake.hash)?
            .ok_or(ValidationError::ProofOfStake("stake transaction not found"))?;
        let output = stake_tx
            .outputs
            .get(stake.index as usize)
            .ok_or(ValidationError::ProofOfStake("stake output not found"))?;

        if output.script.public_key().is_none() || output.script.public_key() != block.public_key {
            return Err(ValidationError::ProofOfStake("stake not owned by block signer"));
        }
        if !self.params.stake.is_stake_capable(output.value, height.saturating_sub(stake_height)) {
            return Err(ValidationError::ProofOfStake("stake output not capable"));
        }

        let kernel = stake_kernel_hash(&block.header.previous_hash, &stake, block.header.timestamp);
        if !check_stake_kernel(&kernel, block.header.bits, output.value) {
            return Err(ValidationError::ProofOfStake("stake kernel above target"));
        }
        Ok(())
    }

    fn check_witness_signer(&self, ctx: &ChainContext<'_>) -> Result<(), ValidationError> {
        let block = ctx.current().block();
        let height = ctx.height();
        if !self.params.witness.is_witness_enabled(height) {
            return Err(ValidationError::WitnessNotEnabled);
        }

        let witness_ctx: &dyn WitnessContext = ctx;
        if self.witness.is_begin_of_epoch(height) {
            self.witness
                .update_witness_list_from_block(block, witness_ctx)
                .map_err(ValidationError::VoteResult)?;
        }

        let signer = block.public_key.ok_or(ValidationError::BlockSignature)?;
        if !self.witness.verify_signer(&signer, height, witness_ctx) {
            return Err(ValidationError::WitnessMismatch);
        }
        Ok(())
    }

    fn check_block_signature(&self, block: &Block) -> Result<(), ValidationError> {
        if !block.proof().requires_signature() {
            return Ok(());
        }
        match (&block.public_key, &block.signature) {
            (Some(key), Some(signature)) if verify_header_signature(&block.header, signature, key) => Ok(()),
            _ => Err(ValidationError::BlockSignature),
        }
    }

    /// One coinbase in first position, paying one output plus optionally a
    /// vote result or the mining-token reward.
    fn check_coinbase(&self, block: &Block) -> Result<(), ValidationError> {
        let coinbase = &block.transactions[0];
        if !coinbase.is_coinbase() {
            return Err(ValidationError::FirstNotCoinbase);
        }
        let valid_outputs = match coinbase.outputs.as_slice() {
            [_] => true,
            [_, second] => {
                second.is_vote_result()
                    || matches!(&second.attachment, Attachment::AssetTransfer { symbol, .. } if *symbol == self.params.mst_symbol)
            }
            _ => false,
        };
        if !valid_outputs {
            return Err(ValidationError::InvalidCoinbaseOutputs);
        }
        if block.proof() == ProofKind::Pos
            && !block.transactions.get(1).is_some_and(Transaction::is_coinstake)
        {
            return Err(ValidationError::MissingCoinstake);
        }
        Ok(())
    }

    fn check_transaction(&self, tx: &Transaction) -> Result<(), ValidationError> {
        let invalid = |reason| ValidationError::InvalidTransaction {
            hash: tx.hash(),
            reason,
        };
        if tx.inputs.is_empty() {
            return Err(invalid("no inputs"));
        }
        if tx.outputs.is_empty() {
            return Err(invalid("no outputs"));
        }
        match tx.total_output_value() {
            Some(total) if total <= self.params.max_money => {}
            _ => return Err(invalid("output value out of range")),
        }
        if !tx.is_coinbase() && tx.inputs.iter().any(|i| i.previous_output.is_null()) {
            return Err(invalid("null previous output"));
        }
        Ok(())
    }
}
