use std::collections::HashSet;

use mvs_types::{Attachment, Block, CertType, OutPoint, ProofKind, Transaction};
use rayon::prelude::*;

use super::{BlockValidator, ProofRules};
use crate::chain_context::{ChainContext, ChainView, InputRef};
use crate::ValidationError;

/// What a transaction's inputs contribute to the block totals.
struct InputTally {
    value_in: u64,
    sigops: usize,
}

impl BlockValidator<'_> {
    /// Full semantic validation: inputs, fees, rewards and uniqueness of
    /// issued business objects.
    ///
    /// Every transaction is checked even after one fails, so each invalid
    /// transaction can be evicted from the mempool. The first failure in
    /// block order is returned.
    pub fn connect_block(&self, ctx: &ChainContext<'_>) -> Result<(), ValidationError> {
        self.poll()?;
        let block = ctx.current().block();
        let height = ctx.height();

        let screened = self.screen_transactions(ctx, block)?;

        // The coinbase has no inputs to check.
        let checked: Vec<Option<Result<InputTally, ValidationError>>> =
            if self.parallel && block.transactions.len() > 2 {
                block
                    .transactions
                    .par_iter()
                    .enumerate()
                    .map(|(index, tx)| (index > 0).then(|| self.check_inputs(ctx, index, tx)))
                    .collect()
            } else {
                block
                    .transactions
                    .iter()
                    .enumerate()
                    .map(|(index, tx)| (index > 0).then(|| self.check_inputs(ctx, index, tx)))
                    .collect()
            };

        let mut first_error = None;
        let mut sigops: usize = block.transactions.iter().map(Transaction::legacy_sigops).sum();
        let mut fees = 0u64;
        let mut stake_reward = 0u64;

        let rows = block.transactions.iter().zip(screened).zip(checked).enumerate();
        for (index, ((tx, screen), check)) in rows {
            let outcome = match (screen, check) {
                (Some(e), _) => Err(e),
                (None, None) => Ok(()),
                (None, Some(result)) => result.and_then(|tally| {
                    sigops += tally.sigops;
                    if sigops > self.params.max_block_sigops {
                        return Err(ValidationError::TooManySigs);
                    }
                    let value_out = tx.total_output_value().ok_or(ValidationError::FeesOutOfRange)?;
                    if index == 1 && block.proof() == ProofKind::Pos && tx.is_coinstake() {
                        stake_reward = value_out.saturating_sub(tally.value_in);
                        return Ok(());
                    }
                    let fee = tally
                        .value_in
                        .checked_sub(value_out)
                        .ok_or(ValidationError::FeesOutOfRange)?;
                    fees = fees.checked_add(fee).ok_or(ValidationError::FeesOutOfRange)?;
                    Ok(())
                }),
            };

            match outcome {
                Ok(()) => {}
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => {
                    self.mempool.delete_tx(&tx.hash());
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.check_rewards(block, height, fees, stake_reward)
    }

    /// A transaction hash that already exists with every output spent.
    fn is_spent_duplicate(&self, ctx: &ChainContext<'_>, tx: &Transaction) -> Result<bool, ValidationError> {
        let hash = tx.hash();
        let Some((existing, _)) = ctx.previous_transaction(&hash)? else {
            return Ok(false);
        };
        for index in 0..existing.outputs.len() {
            if !ctx.is_output_spent(&OutPoint::new(hash, index as u32), None)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Per-transaction duplicate checks, one slot per transaction in block
    /// order. Only store and stop errors fail the whole pass.
    fn screen_transactions(
        &self,
        ctx: &ChainContext<'_>,
        block: &Block,
    ) -> Result<Vec<Option<ValidationError>>, ValidationError> {
        let mut assets = HashSet::new();
        let mut certs: HashSet<(&str, CertType)> = HashSet::new();
        let mut mits = HashSet::new();
        let mut dids = HashSet::new();

        let mut screened = Vec::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            self.poll()?;
            if self.is_spent_duplicate(ctx, tx)? {
                screened.push(Some(ValidationError::DuplicateOrSpent));
                continue;
            }

            let mut error = None;
            for output in &tx.outputs {
                let duplicate = match &output.attachment {
                    Attachment::AssetIssue { symbol } => {
                        let taken = !assets.insert(symbol.as_str()) || ctx.asset_exists(symbol)?;
                        taken.then(|| ValidationError::DuplicateAsset(symbol.clone()))
                    }
                    Attachment::AssetCert { symbol, cert } => {
                        let taken = !certs.insert((symbol.as_str(), *cert));
                        taken.then(|| ValidationError::DuplicateCert(symbol.clone()))
                    }
                    Attachment::AssetMit { symbol } => {
                        let taken = !mits.insert(symbol.as_str()) || ctx.mit_exists(symbol)?;
                        taken.then(|| ValidationError::DuplicateMit(symbol.clone()))
                    }
                    Attachment::DidRegister { symbol, .. } => {
                        let taken = !dids.insert(symbol.as_str()) || ctx.did_exists(symbol)?;
                        taken.then(|| ValidationError::DuplicateDid(symbol.clone()))
                    }
                    _ => None,
                };
                if duplicate.is_some() {
                    error = duplicate;
                    break;
                }
            }
            screened.push(error);
        }
        Ok(screened)
    }

    /// Read-only checks of every input of `tx`. Store and stop errors pass
    /// through; anything wrong with the transaction itself is reported as
    /// `ValidateInputsFailed`.
    fn check_inputs(
        &self,
        ctx: &ChainContext<'_>,
        tx_index: usize,
        tx: &Transaction,
    ) -> Result<InputTally, ValidationError> {
        let height = ctx.height();
        let hash = tx.hash();
        let fail = |input_index: usize, reason: &'static str| {
            tracing::warn!(tx = %hash, input = input_index, height, reason, "invalid input");
            ValidationError::ValidateInputsFailed(hash)
        };

        let mut tally = InputTally {
            value_in: 0,
            sigops: 0,
        };
        for (input_index, input) in tx.inputs.iter().enumerate() {
            self.poll()?;
            let previous = input.previous_output;
            let Some((prev_tx, prev_height)) = ctx.transaction_by_hash(&previous.hash)? else {
                return Err(fail(input_index, "previous transaction not found"));
            };
            let Some(output) = prev_tx.outputs.get(previous.index as usize) else {
                return Err(fail(input_index, "previous output not found"));
            };

            if output.value > self.params.max_money {
                return Err(fail(input_index, "previous output value out of range"));
            }
            if let Some(extra) = self.scripts.script_hash_sigops(&output.script, &input.script) {
                tally.sigops += extra;
            }
            if (prev_tx.is_coinbase() || prev_tx.is_coinstake())
                && height.saturating_sub(prev_height) < self.params.coinbase_maturity
            {
                return Err(fail(input_index, "immature coinbase spend"));
            }
            if !self.scripts.verify_input(&output.script, tx, input_index) {
                return Err(fail(input_index, "script verification failed"));
            }

            let spender = InputRef {
                height,
                tx_index,
                input_index,
            };
            if ctx.is_output_spent(&previous, Some(spender))? {
                return Err(fail(input_index, "double spend"));
            }

            tally.value_in = tally
                .value_in
                .checked_add(output.value)
                .ok_or_else(|| fail(input_index, "input value overflow"))?;
            if tally.value_in > self.params.max_money {
                return Err(fail(input_index, "input value out of range"));
            }
        }
        Ok(tally)
    }

    fn check_rewards(&self, block: &Block, height: u64, fees: u64, stake_reward: u64) -> Result<(), ValidationError> {
        let coinbase = &block.transactions[0];
        let paid = coinbase
            .outputs
            .iter()
            .filter(|o| o.attachment.is_etp())
            .try_fold(stake_reward, |total, o| total.checked_add(o.value))
            .ok_or(ValidationError::CoinbaseTooLarge)?;
        let allowed = block.proof().reward(height, self.params).saturating_add(fees);
        if paid > allowed {
            return Err(ValidationError::CoinbaseTooLarge);
        }

        let mst_limit = self.params.mst_subsidy(height);
        for output in &coinbase.outputs {
            if let Attachment::AssetTransfer { symbol, quantity } = &output.attachment {
                if *symbol == self.params.mst_symbol && *quantity > mst_limit {
                    return Err(ValidationError::MstRewardTooLarge);
                }
            }
        }
        Ok(())
    }
}
