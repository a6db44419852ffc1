use mvs_store::StoreError;
use mvs_types::{Header, ProofKind};
use mvs_work::retarget_bits;

use super::BlockValidator;
use crate::cancel::StopSignal;
use crate::chain_context::{ChainContext, ChainView};
use crate::settings::ChainParams;
use crate::ValidationError;

impl BlockValidator<'_> {
    /// Rules that depend on the block's height in the chain.
    pub fn accept_block(&self, ctx: &ChainContext<'_>) -> Result<(), ValidationError> {
        self.poll()?;
        let detail = ctx.current();
        let header = &detail.block().header;
        let height = ctx.height();

        let expected = work_required(ctx, self.params, height, header.proof, self.stop)?;
        if header.bits != expected {
            return Err(ValidationError::IncorrectProofOfWork {
                expected,
                actual: header.bits,
            });
        }

        if !self.checkpoints.validate(&detail.hash(), height) {
            return Err(ValidationError::CheckpointsFailed);
        }

        let minimum = self.minimum_version(ctx, height)?;
        if header.version < minimum {
            return Err(ValidationError::OldVersionBlock(minimum));
        }
        Ok(())
    }

    /// Highest version carried by at least `version_enforce` of the last
    /// `version_sample` blocks, or zero when fewer blocks exist.
    fn minimum_version(&self, ctx: &ChainContext<'_>, height: u64) -> Result<u32, ValidationError> {
        let sample = self.params.version_sample as u64;
        let mut versions = Vec::with_capacity(self.params.version_sample);
        for h in (height.saturating_sub(sample)..height).rev() {
            self.poll()?;
            versions.push(ctx.require_header(h)?.version);
        }
        let enforce = self.params.version_enforce;
        if enforce == 0 || versions.len() < enforce {
            return Ok(0);
        }
        versions.sort_unstable_by(|a, b| b.cmp(a));
        Ok(versions[enforce - 1])
    }
}

/// Compact target a `proof` block at `height` must declare.
///
/// Witness blocks always declare the limit, so each counts the minimum work.
/// Proof-of-work retargets at interval boundaries. Everywhere else a block
/// inherits the bits of the nearest earlier block of the same proof kind,
/// looking back at most one retarget interval.
pub fn work_required(
    ctx: &dyn ChainView,
    params: &ChainParams,
    height: u64,
    proof: ProofKind,
    stop: &StopSignal,
) -> Result<u32, ValidationError> {
    if height == 0 || proof == ProofKind::Dpos {
        return Ok(params.pow_limit_bits);
    }

    let interval = params.retarget_interval.max(1);
    if params.retarget && proof == ProofKind::Pow && height % interval == 0 {
        let last = require(ctx, height - 1)?;
        let first = require(ctx, height.saturating_sub(interval))?;
        let actual = u64::from(last.timestamp.saturating_sub(first.timestamp));
        return Ok(retarget_bits(last.bits, actual, params.target_timespan, params.pow_limit_bits));
    }

    for h in (height.saturating_sub(interval)..height).rev() {
        if stop.is_stopped() {
            return Err(ValidationError::ServiceStopped);
        }
        let header = require(ctx, h)?;
        if header.proof == proof {
            return Ok(header.bits);
        }
    }
    Ok(params.pow_limit_bits)
}

fn require(ctx: &dyn ChainView, height: u64) -> Result<Header, ValidationError> {
    ctx.header_at(height)?
        .ok_or_else(|| StoreError::NotFound(format!("header at height {height}")).into())
}
