//! Per-proof-kind rules that don't need chain context.

use mvs_types::ProofKind;

use crate::settings::ChainParams;

pub trait ProofRules {
    /// Maximum coinbase (or coinstake) reward, excluding fees.
    fn reward(&self, height: u64, params: &ChainParams) -> u64;

    /// Whether the block must carry a signature over its header.
    fn requires_signature(&self) -> bool;
}

impl ProofRules for ProofKind {
    fn reward(&self, height: u64, params: &ChainParams) -> u64 {
        match self {
            ProofKind::Pow => params.pow_subsidy(height),
            ProofKind::Pos => params.pos_reward,
            ProofKind::Dpos => params.dpos_reward,
        }
    }

    fn requires_signature(&self) -> bool {
        matches!(self, ProofKind::Pos | ProofKind::Dpos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewards_follow_proof_kind() {
        let params = ChainParams::regtest();
        assert_eq!(ProofKind::Pow.reward(0, &params), params.initial_subsidy);
        assert_eq!(ProofKind::Pos.reward(10_000, &params), params.pos_reward);
        assert_eq!(ProofKind::Dpos.reward(10_000, &params), params.dpos_reward);
    }

    #[test]
    fn only_pow_is_unsigned() {
        assert!(!ProofKind::Pow.requires_signature());
        assert!(ProofKind::Pos.requires_signature());
        assert!(ProofKind::Dpos.requires_signature());
    }
}
