//! Case resolution parameters.
//!
//! Every field has a default and can be overridden from the `[params]` table
//! of the engine configuration file.

use crate::state::{RiskTier, Role};
use serde::{Deserialize, Serialize};

/// How a ballot's weight is derived from the voter's unfrozen balance.
///
/// All variants are monotonic non-decreasing in the balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Weighting {
    /// Weight equals the unfrozen balance.
    Linear,
    /// Weight equals the unfrozen balance, capped.
    Capped { cap: u128 },
    /// Weight is the integer square root of the unfrozen balance.
    SquareRoot,
}

impl Weighting {
    pub fn weight(&self, unfrozen: u128) -> u128 {
        match self {
            Self::Linear => unfrozen,
            Self::Capped { cap } => unfrozen.min(*cap),
            Self::SquareRoot => crate::amount::isqrt(unfrozen),
        }
    }
}

/// Result of a round whose support and reject weights are exactly equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the status quo: the complaint is rejected.
    Reject,
    /// The complaint is upheld.
    Uphold,
}

/// How the reward pool is split among reward-tagged participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPolicy {
    /// Every recipient receives the same floor share.
    FlatEqual,
    /// Shares proportional to ballot weight (challengers weigh their deposit).
    WeightProportional,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseParams {
    // ── Validator sizing ─────────────────────────────────────────────────
    pub min_validators: u32,
    pub max_validators: u32,

    // ── Voting ───────────────────────────────────────────────────────────
    /// Share of assigned validators that must vote before an early close (bps).
    pub quorum_bps: u32,
    /// Support-weight share that must be exceeded to uphold a complaint (bps).
    pub majority_bps: u32,
    pub tie_break: TieBreak,
    pub weighting: Weighting,
    pub voting_period_secs: u64,
    /// Collateral frozen by each case ballot and each challenge ballot.
    pub ballot_stake: u128,
    /// Share of a losing voter's ballot stake forfeited at settlement (bps).
    pub wrong_vote_penalty_bps: u32,
    /// How many times an undetermined round may be reopened.
    pub max_reopens: u32,

    // ── Deposits ─────────────────────────────────────────────────────────
    pub min_complainant_deposit: u128,
    pub min_enterprise_deposit: u128,
    /// Staked amount a validator needs to be eligible for selection.
    pub min_validator_stake: u128,
    pub withdrawal_fee_bps: u32,
    pub deposit_lock_secs: u64,
    pub stake_lock_secs: u64,

    // ── Challenges ───────────────────────────────────────────────────────
    pub challenge_period_secs: u64,
    pub challenge_voting_period_secs: u64,
    pub min_challenge_deposit: u128,
    pub challenge_verifier_count: u32,
    pub challenge_quorum_bps: u32,
    /// Support-weight share that must be exceeded for a challenge to succeed (bps).
    pub challenge_success_bps: u32,
    /// Share of the deposit forfeited when a challenge expires without quorum (bps).
    pub expired_challenge_penalty_bps: u32,

    // ── Settlement ───────────────────────────────────────────────────────
    /// Share of the distributable pool paid out as rewards (bps); the rest
    /// goes to the reserve.
    pub reward_share_bps: u32,
    pub reward_policy: RewardPolicy,
}

impl CaseParams {
    /// Minimum unfrozen deposit a principal of `role` must hold.
    pub fn min_deposit(&self, role: Role) -> u128 {
        match role {
            Role::Complainant => self.min_complainant_deposit,
            Role::Enterprise => self.min_enterprise_deposit,
            Role::Validator => self.ballot_stake,
        }
    }

    /// Base validator count for a tier, before evidence adjustment.
    pub fn base_validators(&self, tier: RiskTier) -> u32 {
        match tier {
            RiskTier::Low => self.min_validators,
            RiskTier::Medium => {
                self.min_validators + self.max_validators.saturating_sub(self.min_validators) / 2
            }
            RiskTier::High => self.max_validators,
        }
    }

    /// Check internal consistency of the parameter set.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_validators == 0 {
            return Err("min_validators must be at least 1".into());
        }
        if self.min_validators > self.max_validators {
            return Err(format!(
                "min_validators ({}) exceeds max_validators ({})",
                self.min_validators, self.max_validators
            ));
        }
        for (name, bps) in [
            ("quorum_bps", self.quorum_bps),
            ("majority_bps", self.majority_bps),
            ("wrong_vote_penalty_bps", self.wrong_vote_penalty_bps),
            ("withdrawal_fee_bps", self.withdrawal_fee_bps),
            ("challenge_quorum_bps", self.challenge_quorum_bps),
            ("challenge_success_bps", self.challenge_success_bps),
            ("expired_challenge_penalty_bps", self.expired_challenge_penalty_bps),
            ("reward_share_bps", self.reward_share_bps),
        ] {
            if bps > crate::amount::BPS_DENOMINATOR {
                return Err(format!("{name} ({bps}) exceeds 10000 basis points"));
            }
        }
        // A zero quorum would close a round before its deadline with no ballots.
        if self.quorum_bps == 0 {
            return Err("quorum_bps must be at least 1".into());
        }
        if self.challenge_quorum_bps == 0 {
            return Err("challenge_quorum_bps must be at least 1".into());
        }
        if self.challenge_verifier_count == 0 {
            return Err("challenge_verifier_count must be at least 1".into());
        }
        if self.min_challenge_deposit == 0 {
            return Err("min_challenge_deposit must be non-zero".into());
        }
        Ok(())
    }
}

impl Default for CaseParams {
    fn default() -> Self {
        Self {
            min_validators: 3,
            max_validators: 9,

            quorum_bps: 6000,   // 60%
            majority_bps: 5000, // simple majority
            tie_break: TieBreak::Reject,
            weighting: Weighting::Linear,
            voting_period_secs: 3 * 24 * 3600,
            ballot_stake: 100,
            wrong_vote_penalty_bps: 10_000,
            max_reopens: 2,

            min_complainant_deposit: 500,
            min_enterprise_deposit: 5_000,
            min_validator_stake: 1_000,
            withdrawal_fee_bps: 50, // 0.5%
            deposit_lock_secs: 24 * 3600,
            stake_lock_secs: 7 * 24 * 3600,

            challenge_period_secs: 2 * 24 * 3600,
            challenge_voting_period_secs: 24 * 3600,
            min_challenge_deposit: 1_000,
            challenge_verifier_count: 5,
            challenge_quorum_bps: 6000,
            challenge_success_bps: 5000,
            expired_challenge_penalty_bps: 5000,

            reward_share_bps: 9000, // 90% to rewards, 10% reserve
            reward_policy: RewardPolicy::FlatEqual,
        }
    }
}
