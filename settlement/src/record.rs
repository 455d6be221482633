//! Settlement records.

use serde::{Deserialize, Serialize};
use tribunal_challenge::MarkReason;
use tribunal_types::{CaseId, CaseResult, ParticipantId, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementEffect {
    Reward(u128),
    Punishment(u128),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementReason {
    /// Principal on the losing side of the result.
    LostCase,
    /// Validator whose ballot agrees with the final result.
    VotedWithResult,
    /// Validator whose ballot disagrees with the final result.
    VotedAgainstResult,
    /// Tag produced by challenge resolution.
    Challenge(MarkReason),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub case_id: CaseId,
    pub participant: ParticipantId,
    pub role: Role,
    pub effect: SettlementEffect,
    pub reason: SettlementReason,
}

/// Totals and records of one settled case.
///
/// `rewards + reserve_cut + punishments_retained == total_pool` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub case_id: CaseId,
    pub result: CaseResult,
    /// Everything slashed during settlement.
    pub total_pool: u128,
    /// Losing principal plus failed challenger deposits.
    pub distributable: u128,
    pub reward_pool: u128,
    /// Actually paid to reward recipients.
    pub rewards: u128,
    /// `distributable - rewards`, kept by the reserve.
    pub reserve_cut: u128,
    /// Other punishments, kept by the reserve.
    pub punishments_retained: u128,
    /// Collateral returned to participants.
    pub released: u128,
    pub records: Vec<SettlementRecord>,
}

impl SettlementSummary {
    pub fn rewarded(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.effect, SettlementEffect::Reward(_)))
    }

    pub fn punished(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.effect, SettlementEffect::Punishment(_)))
    }
}
