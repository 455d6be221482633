//! Case state: roles, risk tiers, ballot choices, outcomes and the case record.

use crate::{CaseId, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The class a participant belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Complainant,
    Enterprise,
    Validator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Complainant => "complainant",
            Self::Enterprise => "enterprise",
            Self::Validator => "validator",
        };
        f.write_str(s)
    }
}

/// Complaint severity. Drives validator count and the deposit-freeze policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Whether the respondent's minimum deposit is frozen when the case locks.
    pub fn freezes_respondent(&self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }

    /// Whether the complainant's minimum deposit is frozen when the case locks.
    pub fn freezes_complainant(&self) -> bool {
        matches!(self, Self::High)
    }
}

/// A ballot choice on a case or a challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    /// Case ballot: the complaint is founded. Challenge ballot: the challenge is founded.
    Support,
    Reject,
}

/// Tri-state case result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseResult {
    Undetermined,
    ComplaintUpheld,
    ComplaintRejected,
}

impl CaseResult {
    /// The opposite determined result. `Undetermined` stays undetermined.
    pub fn flipped(self) -> Self {
        match self {
            Self::Undetermined => Self::Undetermined,
            Self::ComplaintUpheld => Self::ComplaintRejected,
            Self::ComplaintRejected => Self::ComplaintUpheld,
        }
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::Undetermined)
    }

    /// The ballot choice that agrees with this result.
    pub fn winning_choice(&self) -> Option<Choice> {
        match self {
            Self::Undetermined => None,
            Self::ComplaintUpheld => Some(Choice::Support),
            Self::ComplaintRejected => Some(Choice::Reject),
        }
    }
}

/// Lifecycle state of a case.
///
/// ```text
/// Created ─▶ DepositsLocked ─▶ VotingOpen ─▶ Challenging ─▶ Settling ─▶ Completed
///    │              │              │
///    └──────────────┴──────────────┴─▶ Cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    Created,
    DepositsLocked,
    VotingOpen,
    Challenging,
    Settling,
    Completed,
    Cancelled,
}

impl CaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// What a challenger asserts about the target voter's ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeClaim {
    /// The voter misbehaved but the case result stands.
    Uphold,
    /// The voter misbehaved and the case result must be reversed.
    Flip,
}

/// Tri-state challenge outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeOutcome {
    Pending,
    Successful,
    Failed,
}

/// A food-safety complaint moving through resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub complainant: ParticipantId,
    pub respondent: ParticipantId,
    pub risk_tier: RiskTier,
    pub evidence_count: u32,
    pub status: CaseStatus,
    /// Number of validators assigned to the current voting round.
    pub required_votes: u32,
    pub voting_deadline: Option<Timestamp>,
    pub challenge_deadline: Option<Timestamp>,
    /// The result settlement acts on (after any challenge reversal).
    pub result: CaseResult,
    /// The result as the validators voted it.
    pub vote_result: CaseResult,
    /// Set exactly once, by settlement.
    pub settled: bool,
    /// Quorum was not reached by the voting deadline; needs reopen or cancel.
    pub needs_review: bool,
    pub reopen_count: u32,
    pub created_at: Timestamp,
}

impl Case {
    pub fn new(
        id: CaseId,
        complainant: ParticipantId,
        respondent: ParticipantId,
        risk_tier: RiskTier,
        evidence_count: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            complainant,
            respondent,
            risk_tier,
            evidence_count,
            status: CaseStatus::Created,
            required_votes: 0,
            voting_deadline: None,
            challenge_deadline: None,
            result: CaseResult::Undetermined,
            vote_result: CaseResult::Undetermined,
            settled: false,
            needs_review: false,
            reopen_count: 0,
            created_at: now,
        }
    }

    /// Whether `who` is the complainant or the respondent.
    pub fn is_party(&self, who: &ParticipantId) -> bool {
        &self.complainant == who || &self.respondent == who
    }

    /// The principal who loses collateral under the current result.
    pub fn losing_party(&self) -> Option<&ParticipantId> {
        match self.result {
            CaseResult::ComplaintUpheld => Some(&self.respondent),
            CaseResult::ComplaintRejected => Some(&self.complainant),
            CaseResult::Undetermined => None,
        }
    }

    /// The principal whose collateral is returned under the current result.
    pub fn winning_party(&self) -> Option<&ParticipantId> {
        match self.result {
            CaseResult::ComplaintUpheld => Some(&self.complainant),
            CaseResult::ComplaintRejected => Some(&self.respondent),
            CaseResult::Undetermined => None,
        }
    }
}
