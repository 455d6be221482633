//! Voting round state.

use serde::{Deserialize, Serialize};
use tribunal_types::{CaseId, CaseResult, Choice, ParticipantId, Timestamp};

/// A validator's vote on a case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub case_id: CaseId,
    pub voter: ParticipantId,
    pub choice: Choice,
    /// Derived from the voter's unfrozen balance at cast time.
    pub weight: u128,
    /// Collateral frozen by this ballot.
    pub stake: u128,
    pub cast_at: Timestamp,
}

/// One round of validator voting on a case.
///
/// A reopened case gets a fresh round; earlier rounds are kept so their
/// voters can be excluded from the next assignment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingRound {
    pub case_id: CaseId,
    /// 0 for the first round, incremented on each reopen.
    pub index: u32,
    /// Validators assigned to this round, in assignment order.
    pub assigned: Vec<ParticipantId>,
    /// Ballots in cast order.
    pub ballots: Vec<Ballot>,
    pub support_weight: u128,
    pub reject_weight: u128,
    pub opened_at: Timestamp,
    pub deadline: Timestamp,
    pub closed: bool,
    pub result: CaseResult,
}

impl VotingRound {
    pub fn is_assigned(&self, who: &ParticipantId) -> bool {
        self.assigned.contains(who)
    }

    pub fn ballot(&self, voter: &ParticipantId) -> Option<&Ballot> {
        self.ballots.iter().find(|b| &b.voter == voter)
    }

    pub fn has_voted(&self, voter: &ParticipantId) -> bool {
        self.ballot(voter).is_some()
    }

    pub fn voters(&self) -> impl Iterator<Item = &ParticipantId> {
        self.ballots.iter().map(|b| &b.voter)
    }

    pub fn votes_cast(&self) -> u32 {
        self.ballots.len() as u32
    }

    pub fn assigned_count(&self) -> u32 {
        self.assigned.len() as u32
    }

    pub fn all_voted(&self) -> bool {
        !self.assigned.is_empty() && self.ballots.len() == self.assigned.len()
    }

    pub fn total_weight(&self) -> u128 {
        self.support_weight.saturating_add(self.reject_weight)
    }
}

/// How a round closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundClose {
    pub result: CaseResult,
    /// False when the round closed at its deadline without quorum.
    pub quorum_met: bool,
    pub votes_cast: u32,
}
