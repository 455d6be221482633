//! Challenge records.

use crate::marks::Mark;
use serde::{Deserialize, Serialize};
use tribunal_types::{
    CaseId, ChallengeClaim, ChallengeId, ChallengeOutcome, Choice, ParticipantId, Timestamp,
};

/// A verifier's vote on a challenge. `Support` means the challenge is founded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeBallot {
    pub voter: ParticipantId,
    pub choice: Choice,
    pub weight: u128,
    /// Collateral frozen under the case id by this ballot.
    pub stake: u128,
    pub cast_at: Timestamp,
}

/// A challenge against one validator's ballot on a case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub case_id: CaseId,
    pub id: ChallengeId,
    pub challenger: ParticipantId,
    /// The validator whose ballot is contested.
    pub target: ParticipantId,
    pub claim: ChallengeClaim,
    /// Frozen under the case id for the lifetime of the case.
    pub deposit: u128,
    pub verifiers: Vec<ParticipantId>,
    pub ballots: Vec<ChallengeBallot>,
    pub support_weight: u128,
    pub reject_weight: u128,
    pub submitted_at: Timestamp,
    /// Verifier voting closes after this time.
    pub deadline: Timestamp,
    pub outcome: ChallengeOutcome,
    /// Set once marks have been produced.
    pub resolved: bool,
    pub marks: Vec<Mark>,
}

impl Challenge {
    pub fn is_verifier(&self, who: &ParticipantId) -> bool {
        self.verifiers.contains(who)
    }

    pub fn has_voted(&self, who: &ParticipantId) -> bool {
        self.ballots.iter().any(|b| &b.voter == who)
    }

    pub fn all_voted(&self) -> bool {
        !self.verifiers.is_empty() && self.ballots.len() == self.verifiers.len()
    }

    /// Whether resolution reverses the case result.
    pub fn overturns(&self) -> bool {
        self.outcome == ChallengeOutcome::Successful && self.claim == ChallengeClaim::Flip
    }
}
