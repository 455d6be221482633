//! The per-case aggregate: the case record plus everything it owns.

use serde::{Deserialize, Serialize};
use tribunal_challenge::Challenge;
use tribunal_settlement::SettlementSummary;
use tribunal_types::{Case, ChallengeId};
use tribunal_voting::VotingRound;

/// A case with its voting rounds, challenges and settlement.
///
/// Rounds and challenges are append-only; the settlement is written once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFile {
    pub case: Case,
    pub description: String,
    pub rounds: Vec<VotingRound>,
    pub challenges: Vec<Challenge>,
    pub settlement: Option<SettlementSummary>,
}

impl CaseFile {
    pub fn new(case: Case, description: String) -> Self {
        Self {
            case,
            description,
            rounds: Vec::new(),
            challenges: Vec::new(),
            settlement: None,
        }
    }

    /// The most recent voting round.
    pub fn round(&self) -> Option<&VotingRound> {
        self.rounds.last()
    }

    pub fn challenge(&self, id: ChallengeId) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == id)
    }
}
