//! Read-only projections returned to callers.

use crate::file::CaseFile;
use serde::{Deserialize, Serialize};
use tribunal_challenge::Challenge;
use tribunal_ledger::Account;
use tribunal_settlement::SettlementSummary;
use tribunal_types::{
    Case, ChallengeClaim, ChallengeId, ChallengeOutcome, ParticipantId, Timestamp,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeView {
    pub id: ChallengeId,
    pub challenger: ParticipantId,
    pub target: ParticipantId,
    pub claim: ChallengeClaim,
    pub deposit: u128,
    pub verifiers: Vec<ParticipantId>,
    pub votes_cast: u32,
    pub deadline: Timestamp,
    pub outcome: ChallengeOutcome,
    pub resolved: bool,
}

impl From<&Challenge> for ChallengeView {
    fn from(c: &Challenge) -> Self {
        Self {
            id: c.id,
            challenger: c.challenger.clone(),
            target: c.target.clone(),
            claim: c.claim,
            deposit: c.deposit,
            verifiers: c.verifiers.clone(),
            votes_cast: c.ballots.len() as u32,
            deadline: c.deadline,
            outcome: c.outcome,
            resolved: c.resolved,
        }
    }
}

/// Snapshot of a case for external readers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseView {
    pub case: Case,
    pub description: String,
    /// Index of the current voting round, if voting has opened.
    pub round: Option<u32>,
    pub assigned: Vec<ParticipantId>,
    pub voters: Vec<ParticipantId>,
    pub support_weight: u128,
    pub reject_weight: u128,
    pub challenges: Vec<ChallengeView>,
    pub settlement: Option<SettlementSummary>,
}

impl From<&CaseFile> for CaseView {
    fn from(file: &CaseFile) -> Self {
        let round = file.round();
        Self {
            case: file.case.clone(),
            description: file.description.clone(),
            round: round.map(|r| r.index),
            assigned: round.map(|r| r.assigned.clone()).unwrap_or_default(),
            voters: round.map(|r| r.voters().cloned().collect()).unwrap_or_default(),
            support_weight: round.map(|r| r.support_weight).unwrap_or(0),
            reject_weight: round.map(|r| r.reject_weight).unwrap_or(0),
            challenges: file.challenges.iter().map(ChallengeView::from).collect(),
            settlement: file.settlement.clone(),
        }
    }
}

/// A participant's ledger row plus derived figures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub account: Account,
    pub unfrozen: u128,
}

impl From<&Account> for ParticipantView {
    fn from(account: &Account) -> Self {
        Self {
            unfrozen: account.unfrozen(),
            account: account.clone(),
        }
    }
}
