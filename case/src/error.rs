use thiserror::Error;
use tribunal_challenge::ChallengeError;
use tribunal_ledger::LedgerError;
use tribunal_settlement::SettlementError;
use tribunal_store::StoreError;
use tribunal_types::{CaseId, CaseStatus, Classify, ErrorKind, ParticipantId};
use tribunal_voting::VotingError;

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("{0} not found")]
    UnknownCase(CaseId),

    #[error("participant ids must be non-empty")]
    InvalidParticipant,

    #[error("complainant and respondent must differ")]
    SameParty,

    #[error("{who} is not permitted to {action}")]
    Unauthorized {
        who: ParticipantId,
        action: &'static str,
    },

    #[error("{who} holds {available} unfrozen, needs {needed}")]
    InsufficientDeposit {
        who: ParticipantId,
        needed: u128,
        available: u128,
    },

    #[error("cannot {action} {case} while it is {status:?}")]
    InvalidState {
        case: CaseId,
        status: CaseStatus,
        action: &'static str,
    },

    #[error("{0} has no open voting round")]
    NoVotingRound(CaseId),

    #[error("{0} is not awaiting review")]
    NotUnderReview(CaseId),

    #[error("{case} has been reopened {max} times already")]
    ReopenLimit { case: CaseId, max: u32 },

    #[error("{who} cannot validate this case: {reason}")]
    IneligibleValidator {
        who: ParticipantId,
        reason: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("case engine lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Voting(#[from] VotingError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for CaseError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCase(_) => ErrorKind::NotFound,
            Self::InvalidParticipant
            | Self::SameParty
            | Self::IneligibleValidator { .. }
            | Self::Config(_) => ErrorKind::Validation,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InsufficientDeposit { .. } => ErrorKind::InsufficientFunds,
            Self::InvalidState { .. }
            | Self::NoVotingRound(_)
            | Self::NotUnderReview(_)
            | Self::ReopenLimit { .. } => ErrorKind::StateConflict,
            Self::LockPoisoned => ErrorKind::InvariantViolation,
            Self::Ledger(e) => e.kind(),
            Self::Voting(e) => e.kind(),
            Self::Challenge(e) => e.kind(),
            Self::Settlement(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}
