//! Ledger errors.

use thiserror::Error;
use tribunal_types::{CaseId, Classify, ErrorKind, ParticipantId, Timestamp};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no ledger account for {0}")]
    UnknownAccount(ParticipantId),

    #[error("ledger account for {0} already exists")]
    AccountExists(ParticipantId),

    #[error("participant id must be non-empty")]
    InvalidParticipant,

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("insufficient unfrozen balance: need {needed}, available {available}")]
    InsufficientUnfrozenBalance { needed: u128, available: u128 },

    #[error("insufficient staked balance: need {needed}, staked {staked}")]
    InsufficientStake { needed: u128, staked: u128 },

    #[error("{case} holds {locked} for {participant}, cannot release {needed}")]
    InsufficientLock {
        case: CaseId,
        participant: ParticipantId,
        needed: u128,
        locked: u128,
    },

    #[error("funds are time-locked until {until}")]
    TimeLocked { until: Timestamp },

    #[error("insufficient reserve: need {needed}, available {available}")]
    InsufficientReserve { needed: u128, available: u128 },

    #[error("withdrawal of {amount} does not cover the fee of {fee}")]
    BelowFee { amount: u128, fee: u128 },

    #[error("cannot route {needed}, only {floating} slashed funds are in flight")]
    NothingToRoute { needed: u128, floating: u128 },

    #[error("arithmetic overflow in ledger computation")]
    Overflow,

    #[error("ledger invariant violated: {0}")]
    Invariant(String),
}

impl Classify for LedgerError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAccount(_) => ErrorKind::NotFound,
            Self::AccountExists(_)
            | Self::InvalidParticipant
            | Self::ZeroAmount
            | Self::InsufficientLock { .. }
            | Self::BelowFee { .. } => ErrorKind::Validation,
            Self::InsufficientUnfrozenBalance { .. }
            | Self::InsufficientStake { .. }
            | Self::InsufficientReserve { .. } => ErrorKind::InsufficientFunds,
            Self::TimeLocked { .. } => ErrorKind::Deadline,
            Self::NothingToRoute { .. } | Self::Overflow | Self::Invariant(_) => {
                ErrorKind::InvariantViolation
            }
        }
    }
}
