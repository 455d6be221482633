use thiserror::Error;
use tribunal_ledger::LedgerError;
use tribunal_types::{CaseId, CaseStatus, Classify, ErrorKind};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("{0} is already settled")]
    AlreadySettled(CaseId),

    #[error("case is {0:?}, settlement requires Settling")]
    NotSettling(CaseStatus),

    #[error("{0} has no determined result")]
    Undetermined(CaseId),

    #[error("conservation violated: pool {total_pool} != rewards {rewards} + reserve cut {reserve_cut} + retained {retained}")]
    Conservation {
        total_pool: u128,
        rewards: u128,
        reserve_cut: u128,
        retained: u128,
    },

    #[error("arithmetic overflow in settlement")]
    Overflow,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl Classify for SettlementError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadySettled(_) => ErrorKind::AlreadyActed,
            Self::NotSettling(_) | Self::Undetermined(_) => ErrorKind::StateConflict,
            Self::Conservation { .. } | Self::Overflow => ErrorKind::InvariantViolation,
            Self::Ledger(e) => e.kind(),
        }
    }
}
