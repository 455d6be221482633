//! Error taxonomy shared across crates.
//!
//! Every crate has its own `thiserror` enum; each of them classifies into an
//! [`ErrorKind`] so callers can react to a failure class without matching on
//! every variant.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input: zero amounts, empty ids, duplicate entries.
    Validation,
    /// A role or eligibility check failed.
    Unauthorized,
    /// The action is not valid in the current phase.
    StateConflict,
    /// Double vote, double challenge, double settle.
    AlreadyActed,
    InsufficientFunds,
    /// Too early or too late relative to a deadline.
    Deadline,
    /// A ledger or settlement invariant does not hold. Indicates a logic
    /// defect; the operation is aborted and nothing is committed.
    InvariantViolation,
    NotFound,
    Storage,
}

impl ErrorKind {
    /// Whether re-issuing the same call later can succeed without any other change.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Deadline)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::StateConflict => "state_conflict",
            Self::AlreadyActed => "already_acted",
            Self::InsufficientFunds => "insufficient_funds",
            Self::Deadline => "deadline",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        };
        f.write_str(s)
    }
}

/// Implemented by every error type in the workspace.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
