use thiserror::Error;
use tribunal_types::{Classify, ErrorKind, ParticipantId, Timestamp};

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("not enough validators: have {have}, need {need}")]
    NotEnoughValidators { have: u32, need: u32 },

    #[error("validator {0} is assigned twice")]
    DuplicateValidator(ParticipantId),

    #[error("validator id must be non-empty")]
    InvalidValidator,

    #[error("{0} is not assigned to this round")]
    NotAssigned(ParticipantId),

    #[error("{0} has already voted")]
    AlreadyVoted(ParticipantId),

    #[error("voting round is closed")]
    RoundClosed,

    #[error("voting deadline {deadline} has passed")]
    DeadlinePassed { deadline: Timestamp },

    #[error("no quorum and voting deadline {deadline} not reached")]
    DeadlineNotReached { deadline: Timestamp },
}

impl Classify for VotingError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotEnoughValidators { .. }
            | Self::DuplicateValidator(_)
            | Self::InvalidValidator => ErrorKind::Validation,
            Self::NotAssigned(_) => ErrorKind::Unauthorized,
            Self::AlreadyVoted(_) => ErrorKind::AlreadyActed,
            Self::RoundClosed => ErrorKind::StateConflict,
            Self::DeadlinePassed { .. } | Self::DeadlineNotReached { .. } => ErrorKind::Deadline,
        }
    }
}
