use thiserror::Error;
use tribunal_types::{CaseStatus, ChallengeId, Classify, ErrorKind, ParticipantId, Timestamp};

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("case is {0:?}, challenges require the challenge phase")]
    NotChallenging(CaseStatus),

    #[error("challenge period ended at {deadline}")]
    ChallengePeriodOver { deadline: Timestamp },

    #[error("challenge deposit {deposit} below minimum {min}")]
    DepositTooLow { deposit: u128, min: u128 },

    #[error("{0} did not vote on this case")]
    TargetNotVoter(ParticipantId),

    #[error("{0} voted on this case and cannot challenge")]
    ChallengerVoted(ParticipantId),

    #[error("{0} is a party to this case and cannot challenge")]
    ChallengerIsParty(ParticipantId),

    #[error("{0} has already challenged this case")]
    AlreadyChallenged(ParticipantId),

    #[error("{0} has voted on a challenge of this case and cannot challenge")]
    ChallengerVotedOnChallenge(ParticipantId),

    #[error("a challenge needs at least one verifier")]
    NoVerifiers,

    #[error("{0} cannot verify this challenge")]
    InvalidVerifier(ParticipantId),

    #[error("{0} not found")]
    UnknownChallenge(ChallengeId),

    #[error("{0} is already resolved")]
    AlreadyResolved(ChallengeId),

    #[error("{0} is not a verifier of this challenge")]
    NotVerifier(ParticipantId),

    #[error("{0} voted on the case and cannot vote on its challenges")]
    VoterIsCaseVoter(ParticipantId),

    #[error("{0} challenged this case and cannot vote on its challenges")]
    VoterIsChallenger(ParticipantId),

    #[error("{0} has already cast a challenge vote on this case")]
    AlreadyVoted(ParticipantId),

    #[error("challenge voting deadline {deadline} has passed")]
    DeadlinePassed { deadline: Timestamp },

    #[error("no quorum and deadline {deadline} not reached")]
    DeadlineNotReached { deadline: Timestamp },

    #[error("{count} challenges cannot be resolved yet")]
    ChallengesPending { count: usize },
}

impl Classify for ChallengeError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotChallenging(_) => ErrorKind::StateConflict,
            Self::DepositTooLow { .. }
            | Self::TargetNotVoter(_)
            | Self::NoVerifiers
            | Self::InvalidVerifier(_) => ErrorKind::Validation,
            Self::ChallengerVoted(_)
            | Self::ChallengerIsParty(_)
            | Self::NotVerifier(_)
            | Self::VoterIsCaseVoter(_)
            | Self::VoterIsChallenger(_) => ErrorKind::Unauthorized,
            Self::AlreadyChallenged(_)
            | Self::ChallengerVotedOnChallenge(_)
            | Self::AlreadyResolved(_)
            | Self::AlreadyVoted(_) => ErrorKind::AlreadyActed,
            Self::UnknownChallenge(_) => ErrorKind::NotFound,
            Self::ChallengePeriodOver { .. }
            | Self::DeadlinePassed { .. }
            | Self::DeadlineNotReached { .. }
            | Self::ChallengesPending { .. } => ErrorKind::Deadline,
        }
    }
}
