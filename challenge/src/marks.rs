//! Reward and punishment tags produced by challenge resolution.

use serde::{Deserialize, Serialize};
use tribunal_types::{ChallengeId, ParticipantId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkEffect {
    /// Entitled to a share of the case reward pool. `weight` is used by the
    /// weight-proportional reward policy.
    Reward { weight: u128 },
    /// Forfeits up to `amount` of the participant's case collateral.
    Punishment { amount: u128 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkReason {
    ChallengeSucceeded,
    ChallengeFailed,
    /// Voting ended without quorum; only part of the deposit is forfeited.
    ChallengeExpired,
    /// Verifier supported a challenge that succeeded.
    SupportedSuccessfulChallenge,
    /// Verifier rejected a challenge that failed.
    RejectedFailedChallenge,
    /// Verifier supported a challenge that failed.
    SupportedFailedChallenge,
    /// The challenged voter's ballot was found wrong.
    BallotOverturned,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub challenge: ChallengeId,
    pub participant: ParticipantId,
    pub effect: MarkEffect,
    pub reason: MarkReason,
}

impl Mark {
    pub fn is_reward(&self) -> bool {
        matches!(self.effect, MarkEffect::Reward { .. })
    }

    pub fn is_punishment(&self) -> bool {
        matches!(self.effect, MarkEffect::Punishment { .. })
    }
}
