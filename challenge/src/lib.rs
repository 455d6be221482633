//! Challenges: any non-voter can contest a validator's ballot.
//!
//! A challenge is put to a panel of verifiers. Resolution produces *marks*
//! (reward or punishment tags) that settlement later turns into ledger
//! movements; resolving a challenge never moves funds itself.

pub mod challenge;
pub mod error;
pub mod marks;
pub mod state;

pub use challenge::{ChallengeEngine, ChallengeRequest};
pub use error::ChallengeError;
pub use marks::{Mark, MarkEffect, MarkReason};
pub use state::{Challenge, ChallengeBallot};
