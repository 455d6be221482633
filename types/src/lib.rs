//! Fundamental types for the case resolution engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identifiers, timestamps, case state enums, parameters, basis-point math and
//! the error taxonomy.

pub mod amount;
pub mod error;
pub mod id;
pub mod params;
pub mod state;
pub mod time;

pub use amount::{apply_bps, meets_quorum, quorum_count, share_bps, BPS_DENOMINATOR};
pub use error::{Classify, ErrorKind};
pub use id::{CaseId, ChallengeId, ParticipantId};
pub use params::{CaseParams, RewardPolicy, TieBreak, Weighting};
pub use state::{
    Case, CaseResult, CaseStatus, ChallengeClaim, ChallengeOutcome, Choice, RiskTier, Role,
};
pub use time::{Clock, SystemClock, Timestamp};
