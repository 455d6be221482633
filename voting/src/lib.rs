//! Validator voting on case complaints.
//!
//! A [`VotingRound`] holds the validators assigned to a case and the ballots
//! they cast. The [`VotingEngine`] sizes rounds, admits ballots, and decides
//! when a round closes and with which result.

pub mod error;
pub mod round;
pub mod voting;

pub use error::VotingError;
pub use round::{Ballot, RoundClose, VotingRound};
pub use voting::VotingEngine;
