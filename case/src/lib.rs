//! Case resolution: the state machine that drives a complaint from filing
//! through deposit locking, validator voting, challenges and settlement.
//!
//! [`CaseEngine`] is the single-writer state machine: every operation takes
//! an explicit `now` and either applies completely or not at all.
//! [`CaseService`] wraps it in a mutex, calls the external collaborators
//! (risk assessment, validator selection) outside the lock, persists touched
//! rows and notifies observers.

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod file;
mod guards;
pub mod persist;
pub mod service;
pub mod view;

pub use collaborators::{selection_seed, AccessControl, HashSelector, RandomSelector, RiskAssessment};
pub use config::EngineConfig;
pub use engine::{CaseEngine, Complaint, Selection};
pub use error::CaseError;
pub use events::{CancelReason, CaseEvent, CaseObserver, JsonLinesObserver};
pub use file::CaseFile;
pub use service::{CaseService, Collaborators};
pub use view::{CaseView, ChallengeView, ParticipantView};
