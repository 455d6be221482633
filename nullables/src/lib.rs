//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator of the case service (clock, access control, risk
//! assessment, validator selection, storage, observers) has a test-friendly
//! implementation here that:
//! - Returns deterministic values
//! - Can be controlled programmatically
//! - Never touches the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod access;
pub mod clock;
pub mod observer;
pub mod random;
pub mod risk;
pub mod store;

pub use access::NullAccessControl;
pub use clock::NullClock;
pub use observer::RecordingObserver;
pub use random::NullSelector;
pub use risk::NullRiskAssessment;
pub use store::NullStore;
