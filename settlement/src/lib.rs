//! Settlement: turns a decided case into ledger movements.
//!
//! The losing principal is slashed, failed challengers forfeit their
//! deposits, and the resulting pool is split between reward-tagged
//! participants and the reserve. Everything happens in one ledger batch:
//! either the whole settlement commits or nothing does.

pub mod error;
pub mod record;
pub mod rewards;
pub mod settlement;

pub use error::SettlementError;
pub use record::{SettlementEffect, SettlementReason, SettlementRecord, SettlementSummary};
pub use rewards::split_rewards;
pub use settlement::SettlementEngine;
