//! Deposit ledger: the escrow for case resolution.
//!
//! Tracks, per participant:
//! - `balance` (including collateral frozen for open cases)
//! - `frozen`, attributed case by case
//! - `staked` funds that gate validator eligibility
//! - a trust score
//!
//! plus a reserve pool fed by withdrawal fees, settlement cuts and forfeits.
//! Every mutation is applied through a [`LedgerBatch`] so that multi-step
//! operations either apply completely or not at all.

pub mod account;
pub mod batch;
pub mod error;
pub mod ledger;

pub use account::Account;
pub use batch::LedgerBatch;
pub use error::LedgerError;
pub use ledger::{DepositLedger, LedgerChanges, LedgerConfig};
