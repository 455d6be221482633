//! Per-participant ledger row.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tribunal_types::{CaseId, ParticipantId, Role, Timestamp};

/// One participant's deposit accounting.
///
/// `balance` includes `frozen`; `staked` is held outside the balance.
/// Every frozen unit is attributed to exactly one case in `locks`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: ParticipantId,
    pub role: Role,
    pub balance: u128,
    pub frozen: u128,
    pub staked: u128,
    pub trust_score: u32,
    /// Withdrawals are refused before this time.
    pub unlock_at: Timestamp,
    /// Unstaking is refused before this time.
    pub stake_unlock_at: Timestamp,
    /// Collateral frozen per case.
    pub locks: BTreeMap<CaseId, u128>,
}

impl Account {
    pub fn new(id: ParticipantId, role: Role, trust_score: u32) -> Self {
        Self {
            id,
            role,
            balance: 0,
            frozen: 0,
            staked: 0,
            trust_score,
            unlock_at: Timestamp::EPOCH,
            stake_unlock_at: Timestamp::EPOCH,
            locks: BTreeMap::new(),
        }
    }

    /// Balance not committed to any case.
    pub fn unfrozen(&self) -> u128 {
        self.balance.saturating_sub(self.frozen)
    }

    /// Collateral this account holds for `case`.
    pub fn locked_for(&self, case: CaseId) -> u128 {
        self.locks.get(&case).copied().unwrap_or(0)
    }

    /// Everything the participant owns in the ledger.
    pub fn holdings(&self) -> Option<u128> {
        self.balance.checked_add(self.staked)
    }

    /// Verify the row invariants.
    pub fn check(&self) -> Result<(), LedgerError> {
        if self.frozen > self.balance {
            return Err(LedgerError::Invariant(format!(
                "{}: frozen {} exceeds balance {}",
                self.id, self.frozen, self.balance
            )));
        }
        let locked = self
            .locks
            .values()
            .try_fold(0u128, |acc, v| acc.checked_add(*v))
            .ok_or(LedgerError::Overflow)?;
        if locked != self.frozen {
            return Err(LedgerError::Invariant(format!(
                "{}: case locks total {} but frozen is {}",
                self.id, locked, self.frozen
            )));
        }
        if self.locks.values().any(|v| *v == 0) {
            return Err(LedgerError::Invariant(format!(
                "{}: zero-valued case lock",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(ParticipantId::new("v1"), Role::Validator, 10)
    }

    #[test]
    fn fresh_account_is_consistent() {
        let a = account();
        assert!(a.check().is_ok());
        assert_eq!(a.unfrozen(), 0);
    }

    #[test]
    fn frozen_above_balance_is_rejected() {
        let mut a = account();
        a.balance = 10;
        a.frozen = 11;
        a.locks.insert(CaseId::new(1), 11);
        assert!(matches!(a.check(), Err(LedgerError::Invariant(_))));
    }

    #[test]
    fn locks_must_match_frozen() {
        let mut a = account();
        a.balance = 100;
        a.frozen = 40;
        a.locks.insert(CaseId::new(1), 30);
        assert!(a.check().is_err());
        a.locks.insert(CaseId::new(2), 10);
        assert!(a.check().is_ok());
        assert_eq!(a.unfrozen(), 60);
        assert_eq!(a.locked_for(CaseId::new(2)), 10);
        assert_eq!(a.locked_for(CaseId::new(3)), 0);
    }
}
