//! The deposit ledger: balances, case collateral, stakes and the reserve.

use crate::account::Account;
use crate::batch::LedgerBatch;
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tribunal_types::{CaseId, CaseParams, ParticipantId, Role, Timestamp};

/// Ledger-level settings, taken from [`CaseParams`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub withdrawal_fee_bps: u32,
    pub deposit_lock_secs: u64,
    pub stake_lock_secs: u64,
}

impl From<&CaseParams> for LedgerConfig {
    fn from(params: &CaseParams) -> Self {
        Self {
            withdrawal_fee_bps: params.withdrawal_fee_bps,
            deposit_lock_secs: params.deposit_lock_secs,
            stake_lock_secs: params.stake_lock_secs,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::from(&CaseParams::default())
    }
}

/// Rows changed since the last [`DepositLedger::take_changes`].
#[derive(Clone, Debug, Default)]
pub struct LedgerChanges {
    pub accounts: Vec<Account>,
    pub reserve: Option<u128>,
}

impl LedgerChanges {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.reserve.is_none()
    }
}

/// Key-addressed store of participant rows plus the reserve pool.
///
/// The ledger owns every row exclusively. All mutations go through a
/// [`LedgerBatch`]; the single-operation methods below open a batch, apply
/// one operation and commit, so each is atomic on its own.
pub struct DepositLedger {
    pub(crate) accounts: HashMap<ParticipantId, Account>,
    pub(crate) reserve: u128,
    pub(crate) config: LedgerConfig,
    pub(crate) dirty: BTreeSet<ParticipantId>,
    pub(crate) reserve_dirty: bool,
}

impl DepositLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            accounts: HashMap::new(),
            reserve: 0,
            config,
            dirty: BTreeSet::new(),
            reserve_dirty: false,
        }
    }

    /// Rebuild a ledger from persisted rows.
    pub fn from_parts(
        config: LedgerConfig,
        accounts: impl IntoIterator<Item = Account>,
        reserve: u128,
    ) -> Result<Self, LedgerError> {
        let mut map = HashMap::new();
        for row in accounts {
            row.check()?;
            if map.insert(row.id.clone(), row).is_some() {
                return Err(LedgerError::Invariant("duplicate account row".into()));
            }
        }
        Ok(Self {
            accounts: map,
            reserve,
            config,
            dirty: BTreeSet::new(),
            reserve_dirty: false,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Begin an atomic batch of mutations.
    pub fn batch(&mut self) -> LedgerBatch<'_> {
        LedgerBatch::new(self)
    }

    /// Run `f` inside a batch and commit only if it succeeds.
    pub fn atomic<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut LedgerBatch<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let mut batch = self.batch();
        let out = f(&mut batch)?;
        batch.commit()?;
        Ok(out)
    }

    // ── Accounts ────────────────────────────────────────────────────────

    /// Register a ledger row for a participant.
    pub fn open_account(
        &mut self,
        id: ParticipantId,
        role: Role,
        trust_score: u32,
    ) -> Result<(), LedgerError> {
        if !id.is_valid() {
            return Err(LedgerError::InvalidParticipant);
        }
        if self.accounts.contains_key(&id) {
            return Err(LedgerError::AccountExists(id));
        }
        tracing::debug!(participant = %id, %role, "ledger account opened");
        self.dirty.insert(id.clone());
        self.accounts.insert(id.clone(), Account::new(id, role, trust_score));
        Ok(())
    }

    pub fn account(&self, id: &ParticipantId) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn has_account(&self, id: &ParticipantId) -> bool {
        self.accounts.contains_key(id)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn unfrozen(&self, id: &ParticipantId) -> Result<u128, LedgerError> {
        self.accounts
            .get(id)
            .map(Account::unfrozen)
            .ok_or_else(|| LedgerError::UnknownAccount(id.clone()))
    }

    /// Collateral `id` holds for `case`.
    pub fn lock(&self, case: CaseId, id: &ParticipantId) -> u128 {
        self.accounts.get(id).map(|a| a.locked_for(case)).unwrap_or(0)
    }

    /// Every participant holding collateral for `case`, ordered by id.
    pub fn locks_for_case(&self, case: CaseId) -> Vec<(ParticipantId, u128)> {
        let mut out: Vec<_> = self
            .accounts
            .values()
            .filter_map(|a| a.locks.get(&case).map(|v| (a.id.clone(), *v)))
            .collect();
        out.sort();
        out
    }

    pub fn reserve(&self) -> u128 {
        self.reserve
    }

    /// Sum of every balance, stake and the reserve.
    pub fn total_supply(&self) -> u128 {
        self.accounts
            .values()
            .filter_map(Account::holdings)
            .fold(self.reserve, u128::saturating_add)
    }

    // ── Single-operation mutations ──────────────────────────────────────

    pub fn deposit(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.atomic(|b| b.deposit(id, amount, now))?;
        tracing::debug!(participant = %id, amount, "deposit");
        Ok(())
    }

    pub fn freeze(
        &mut self,
        case: CaseId,
        id: &ParticipantId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.atomic(|b| b.freeze(case, id, amount))?;
        tracing::debug!(%case, participant = %id, amount, "collateral frozen");
        Ok(())
    }

    pub fn unfreeze(
        &mut self,
        case: CaseId,
        id: &ParticipantId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.atomic(|b| b.unfreeze(case, id, amount))?;
        tracing::debug!(%case, participant = %id, amount, "collateral released");
        Ok(())
    }

    /// Slash up to `amount`; the removed funds go to the reserve.
    /// Returns the amount actually removed.
    pub fn slash(
        &mut self,
        case: CaseId,
        id: &ParticipantId,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        let slashed = self.atomic(|b| {
            let slashed = b.slash(case, id, amount)?;
            b.retain(slashed)?;
            Ok::<_, LedgerError>(slashed)
        })?;
        tracing::info!(%case, participant = %id, requested = amount, slashed, "slashed");
        Ok(slashed)
    }

    pub fn credit_reward(&mut self, id: &ParticipantId, amount: u128) -> Result<(), LedgerError> {
        self.atomic(|b| b.credit_reward(id, amount))
    }

    /// Withdraw unfrozen funds; returns the net amount after the fee.
    pub fn withdraw(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        let net = self.atomic(|b| b.withdraw(id, amount, now))?;
        tracing::debug!(participant = %id, amount, net, "withdrawal");
        Ok(net)
    }

    pub fn fund_reserve(&mut self, amount: u128) -> Result<(), LedgerError> {
        self.atomic(|b| b.fund_reserve(amount))
    }

    pub fn pay_from_reserve(&mut self, id: &ParticipantId, amount: u128) -> Result<(), LedgerError> {
        self.atomic(|b| b.pay_from_reserve(id, amount))
    }

    pub fn stake(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.atomic(|b| b.stake(id, amount, now))
    }

    pub fn unstake(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.atomic(|b| b.unstake(id, amount, now))
    }

    /// Raise or lower a trust score, saturating at zero.
    pub fn adjust_trust(&mut self, id: &ParticipantId, delta: i32) -> Result<u32, LedgerError> {
        self.atomic(|b| b.adjust_trust(id, delta))
    }

    // ── Invariants and change tracking ──────────────────────────────────

    /// Check every row invariant. A failure indicates a logic defect.
    pub fn check_invariants(&self) -> Result<(), LedgerError> {
        for row in self.accounts.values() {
            row.check()?;
        }
        Ok(())
    }

    /// Drain the set of rows changed since the last call.
    pub fn take_changes(&mut self) -> LedgerChanges {
        let ids = std::mem::take(&mut self.dirty);
        let accounts = ids
            .iter()
            .filter_map(|id| self.accounts.get(id).cloned())
            .collect();
        let reserve = std::mem::take(&mut self.reserve_dirty).then_some(self.reserve);
        LedgerChanges { accounts, reserve }
    }
}

impl Default for DepositLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    fn config() -> LedgerConfig {
        LedgerConfig {
            withdrawal_fee_bps: 100, // 1%
            deposit_lock_secs: 10,
            stake_lock_secs: 50,
        }
    }

    fn funded(id: &str, amount: u128) -> DepositLedger {
        let mut ledger = DepositLedger::new(config());
        ledger.open_account(pid(id), Role::Complainant, 5).unwrap();
        ledger.deposit(&pid(id), amount, Timestamp::new(0)).unwrap();
        ledger
    }

    const CASE: CaseId = CaseId::new(1);

    #[test]
    fn open_account_rejects_empty_and_duplicate_ids() {
        let mut ledger = DepositLedger::default();
        assert!(matches!(
            ledger.open_account(pid(""), Role::Validator, 0),
            Err(LedgerError::InvalidParticipant)
        ));
        ledger.open_account(pid("a"), Role::Validator, 0).unwrap();
        assert!(matches!(
            ledger.open_account(pid("a"), Role::Validator, 0),
            Err(LedgerError::AccountExists(_))
        ));
    }

    #[test]
    fn deposit_rejects_zero_and_unknown() {
        let mut ledger = funded("a", 100);
        assert!(matches!(
            ledger.deposit(&pid("a"), 0, Timestamp::new(0)),
            Err(LedgerError::ZeroAmount)
        ));
        assert!(matches!(
            ledger.deposit(&pid("ghost"), 5, Timestamp::new(0)),
            Err(LedgerError::UnknownAccount(_))
        ));
    }

    #[test]
    fn freeze_requires_unfrozen_balance() {
        let mut ledger = funded("a", 100);
        ledger.freeze(CASE, &pid("a"), 60).unwrap();
        let err = ledger.freeze(CaseId::new(2), &pid("a"), 41).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientUnfrozenBalance {
                needed: 41,
                available: 40
            }
        ));
        let row = ledger.account(&pid("a")).unwrap();
        assert_eq!(row.frozen, 60);
        assert_eq!(row.locked_for(CASE), 60);
    }

    #[test]
    fn unfreeze_cannot_exceed_case_lock() {
        let mut ledger = funded("a", 100);
        ledger.freeze(CASE, &pid("a"), 30).unwrap();
        ledger.freeze(CaseId::new(2), &pid("a"), 30).unwrap();
        assert!(matches!(
            ledger.unfreeze(CASE, &pid("a"), 31),
            Err(LedgerError::InsufficientLock { locked: 30, .. })
        ));
        ledger.unfreeze(CASE, &pid("a"), 30).unwrap();
        let row = ledger.account(&pid("a")).unwrap();
        assert_eq!(row.frozen, 30);
        assert!(!row.locks.contains_key(&CASE));
    }

    #[test]
    fn slash_caps_at_reachable_balance_and_reduces_frozen() {
        let mut ledger = funded("a", 100);
        ledger.freeze(CASE, &pid("a"), 40).unwrap();
        let slashed = ledger.slash(CASE, &pid("a"), 1_000).unwrap();
        assert_eq!(slashed, 100);
        let row = ledger.account(&pid("a")).unwrap();
        assert_eq!(row.balance, 0);
        assert_eq!(row.frozen, 0);
        assert_eq!(ledger.reserve(), 100);
    }

    #[test]
    fn slash_never_touches_other_case_collateral() {
        let mut ledger = funded("a", 100);
        ledger.freeze(CASE, &pid("a"), 20).unwrap();
        ledger.freeze(CaseId::new(2), &pid("a"), 50).unwrap();
        let slashed = ledger.slash(CASE, &pid("a"), 1_000).unwrap();
        // 20 from this case's lock + 30 unfrozen.
        assert_eq!(slashed, 50);
        let row = ledger.account(&pid("a")).unwrap();
        assert_eq!(row.balance, 50);
        assert_eq!(row.frozen, 50);
        assert_eq!(row.locked_for(CaseId::new(2)), 50);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn withdraw_blocked_by_time_lock() {
        let mut ledger = funded("a", 100);
        assert!(matches!(
            ledger.withdraw(&pid("a"), 10, Timestamp::new(9)),
            Err(LedgerError::TimeLocked { .. })
        ));
        assert_eq!(ledger.withdraw(&pid("a"), 10, Timestamp::new(10)).unwrap(), 10);
    }

    #[test]
    fn withdraw_blocked_by_frozen_funds_and_charges_fee() {
        let mut ledger = funded("a", 1_000);
        ledger.freeze(CASE, &pid("a"), 600).unwrap();
        let now = Timestamp::new(100);
        assert!(matches!(
            ledger.withdraw(&pid("a"), 401, now),
            Err(LedgerError::InsufficientUnfrozenBalance { .. })
        ));
        let net = ledger.withdraw(&pid("a"), 400, now).unwrap();
        assert_eq!(net, 396); // 1% fee
        assert_eq!(ledger.reserve(), 4);
        assert_eq!(ledger.account(&pid("a")).unwrap().balance, 600);
    }

    #[test]
    fn withdraw_below_fee_rejected() {
        let mut ledger = DepositLedger::new(LedgerConfig {
            withdrawal_fee_bps: 10_000,
            ..config()
        });
        ledger.open_account(pid("a"), Role::Validator, 0).unwrap();
        ledger.deposit(&pid("a"), 50, Timestamp::new(0)).unwrap();
        assert!(matches!(
            ledger.withdraw(&pid("a"), 50, Timestamp::new(100)),
            Err(LedgerError::BelowFee { .. })
        ));
    }

    #[test]
    fn reserve_funding_and_payout() {
        let mut ledger = funded("a", 10);
        ledger.fund_reserve(100).unwrap();
        ledger.pay_from_reserve(&pid("a"), 40).unwrap();
        assert_eq!(ledger.reserve(), 60);
        assert_eq!(ledger.account(&pid("a")).unwrap().balance, 50);
        assert!(matches!(
            ledger.pay_from_reserve(&pid("a"), 61),
            Err(LedgerError::InsufficientReserve { .. })
        ));
    }

    #[test]
    fn stake_and_time_locked_unstake() {
        let mut ledger = funded("a", 100);
        ledger.stake(&pid("a"), 70, Timestamp::new(0)).unwrap();
        let row = ledger.account(&pid("a")).unwrap();
        assert_eq!((row.balance, row.staked), (30, 70));
        assert!(matches!(
            ledger.unstake(&pid("a"), 10, Timestamp::new(49)),
            Err(LedgerError::TimeLocked { .. })
        ));
        ledger.unstake(&pid("a"), 70, Timestamp::new(50)).unwrap();
        assert_eq!(ledger.account(&pid("a")).unwrap().balance, 100);
    }

    #[test]
    fn dropped_batch_leaves_no_trace() {
        let mut ledger = funded("a", 100);
        ledger.take_changes();
        let supply = ledger.total_supply();
        {
            let mut batch = ledger.batch();
            batch.freeze(CASE, &pid("a"), 50).unwrap();
            let s = batch.slash(CASE, &pid("a"), 50).unwrap();
            batch.retain(s).unwrap();
            // dropped without commit
        }
        let row = ledger.account(&pid("a")).unwrap();
        assert_eq!((row.balance, row.frozen), (100, 0));
        assert_eq!(ledger.total_supply(), supply);
        assert!(ledger.take_changes().is_empty());
    }

    #[test]
    fn failed_atomic_closure_rolls_back_earlier_steps() {
        let mut ledger = funded("a", 100);
        let result: Result<(), LedgerError> = ledger.atomic(|b| {
            b.freeze(CASE, &pid("a"), 60)?;
            b.freeze(CASE, &pid("a"), 60)?; // fails
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(ledger.account(&pid("a")).unwrap().frozen, 0);
    }

    #[test]
    fn commit_refuses_unrouted_slash() {
        let mut ledger = funded("a", 100);
        let mut batch = ledger.batch();
        batch.slash(CASE, &pid("a"), 10).unwrap();
        assert!(matches!(batch.commit(), Err(LedgerError::Invariant(_))));
        assert_eq!(ledger.account(&pid("a")).unwrap().balance, 100);
    }

    #[test]
    fn take_changes_reports_touched_rows_once() {
        let mut ledger = funded("a", 100);
        ledger.open_account(pid("b"), Role::Validator, 0).unwrap();
        let changes = ledger.take_changes();
        assert_eq!(changes.accounts.len(), 2);
        assert_eq!(changes.reserve, None);
        ledger.slash(CASE, &pid("a"), 5).unwrap();
        let changes = ledger.take_changes();
        assert_eq!(changes.accounts.len(), 1);
        assert_eq!(changes.reserve, Some(5));
        assert!(ledger.take_changes().is_empty());
    }

    #[test]
    fn trust_adjustment_saturates_at_zero() {
        let mut ledger = funded("a", 1);
        assert_eq!(ledger.adjust_trust(&pid("a"), -100).unwrap(), 0);
        assert_eq!(ledger.adjust_trust(&pid("a"), 3).unwrap(), 3);
    }

    #[test]
    fn locks_for_case_lists_holders_in_order() {
        let mut ledger = funded("b", 100);
        ledger.open_account(pid("a"), Role::Validator, 0).unwrap();
        ledger.deposit(&pid("a"), 50, Timestamp::new(0)).unwrap();
        ledger.freeze(CASE, &pid("b"), 10).unwrap();
        ledger.freeze(CASE, &pid("a"), 20).unwrap();
        ledger.freeze(CaseId::new(9), &pid("a"), 5).unwrap();
        assert_eq!(
            ledger.locks_for_case(CASE),
            vec![(pid("a"), 20), (pid("b"), 10)]
        );
        assert_eq!(ledger.lock(CASE, &pid("a")), 20);
        assert_eq!(ledger.lock(CASE, &pid("zzz")), 0);
    }
}
