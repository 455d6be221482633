//! Ledger batches: groups multiple ledger mutations into one atomic unit.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = ledger.batch();
//! let slashed = batch.slash(case, &loser, stake)?;
//! batch.distribute(&winner, slashed)?;
//! batch.commit()?;
//! ```
//!
//! A batch stages copies of every row it touches. If the batch is dropped
//! without calling [`LedgerBatch::commit`], every staged change is discarded
//! and the ledger is exactly as it was before the batch began.
//!
//! Slashed funds are "in flight" until they are routed to a participant
//! ([`LedgerBatch::distribute`]) or to the reserve ([`LedgerBatch::retain`]).
//! A commit with funds still in flight is refused.

use crate::account::Account;
use crate::error::LedgerError;
use crate::ledger::DepositLedger;
use std::collections::BTreeMap;
use tribunal_types::{apply_bps, CaseId, ParticipantId, Timestamp};

pub struct LedgerBatch<'a> {
    ledger: &'a mut DepositLedger,
    staged: BTreeMap<ParticipantId, Account>,
    reserve: u128,
    /// Slashed and not yet routed.
    floating: u128,
    /// Funds entering the ledger from outside (deposits, reserve funding).
    inflow: u128,
    /// Funds leaving the ledger (withdrawals net of fee).
    outflow: u128,
}

impl<'a> LedgerBatch<'a> {
    pub(crate) fn new(ledger: &'a mut DepositLedger) -> Self {
        let reserve = ledger.reserve;
        Self {
            ledger,
            staged: BTreeMap::new(),
            reserve,
            floating: 0,
            inflow: 0,
            outflow: 0,
        }
    }

    // ── Row access ──────────────────────────────────────────────────────

    /// Read a row as this batch currently sees it.
    pub fn account(&self, id: &ParticipantId) -> Result<&Account, LedgerError> {
        self.staged
            .get(id)
            .or_else(|| self.ledger.accounts.get(id))
            .ok_or_else(|| LedgerError::UnknownAccount(id.clone()))
    }

    fn account_mut(&mut self, id: &ParticipantId) -> Result<&mut Account, LedgerError> {
        if !self.staged.contains_key(id) {
            let row = self
                .ledger
                .accounts
                .get(id)
                .cloned()
                .ok_or_else(|| LedgerError::UnknownAccount(id.clone()))?;
            self.staged.insert(id.clone(), row);
        }
        self.staged
            .get_mut(id)
            .ok_or_else(|| LedgerError::UnknownAccount(id.clone()))
    }

    pub fn reserve(&self) -> u128 {
        self.reserve
    }

    pub fn floating(&self) -> u128 {
        self.floating
    }

    /// Participants holding collateral for `case`, with the amount held.
    pub fn locked_for_case(&self, case: CaseId) -> Vec<(ParticipantId, u128)> {
        let mut out: BTreeMap<ParticipantId, u128> = self
            .ledger
            .accounts
            .values()
            .filter(|a| !self.staged.contains_key(&a.id))
            .filter_map(|a| a.locks.get(&case).map(|v| (a.id.clone(), *v)))
            .collect();
        for row in self.staged.values() {
            if let Some(v) = row.locks.get(&case) {
                out.insert(row.id.clone(), *v);
            }
        }
        out.into_iter().collect()
    }

    // ── Deposits and withdrawals ────────────────────────────────────────

    /// Credit `amount` to the participant's balance and extend the deposit time-lock.
    pub fn deposit(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let lock_secs = self.ledger.config.deposit_lock_secs;
        let row = self.account_mut(id)?;
        row.balance = row.balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        let until = now.plus(lock_secs);
        if until > row.unlock_at {
            row.unlock_at = until;
        }
        self.inflow = self.inflow.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Withdraw unfrozen funds. Returns the amount paid out after the fee;
    /// the fee goes to the reserve.
    pub fn withdraw(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let fee = apply_bps(amount, self.ledger.config.withdrawal_fee_bps);
        let row = self.account_mut(id)?;
        if now < row.unlock_at {
            return Err(LedgerError::TimeLocked {
                until: row.unlock_at,
            });
        }
        let available = row.unfrozen();
        if amount > available {
            return Err(LedgerError::InsufficientUnfrozenBalance {
                needed: amount,
                available,
            });
        }
        if fee >= amount {
            return Err(LedgerError::BelowFee { amount, fee });
        }
        row.balance -= amount;
        let net = amount - fee;
        self.reserve = self.reserve.checked_add(fee).ok_or(LedgerError::Overflow)?;
        self.outflow = self.outflow.checked_add(net).ok_or(LedgerError::Overflow)?;
        Ok(net)
    }

    // ── Case collateral ─────────────────────────────────────────────────

    /// Freeze `amount` of unfrozen balance as collateral for `case`.
    pub fn freeze(
        &mut self,
        case: CaseId,
        id: &ParticipantId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let row = self.account_mut(id)?;
        let available = row.unfrozen();
        if amount > available {
            return Err(LedgerError::InsufficientUnfrozenBalance {
                needed: amount,
                available,
            });
        }
        row.frozen += amount;
        *row.locks.entry(case).or_insert(0) += amount;
        Ok(())
    }

    /// Release `amount` of the collateral held for `case`.
    pub fn unfreeze(
        &mut self,
        case: CaseId,
        id: &ParticipantId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let row = self.account_mut(id)?;
        let locked = row.locked_for(case);
        if amount > locked {
            return Err(LedgerError::InsufficientLock {
                case,
                participant: id.clone(),
                needed: amount,
                locked,
            });
        }
        take_lock(row, case, amount);
        Ok(())
    }

    /// Release everything the participant holds for `case`. Returns the amount released.
    pub fn release(&mut self, case: CaseId, id: &ParticipantId) -> Result<u128, LedgerError> {
        let locked = self.account(id)?.locked_for(case);
        if locked > 0 {
            self.unfreeze(case, id, locked)?;
        }
        Ok(locked)
    }

    /// Forcibly remove up to `amount` from the participant.
    ///
    /// The case's own collateral is consumed first, then unfrozen balance.
    /// Collateral frozen for other cases is never touched, so the result may
    /// be less than `amount`. The removed funds are in flight until routed.
    pub fn slash(
        &mut self,
        case: CaseId,
        id: &ParticipantId,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        let row = self.account_mut(id)?;
        let locked = row.locked_for(case);
        let reachable = locked.saturating_add(row.unfrozen()).min(row.balance);
        let slashed = amount.min(reachable);
        if slashed == 0 {
            return Ok(0);
        }
        let from_lock = slashed.min(locked);
        if from_lock > 0 {
            take_lock(row, case, from_lock);
        }
        row.balance -= slashed;
        self.floating = self.floating.checked_add(slashed).ok_or(LedgerError::Overflow)?;
        Ok(slashed)
    }

    // ── Routing slashed funds ───────────────────────────────────────────

    /// Pay in-flight slashed funds to a participant.
    pub fn distribute(&mut self, id: &ParticipantId, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        self.take_floating(amount)?;
        let row = self.account_mut(id)?;
        row.balance = row.balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Send in-flight slashed funds to the reserve.
    pub fn retain(&mut self, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        self.take_floating(amount)?;
        self.reserve = self.reserve.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    fn take_floating(&mut self, amount: u128) -> Result<(), LedgerError> {
        if amount > self.floating {
            return Err(LedgerError::NothingToRoute {
                needed: amount,
                floating: self.floating,
            });
        }
        self.floating -= amount;
        Ok(())
    }

    // ── Rewards and reserve ─────────────────────────────────────────────

    /// Credit a reward funded from outside the ledger.
    pub fn credit_reward(&mut self, id: &ParticipantId, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let row = self.account_mut(id)?;
        row.balance = row.balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.inflow = self.inflow.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Add outside funds to the reserve.
    pub fn fund_reserve(&mut self, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.reserve = self.reserve.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.inflow = self.inflow.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Pay a participant out of the reserve.
    pub fn pay_from_reserve(&mut self, id: &ParticipantId, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > self.reserve {
            return Err(LedgerError::InsufficientReserve {
                needed: amount,
                available: self.reserve,
            });
        }
        let row = self.account_mut(id)?;
        row.balance = row.balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.reserve -= amount;
        Ok(())
    }

    // ── Staking ─────────────────────────────────────────────────────────

    /// Move unfrozen balance into the stake and restart the stake time-lock.
    pub fn stake(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let lock_secs = self.ledger.config.stake_lock_secs;
        let row = self.account_mut(id)?;
        let available = row.unfrozen();
        if amount > available {
            return Err(LedgerError::InsufficientUnfrozenBalance {
                needed: amount,
                available,
            });
        }
        row.balance -= amount;
        row.staked = row.staked.checked_add(amount).ok_or(LedgerError::Overflow)?;
        row.stake_unlock_at = now.plus(lock_secs);
        Ok(())
    }

    /// Move staked funds back into the balance once the stake time-lock expired.
    pub fn unstake(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let row = self.account_mut(id)?;
        if now < row.stake_unlock_at {
            return Err(LedgerError::TimeLocked {
                until: row.stake_unlock_at,
            });
        }
        if amount > row.staked {
            return Err(LedgerError::InsufficientStake {
                needed: amount,
                staked: row.staked,
            });
        }
        row.staked -= amount;
        row.balance = row.balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Raise or lower a trust score, never below zero.
    pub fn adjust_trust(&mut self, id: &ParticipantId, delta: i32) -> Result<u32, LedgerError> {
        let row = self.account_mut(id)?;
        row.trust_score = if delta >= 0 {
            row.trust_score.saturating_add(delta as u32)
        } else {
            row.trust_score.saturating_sub(delta.unsigned_abs())
        };
        Ok(row.trust_score)
    }

    // ── Commit ──────────────────────────────────────────────────────────

    /// Verify every staged row and the batch's fund flow, then apply.
    pub fn commit(self) -> Result<(), LedgerError> {
        if self.floating != 0 {
            return Err(LedgerError::Invariant(format!(
                "{} slashed units were never routed",
                self.floating
            )));
        }

        let mut before = self.ledger.reserve;
        let mut after = self.reserve;
        for (id, row) in &self.staged {
            row.check()?;
            let prior = self
                .ledger
                .accounts
                .get(id)
                .and_then(Account::holdings)
                .ok_or(LedgerError::Overflow)?;
            before = before.checked_add(prior).ok_or(LedgerError::Overflow)?;
            after = after
                .checked_add(row.holdings().ok_or(LedgerError::Overflow)?)
                .ok_or(LedgerError::Overflow)?;
        }
        let expected = before.checked_add(self.inflow).ok_or(LedgerError::Overflow)?;
        let actual = after.checked_add(self.outflow).ok_or(LedgerError::Overflow)?;
        if expected != actual {
            return Err(LedgerError::Invariant(format!(
                "fund flow mismatch: {before} + {} in != {after} + {} out",
                self.inflow, self.outflow
            )));
        }

        let reserve_changed = self.reserve != self.ledger.reserve;
        self.ledger.reserve = self.reserve;
        if reserve_changed {
            self.ledger.reserve_dirty = true;
        }
        for (id, row) in self.staged {
            self.ledger.dirty.insert(id.clone());
            self.ledger.accounts.insert(id, row);
        }
        Ok(())
    }
}

fn take_lock(row: &mut Account, case: CaseId, amount: u128) {
    row.frozen -= amount;
    if let Some(lock) = row.locks.get_mut(&case) {
        *lock -= amount;
        if *lock == 0 {
            row.locks.remove(&case);
        }
    }
}
