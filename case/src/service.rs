//! Thread-safe front end for the case engine.
//!
//! Lock discipline per operation:
//!
//! 1. Collaborator calls (risk assessment, selection) run before the engine
//!    lock is taken. The engine re-validates everything under the lock.
//! 2. The engine applies the operation and buffers events and dirty rows.
//! 3. The commit lock is taken while the engine lock is still held, then
//!    the engine lock is released and the batch is committed. Batches reach
//!    the store in the order their mutations happened.
//! 4. Observers are called after both locks are released.

use crate::collaborators::{AccessControl, RandomSelector, RiskAssessment};
use crate::config::EngineConfig;
use crate::engine::{CaseEngine, Complaint};
use crate::error::CaseError;
use crate::events::{CaseEvent, CaseObserver};
use crate::persist;
use crate::view::{CaseView, ParticipantView};
use std::sync::{Arc, Mutex, MutexGuard};
use tribunal_challenge::ChallengeRequest;
use tribunal_settlement::SettlementSummary;
use tribunal_store::{CaseStore, WriteBatch};
use tribunal_types::{
    CaseId, CaseStatus, ChallengeId, ChallengeOutcome, Choice, Classify, Clock, ErrorKind,
    ParticipantId, Role, Timestamp,
};
use tribunal_utils::StatsCounter;
use tribunal_voting::RoundClose;

const STATS: &[&str] = &[
    "cases_filed",
    "cases_cancelled",
    "cases_settled",
    "ballots_cast",
    "challenges_submitted",
    "challenges_resolved",
    "rejected",
    "store_failures",
];

/// The external systems the service consults.
#[derive(Clone)]
pub struct Collaborators {
    pub access: Arc<dyn AccessControl>,
    pub risk: Arc<dyn RiskAssessment>,
    pub selector: Arc<dyn RandomSelector>,
}

pub struct CaseService {
    engine: Mutex<CaseEngine>,
    clock: Arc<dyn Clock>,
    collaborators: Collaborators,
    store: Option<Arc<dyn CaseStore>>,
    observers: Vec<Arc<dyn CaseObserver>>,
    /// Writes not yet committed. Also orders commits.
    unflushed: Mutex<WriteBatch>,
    stats: StatsCounter,
}

impl CaseService {
    pub fn new(engine: CaseEngine, clock: Arc<dyn Clock>, collaborators: Collaborators) -> Self {
        Self {
            engine: Mutex::new(engine),
            clock,
            collaborators,
            store: None,
            observers: Vec::new(),
            unflushed: Mutex::new(WriteBatch::new()),
            stats: StatsCounter::new(STATS),
        }
    }

    /// Load the engine from `store` and persist every later change to it.
    pub fn open(
        config: &EngineConfig,
        store: Arc<dyn CaseStore>,
        clock: Arc<dyn Clock>,
        collaborators: Collaborators,
    ) -> Result<Self, CaseError> {
        config.validate()?;
        let engine = persist::load_engine(store.as_ref(), config.params.clone())?;
        Ok(Self::new(engine, clock, collaborators).with_store(store))
    }

    pub fn with_store(mut self, store: Arc<dyn CaseStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CaseObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    // ── Participants ────────────────────────────────────────────────────

    /// Open a ledger account with the trust score reported by access control.
    pub fn register_participant(&self, id: ParticipantId, role: Role) -> Result<(), CaseError> {
        let trust = self.collaborators.access.trust_score(&id);
        self.mutate("register_participant", |e, _| {
            e.register_participant(id, role, trust)
        })
    }

    pub fn deposit(&self, id: &ParticipantId, amount: u128) -> Result<(), CaseError> {
        self.mutate("deposit", |e, now| e.deposit(id, amount, now))
    }

    pub fn withdraw(&self, id: &ParticipantId, amount: u128) -> Result<u128, CaseError> {
        self.mutate("withdraw", |e, now| e.withdraw(id, amount, now))
    }

    pub fn stake(&self, id: &ParticipantId, amount: u128) -> Result<(), CaseError> {
        self.mutate("stake", |e, now| e.stake(id, amount, now))
    }

    pub fn unstake(&self, id: &ParticipantId, amount: u128) -> Result<(), CaseError> {
        self.mutate("unstake", |e, now| e.unstake(id, amount, now))
    }

    pub fn fund_reserve(&self, amount: u128) -> Result<(), CaseError> {
        self.mutate("fund_reserve", |e, _| e.fund_reserve(amount))
    }

    // ── Case lifecycle ──────────────────────────────────────────────────

    pub fn file_complaint(&self, complaint: Complaint) -> Result<CaseId, CaseError> {
        let tier = self.collaborators.risk.assess_risk(
            &complaint.respondent,
            &complaint.description,
            complaint.evidence_count,
        );
        let access = self.collaborators.access.as_ref();
        self.mutate("file_complaint", |e, now| {
            e.file_complaint(complaint, tier, access, now)
        })
    }

    pub fn lock_deposits(&self, case_id: CaseId) -> Result<CaseStatus, CaseError> {
        self.mutate("lock_deposits", |e, now| e.lock_deposits(case_id, now))
    }

    /// Select a validator panel and open voting. Returns the panel.
    pub fn open_voting(&self, case_id: CaseId) -> Result<Vec<ParticipantId>, CaseError> {
        let access = self.collaborators.access.as_ref();
        let sel = self.read(|e| e.validator_selection(case_id, access))?;
        let panel =
            self.collaborators
                .selector
                .select_validators(&sel.pool, sel.count, &sel.seed, &sel.exclude);
        self.mutate("open_voting", |e, now| {
            e.open_voting(case_id, panel.clone(), access, now)?;
            Ok(panel)
        })
    }

    pub fn cast_ballot(
        &self,
        case_id: CaseId,
        voter: &ParticipantId,
        choice: Choice,
    ) -> Result<Option<RoundClose>, CaseError> {
        self.mutate("cast_ballot", |e, now| {
            e.cast_ballot(case_id, voter, choice, now)
        })
    }

    pub fn try_close(&self, case_id: CaseId) -> Result<RoundClose, CaseError> {
        self.mutate("try_close", |e, now| e.try_close(case_id, now))
    }

    /// Select a fresh panel for a case under review and reopen voting.
    pub fn reopen_voting(&self, case_id: CaseId) -> Result<Vec<ParticipantId>, CaseError> {
        let access = self.collaborators.access.as_ref();
        let sel = self.read(|e| e.validator_selection(case_id, access))?;
        let panel =
            self.collaborators
                .selector
                .select_validators(&sel.pool, sel.count, &sel.seed, &sel.exclude);
        self.mutate("reopen_voting", |e, now| {
            e.reopen_voting(case_id, panel.clone(), access, now)?;
            Ok(panel)
        })
    }

    pub fn cancel_case(&self, case_id: CaseId) -> Result<(), CaseError> {
        self.mutate("cancel_case", |e, now| e.cancel_case(case_id, now))
    }

    /// Select a verifier panel and submit the challenge.
    pub fn submit_challenge(
        &self,
        case_id: CaseId,
        request: ChallengeRequest,
    ) -> Result<ChallengeId, CaseError> {
        let access = self.collaborators.access.as_ref();
        let sel = self.read(|e| e.verifier_selection(case_id, &request.challenger, access))?;
        let panel =
            self.collaborators
                .selector
                .select_verifiers(&sel.pool, sel.count, &sel.seed, &sel.exclude);
        self.mutate("submit_challenge", |e, now| {
            e.submit_challenge(case_id, request, panel, access, now)
        })
    }

    pub fn cast_challenge_ballot(
        &self,
        case_id: CaseId,
        challenge_id: ChallengeId,
        voter: &ParticipantId,
        choice: Choice,
    ) -> Result<Option<ChallengeOutcome>, CaseError> {
        self.mutate("cast_challenge_ballot", |e, now| {
            e.cast_challenge_ballot(case_id, challenge_id, voter, choice, now)
        })
    }

    pub fn resolve_challenge(
        &self,
        case_id: CaseId,
        challenge_id: ChallengeId,
    ) -> Result<ChallengeOutcome, CaseError> {
        self.mutate("resolve_challenge", |e, now| {
            e.resolve_challenge(case_id, challenge_id, now)
        })
    }

    pub fn end_challenge_phase(&self, case_id: CaseId) -> Result<bool, CaseError> {
        self.mutate("end_challenge_phase", |e, now| {
            e.end_challenge_phase(case_id, now)
        })
    }

    pub fn settle(&self, case_id: CaseId) -> Result<SettlementSummary, CaseError> {
        self.mutate("settle", |e, now| e.settle(case_id, now))
    }

    // ── Views ───────────────────────────────────────────────────────────

    pub fn case_view(&self, case_id: CaseId) -> Result<CaseView, CaseError> {
        self.read(|e| e.case_view(case_id))
    }

    pub fn participant_ledger(&self, id: &ParticipantId) -> Result<ParticipantView, CaseError> {
        self.read(|e| e.participant_ledger(id))
    }

    pub fn validator_pool(&self) -> Result<Vec<ParticipantId>, CaseError> {
        let access = self.collaborators.access.as_ref();
        self.read(|e| Ok(e.validator_pool(access)))
    }

    pub fn reserve(&self) -> Result<u128, CaseError> {
        self.read(|e| Ok(e.ledger().reserve()))
    }

    pub fn total_supply(&self) -> Result<u128, CaseError> {
        self.read(|e| Ok(e.ledger().total_supply()))
    }

    pub fn check_invariants(&self) -> Result<(), CaseError> {
        self.read(|e| e.check_invariants())
    }

    /// Retry writes left over from a failed commit.
    pub fn flush(&self) -> Result<(), CaseError> {
        let engine = self.lock()?;
        self.persist(engine)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn lock(&self) -> Result<MutexGuard<'_, CaseEngine>, CaseError> {
        self.engine.lock().map_err(|_| CaseError::LockPoisoned)
    }

    fn read<T>(&self, f: impl FnOnce(&CaseEngine) -> Result<T, CaseError>) -> Result<T, CaseError> {
        let engine = self.lock()?;
        f(&engine)
    }

    fn mutate<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut CaseEngine, Timestamp) -> Result<T, CaseError>,
    ) -> Result<T, CaseError> {
        let now = self.clock.now();
        let mut engine = self.lock()?;
        let out = match f(&mut engine, now) {
            Ok(out) => out,
            Err(e) => {
                self.stats.increment("rejected");
                if e.kind() == ErrorKind::InvariantViolation {
                    tracing::error!(op, error = %e, "invariant violation");
                } else {
                    tracing::debug!(op, error = %e, kind = ?e.kind(), "operation rejected");
                }
                return Err(e);
            }
        };
        let events = engine.drain_events();
        let persisted = self.persist(engine);
        self.dispatch(&events);
        persisted?;
        Ok(out)
    }

    /// Commit the engine's pending changes. Consumes the engine guard so it
    /// is released before the store is touched. Writes of a failed commit
    /// are kept and retried ahead of the next batch.
    fn persist(&self, mut engine: MutexGuard<'_, CaseEngine>) -> Result<(), CaseError> {
        let Some(store) = &self.store else {
            engine.take_dirty_cases();
            engine.take_ledger_changes();
            engine.take_meta_changes();
            return Ok(());
        };
        let batch = match persist::collect_writes(&mut engine) {
            Ok(batch) => batch,
            Err(e) => {
                self.stats.increment("store_failures");
                tracing::error!(error = %e, "failed to encode engine changes");
                return Err(e);
            }
        };
        let mut unflushed = self.unflushed.lock().map_err(|_| CaseError::LockPoisoned)?;
        drop(engine);
        unflushed.append(batch);
        if unflushed.is_empty() {
            return Ok(());
        }
        let rows = unflushed.len();
        match store.commit(unflushed.clone()) {
            Ok(()) => {
                *unflushed = WriteBatch::new();
                Ok(())
            }
            Err(e) => {
                self.stats.increment("store_failures");
                tracing::error!(rows, error = %e, "store commit failed, keeping writes for retry");
                Err(e.into())
            }
        }
    }

    fn dispatch(&self, events: &[CaseEvent]) {
        for event in events {
            match event {
                CaseEvent::CaseFiled { .. } => self.stats.increment("cases_filed"),
                CaseEvent::CaseCancelled { .. } => self.stats.increment("cases_cancelled"),
                CaseEvent::CaseSettled { .. } => self.stats.increment("cases_settled"),
                CaseEvent::BallotCast { .. } => self.stats.increment("ballots_cast"),
                CaseEvent::ChallengeSubmitted { .. } => {
                    self.stats.increment("challenges_submitted")
                }
                CaseEvent::ChallengeResolved { .. } => self.stats.increment("challenges_resolved"),
                _ => 0,
            };
            for observer in &self.observers {
                observer.on_event(event);
                if let CaseEvent::CaseSettled {
                    case_id,
                    result,
                    records,
                } = event
                {
                    observer.on_case_settled(*case_id, *result, records);
                }
            }
        }
    }
}
