//! Case engine: the state machine for complaint resolution.
//!
//! ```text
//! Created ─▶ DepositsLocked ─▶ VotingOpen ─▶ Challenging ─▶ Settling ─▶ Completed
//!    │              │              │ (needs review)
//!    └──────────────┴──────────────┴─▶ Cancelled
//! ```
//!
//! Transitions are explicit tick calls with a caller-supplied `now`. Every
//! operation checks its preconditions before mutating anything, and ledger
//! movements run in one batch together with the checks that guard them.

use crate::collaborators::{selection_seed, AccessControl};
use crate::error::CaseError;
use crate::events::{CancelReason, CaseEvent};
use crate::file::CaseFile;
use crate::guards::{
    require_distinct_parties, require_eligible_validator, require_min_unfrozen, require_status,
};
use crate::view::{CaseView, ParticipantView};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tribunal_challenge::{ChallengeEngine, ChallengeError, ChallengeRequest};
use tribunal_ledger::{Account, DepositLedger, LedgerChanges, LedgerConfig, LedgerError};
use tribunal_settlement::{SettlementEngine, SettlementSummary};
use tribunal_types::{
    Case, CaseId, CaseParams, CaseStatus, ChallengeId, ChallengeOutcome, Choice, ParticipantId,
    RiskTier, Role, Timestamp,
};
use tribunal_utils::format_remaining;
use tribunal_voting::{RoundClose, VotingEngine};

/// A complaint as submitted by the complainant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Complaint {
    pub complainant: ParticipantId,
    pub respondent: ParticipantId,
    pub description: String,
    pub evidence_count: u32,
}

/// Inputs for a random selection, read under the lock and used outside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub pool: Vec<ParticipantId>,
    pub count: usize,
    pub seed: [u8; 32],
    pub exclude: HashSet<ParticipantId>,
}

pub struct CaseEngine {
    params: CaseParams,
    ledger: DepositLedger,
    cases: BTreeMap<CaseId, CaseFile>,
    next_case_id: u64,
    voting: VotingEngine,
    challenges: ChallengeEngine,
    settlement: SettlementEngine,
    /// Cases changed since the last [`CaseEngine::take_dirty_cases`].
    dirty: BTreeSet<CaseId>,
    meta_dirty: bool,
    /// Pending events for the service to dispatch.
    pending_events: Vec<CaseEvent>,
}

impl CaseEngine {
    pub fn new(params: CaseParams) -> Result<Self, CaseError> {
        params.validate().map_err(CaseError::Config)?;
        let ledger = DepositLedger::new(LedgerConfig::from(&params));
        Ok(Self::from_parts(params, ledger, BTreeMap::new(), 1))
    }

    /// Rebuild an engine from persisted state.
    pub fn restore(
        params: CaseParams,
        files: impl IntoIterator<Item = CaseFile>,
        accounts: impl IntoIterator<Item = Account>,
        reserve: u128,
        next_case_id: u64,
    ) -> Result<Self, CaseError> {
        params.validate().map_err(CaseError::Config)?;
        let ledger = DepositLedger::from_parts(LedgerConfig::from(&params), accounts, reserve)?;
        let cases: BTreeMap<CaseId, CaseFile> =
            files.into_iter().map(|f| (f.case.id, f)).collect();
        let floor = cases.keys().next_back().map_or(1, |id| id.raw() + 1);
        let engine = Self::from_parts(params, ledger, cases, next_case_id.max(floor));
        engine.check_invariants()?;
        tracing::info!(
            cases = engine.cases.len(),
            next_case_id = engine.next_case_id,
            "case engine restored"
        );
        Ok(engine)
    }

    fn from_parts(
        params: CaseParams,
        ledger: DepositLedger,
        cases: BTreeMap<CaseId, CaseFile>,
        next_case_id: u64,
    ) -> Self {
        Self {
            params,
            ledger,
            cases,
            next_case_id,
            voting: VotingEngine,
            challenges: ChallengeEngine,
            settlement: SettlementEngine,
            dirty: BTreeSet::new(),
            meta_dirty: false,
            pending_events: Vec::new(),
        }
    }

    pub fn params(&self) -> &CaseParams {
        &self.params
    }

    pub fn ledger(&self) -> &DepositLedger {
        &self.ledger
    }

    // ── Participants ────────────────────────────────────────────────────

    pub fn register_participant(
        &mut self,
        id: ParticipantId,
        role: Role,
        trust_score: u32,
    ) -> Result<(), CaseError> {
        self.ledger.open_account(id, role, trust_score)?;
        Ok(())
    }

    pub fn deposit(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), CaseError> {
        self.ledger.deposit(id, amount, now)?;
        Ok(())
    }

    /// Withdraw unfrozen funds; returns the amount paid out after the fee.
    pub fn withdraw(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, CaseError> {
        Ok(self.ledger.withdraw(id, amount, now)?)
    }

    pub fn stake(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), CaseError> {
        self.ledger.stake(id, amount, now)?;
        Ok(())
    }

    pub fn unstake(
        &mut self,
        id: &ParticipantId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), CaseError> {
        self.ledger.unstake(id, amount, now)?;
        Ok(())
    }

    pub fn fund_reserve(&mut self, amount: u128) -> Result<(), CaseError> {
        self.ledger.fund_reserve(amount)?;
        Ok(())
    }

    // ── Filing and deposits ─────────────────────────────────────────────

    /// File a complaint against a registered enterprise. `tier` comes from
    /// the risk assessment collaborator.
    pub fn file_complaint(
        &mut self,
        complaint: Complaint,
        tier: RiskTier,
        access: &dyn AccessControl,
        now: Timestamp,
    ) -> Result<CaseId, CaseError> {
        let Complaint {
            complainant,
            respondent,
            description,
            evidence_count,
        } = complaint;
        require_distinct_parties(&complainant, &respondent)?;
        if !access.can_complain(&complainant) {
            return Err(CaseError::Unauthorized {
                who: complainant,
                action: "file complaints",
            });
        }
        if !access.is_registered_respondent(&respondent) {
            return Err(CaseError::Unauthorized {
                who: respondent,
                action: "be named as respondent",
            });
        }
        require_min_unfrozen(&self.ledger, &complainant, Role::Complainant, &self.params)?;
        require_min_unfrozen(&self.ledger, &respondent, Role::Enterprise, &self.params)?;

        let id = CaseId::new(self.next_case_id);
        self.next_case_id += 1;
        self.meta_dirty = true;

        let case = Case::new(
            id,
            complainant.clone(),
            respondent.clone(),
            tier,
            evidence_count,
            now,
        );
        tracing::info!(case = %id, %complainant, %respondent, ?tier, evidence_count, "complaint filed");
        self.cases.insert(id, CaseFile::new(case, description));
        self.dirty.insert(id);
        self.pending_events.push(CaseEvent::CaseFiled {
            case_id: id,
            complainant,
            respondent,
            risk_tier: tier,
        });
        Ok(id)
    }

    /// Freeze the principals' collateral per the case's risk tier.
    ///
    /// Low tier freezes nothing, Medium the respondent's minimum, High both
    /// minimums. If either principal no longer holds its minimum the case is
    /// cancelled instead and no funds move.
    pub fn lock_deposits(&mut self, case_id: CaseId, now: Timestamp) -> Result<CaseStatus, CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        require_status(&file.case, &[CaseStatus::Created], "lock deposits for")?;

        let params = &self.params;
        let case = &file.case;
        let funded = require_min_unfrozen(&self.ledger, &case.complainant, Role::Complainant, params)
            .and_then(|_| {
                require_min_unfrozen(&self.ledger, &case.respondent, Role::Enterprise, params)
            });
        if let Err(e) = funded {
            tracing::warn!(case = %case_id, error = %e, %now, "deposits unavailable, cancelling case");
            file.case.status = CaseStatus::Cancelled;
            self.dirty.insert(case_id);
            self.pending_events.push(CaseEvent::CaseCancelled {
                case_id,
                reason: CancelReason::DepositsUnavailable,
            });
            return Ok(CaseStatus::Cancelled);
        }

        let tier = case.risk_tier;
        let (complainant, respondent) = (case.complainant.clone(), case.respondent.clone());
        self.ledger.atomic(|b| {
            if tier.freezes_respondent() && params.min_enterprise_deposit > 0 {
                b.freeze(case_id, &respondent, params.min_enterprise_deposit)?;
            }
            if tier.freezes_complainant() && params.min_complainant_deposit > 0 {
                b.freeze(case_id, &complainant, params.min_complainant_deposit)?;
            }
            Ok::<_, LedgerError>(())
        })?;

        file.case.status = CaseStatus::DepositsLocked;
        self.dirty.insert(case_id);
        self.pending_events
            .push(CaseEvent::DepositsLocked { case_id });
        tracing::info!(case = %case_id, ?tier, "deposits locked");
        Ok(CaseStatus::DepositsLocked)
    }

    // ── Voting ──────────────────────────────────────────────────────────

    /// Validators eligible for selection, ordered by id.
    pub fn validator_pool(&self, access: &dyn AccessControl) -> Vec<ParticipantId> {
        let mut pool: Vec<ParticipantId> = self
            .ledger
            .accounts()
            .filter(|a| a.role == Role::Validator && a.staked >= self.params.min_validator_stake)
            .filter(|a| access.can_vote(&a.id))
            .map(|a| a.id.clone())
            .collect();
        pool.sort();
        pool
    }

    /// How many validators the case's next round needs.
    pub fn required_validators(&self, case_id: CaseId) -> Result<u32, CaseError> {
        let file = self.file(case_id)?;
        Ok(self.voting.required_validators(
            file.case.risk_tier,
            file.case.evidence_count,
            &self.params,
        ))
    }

    /// Selection inputs for the case's next voting round. Parties and
    /// everyone who voted in an earlier round are excluded.
    pub fn validator_selection(
        &self,
        case_id: CaseId,
        access: &dyn AccessControl,
    ) -> Result<Selection, CaseError> {
        let file = self.file(case_id)?;
        let mut exclude: HashSet<ParticipantId> = file
            .rounds
            .iter()
            .flat_map(|r| r.voters().cloned())
            .collect();
        exclude.insert(file.case.complainant.clone());
        exclude.insert(file.case.respondent.clone());
        Ok(Selection {
            pool: self.validator_pool(access),
            count: self.required_validators(case_id)? as usize,
            seed: selection_seed(case_id, file.rounds.len() as u32, "validators"),
            exclude,
        })
    }

    pub fn open_voting(
        &mut self,
        case_id: CaseId,
        validators: Vec<ParticipantId>,
        access: &dyn AccessControl,
        now: Timestamp,
    ) -> Result<(), CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        require_status(&file.case, &[CaseStatus::DepositsLocked], "open voting on")?;
        for v in &validators {
            require_eligible_validator(&self.ledger, &file.case, v, &self.params)?;
            if !access.can_vote(v) {
                return Err(CaseError::Unauthorized {
                    who: v.clone(),
                    action: "vote",
                });
            }
        }
        let required = self.voting.required_validators(
            file.case.risk_tier,
            file.case.evidence_count,
            &self.params,
        );
        let deadline = now.plus(self.params.voting_period_secs);
        let round = self
            .voting
            .open_round(case_id, 0, validators, required, now, deadline)?;

        file.case.required_votes = round.assigned_count();
        file.case.voting_deadline = Some(deadline);
        file.case.status = CaseStatus::VotingOpen;
        self.pending_events.push(CaseEvent::VotingOpened {
            case_id,
            round: round.index,
            validators: round.assigned.clone(),
            deadline,
        });
        file.rounds.push(round);
        self.dirty.insert(case_id);
        Ok(())
    }

    /// Cast a ballot and freeze the ballot stake. The ballot's weight is
    /// taken from the voter's unfrozen balance before the freeze. Returns
    /// the close result when this ballot completed the round.
    pub fn cast_ballot(
        &mut self,
        case_id: CaseId,
        voter: &ParticipantId,
        choice: Choice,
        now: Timestamp,
    ) -> Result<Option<RoundClose>, CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        require_status(&file.case, &[CaseStatus::VotingOpen], "cast a ballot on")?;
        let round = file
            .rounds
            .last_mut()
            .ok_or(CaseError::NoVotingRound(case_id))?;

        let voting = self.voting;
        let params = &self.params;
        self.ledger.atomic(|b| {
            voting.check_ballot(round, voter, now)?;
            let unfrozen = b.account(voter)?.unfrozen();
            if params.ballot_stake > 0 {
                b.freeze(case_id, voter, params.ballot_stake)?;
            }
            voting.cast_ballot(round, voter, choice, unfrozen, now, params)?;
            Ok::<_, CaseError>(())
        })?;

        let all_voted = round.all_voted();
        self.dirty.insert(case_id);
        self.pending_events.push(CaseEvent::BallotCast {
            case_id,
            voter: voter.clone(),
        });

        if all_voted {
            return self.close_round(case_id, now).map(Some);
        }
        Ok(None)
    }

    /// Close the voting round if quorum is met or the deadline has passed.
    pub fn try_close(&mut self, case_id: CaseId, now: Timestamp) -> Result<RoundClose, CaseError> {
        self.close_round(case_id, now)
    }

    fn close_round(&mut self, case_id: CaseId, now: Timestamp) -> Result<RoundClose, CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        require_status(&file.case, &[CaseStatus::VotingOpen], "close voting on")?;
        let round = file
            .rounds
            .last_mut()
            .ok_or(CaseError::NoVotingRound(case_id))?;
        let close = self.voting.try_close(round, now, &self.params)?;

        let case = &mut file.case;
        self.pending_events.push(CaseEvent::VotingClosed {
            case_id,
            result: close.result,
            quorum_met: close.quorum_met,
        });
        if close.result.is_determined() {
            case.result = close.result;
            case.vote_result = close.result;
            case.status = CaseStatus::Challenging;
            let deadline = now.plus(self.params.challenge_period_secs);
            case.challenge_deadline = Some(deadline);
            tracing::info!(
                case = %case_id,
                result = ?close.result,
                votes = close.votes_cast,
                window = %format_remaining(deadline, now),
                "voting closed, challenge phase open"
            );
        } else {
            case.needs_review = true;
            self.pending_events
                .push(CaseEvent::ReviewRequired { case_id });
            tracing::warn!(case = %case_id, votes = close.votes_cast, "voting closed without quorum, review required");
        }
        self.dirty.insert(case_id);
        Ok(close)
    }

    /// Start a fresh round on a case whose previous round failed quorum.
    ///
    /// Voters of earlier rounds are ineligible; their ballot stakes are
    /// released. Principal collateral stays frozen.
    pub fn reopen_voting(
        &mut self,
        case_id: CaseId,
        validators: Vec<ParticipantId>,
        access: &dyn AccessControl,
        now: Timestamp,
    ) -> Result<(), CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        require_status(&file.case, &[CaseStatus::VotingOpen], "reopen voting on")?;
        if !file.case.needs_review {
            return Err(CaseError::NotUnderReview(case_id));
        }
        if file.case.reopen_count >= self.params.max_reopens {
            return Err(CaseError::ReopenLimit {
                case: case_id,
                max: self.params.max_reopens,
            });
        }
        let previous: HashSet<&ParticipantId> =
            file.rounds.iter().flat_map(|r| r.voters()).collect();
        for v in &validators {
            if previous.contains(v) {
                return Err(CaseError::IneligibleValidator {
                    who: v.clone(),
                    reason: "voted in an earlier round",
                });
            }
            require_eligible_validator(&self.ledger, &file.case, v, &self.params)?;
            if !access.can_vote(v) {
                return Err(CaseError::Unauthorized {
                    who: v.clone(),
                    action: "vote",
                });
            }
        }
        let required = self.voting.required_validators(
            file.case.risk_tier,
            file.case.evidence_count,
            &self.params,
        );
        let deadline = now.plus(self.params.voting_period_secs);
        let index = file.rounds.len() as u32;
        let round = self
            .voting
            .open_round(case_id, index, validators, required, now, deadline)?;

        let stakes: Vec<(ParticipantId, u128)> = file
            .round()
            .map(|r| {
                r.ballots
                    .iter()
                    .filter(|b| b.stake > 0)
                    .map(|b| (b.voter.clone(), b.stake))
                    .collect()
            })
            .unwrap_or_default();
        self.ledger.atomic(|b| {
            for (voter, stake) in &stakes {
                b.unfreeze(case_id, voter, *stake)?;
            }
            Ok::<_, LedgerError>(())
        })?;

        let case = &mut file.case;
        case.needs_review = false;
        case.reopen_count += 1;
        case.required_votes = round.assigned_count();
        case.voting_deadline = Some(deadline);
        tracing::info!(case = %case_id, round = index, released = stakes.len(), "voting reopened");
        self.pending_events.push(CaseEvent::VotingOpened {
            case_id,
            round: index,
            validators: round.assigned.clone(),
            deadline,
        });
        file.rounds.push(round);
        self.dirty.insert(case_id);
        Ok(())
    }

    /// Cancel a case that has not reached a result and release every lock
    /// held for it.
    pub fn cancel_case(&mut self, case_id: CaseId, now: Timestamp) -> Result<(), CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        let cancellable = match file.case.status {
            CaseStatus::Created | CaseStatus::DepositsLocked => true,
            CaseStatus::VotingOpen => file.case.needs_review,
            _ => false,
        };
        if !cancellable {
            return Err(CaseError::InvalidState {
                case: case_id,
                status: file.case.status,
                action: "cancel",
            });
        }

        let locks = self.ledger.locks_for_case(case_id);
        self.ledger.atomic(|b| {
            for (id, _) in &locks {
                b.release(case_id, id)?;
            }
            Ok::<_, LedgerError>(())
        })?;

        file.case.status = CaseStatus::Cancelled;
        self.dirty.insert(case_id);
        self.pending_events.push(CaseEvent::CaseCancelled {
            case_id,
            reason: CancelReason::Requested,
        });
        tracing::info!(case = %case_id, released = locks.len(), %now, "case cancelled");
        Ok(())
    }

    // ── Challenges ──────────────────────────────────────────────────────

    /// Selection inputs for a challenge's verifier panel.
    pub fn verifier_selection(
        &self,
        case_id: CaseId,
        challenger: &ParticipantId,
        access: &dyn AccessControl,
    ) -> Result<Selection, CaseError> {
        let file = self.file(case_id)?;
        if file.rounds.is_empty() {
            return Err(CaseError::NoVotingRound(case_id));
        }
        let exclude = self.challenges.verifier_exclusions(
            &file.case,
            &file.rounds,
            &file.challenges,
            challenger,
        );
        Ok(Selection {
            pool: self.validator_pool(access),
            count: self.params.challenge_verifier_count as usize,
            seed: selection_seed(case_id, file.challenges.len() as u32, "challenge-verifiers"),
            exclude,
        })
    }

    /// Submit a challenge and freeze its deposit under the case.
    pub fn submit_challenge(
        &mut self,
        case_id: CaseId,
        request: ChallengeRequest,
        verifiers: Vec<ParticipantId>,
        access: &dyn AccessControl,
        now: Timestamp,
    ) -> Result<ChallengeId, CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        if file.rounds.is_empty() {
            return Err(CaseError::NoVotingRound(case_id));
        }
        for v in &verifiers {
            if !access.can_vote(v) {
                return Err(CaseError::Unauthorized {
                    who: v.clone(),
                    action: "verify challenges",
                });
            }
            if !self.ledger.has_account(v) {
                return Err(LedgerError::UnknownAccount(v.clone()).into());
            }
        }
        let challenge = self.challenges.submit(
            &file.case,
            &file.rounds,
            &file.challenges,
            request,
            verifiers,
            now,
            &self.params,
        )?;
        self.ledger
            .freeze(case_id, &challenge.challenger, challenge.deposit)?;

        let id = challenge.id;
        self.pending_events.push(CaseEvent::ChallengeSubmitted {
            case_id,
            challenge_id: id,
            challenger: challenge.challenger.clone(),
            target: challenge.target.clone(),
        });
        file.challenges.push(challenge);
        self.dirty.insert(case_id);
        Ok(id)
    }

    /// Cast a verifier's vote and freeze the ballot stake. Returns the
    /// outcome when this vote completed the panel.
    pub fn cast_challenge_ballot(
        &mut self,
        case_id: CaseId,
        challenge_id: ChallengeId,
        voter: &ParticipantId,
        choice: Choice,
        now: Timestamp,
    ) -> Result<Option<ChallengeOutcome>, CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        require_status(&file.case, &[CaseStatus::Challenging], "vote on a challenge of")?;
        let CaseFile {
            rounds, challenges, ..
        } = file;
        if rounds.is_empty() {
            return Err(CaseError::NoVotingRound(case_id));
        }
        let rounds = rounds.as_slice();

        let engine = &self.challenges;
        let params = &self.params;
        self.ledger.atomic(|b| {
            engine.check_ballot(rounds, challenges.as_slice(), challenge_id, voter, now)?;
            let unfrozen = b.account(voter)?.unfrozen();
            if params.ballot_stake > 0 {
                b.freeze(case_id, voter, params.ballot_stake)?;
            }
            engine.cast_ballot(
                rounds,
                challenges.as_mut_slice(),
                challenge_id,
                voter,
                choice,
                unfrozen,
                now,
                params,
            )?;
            Ok::<_, CaseError>(())
        })?;
        self.dirty.insert(case_id);

        let complete = challenges
            .iter()
            .any(|c| c.id == challenge_id && c.all_voted());
        if complete {
            return self.resolve_challenge(case_id, challenge_id, now).map(Some);
        }
        Ok(None)
    }

    pub fn resolve_challenge(
        &mut self,
        case_id: CaseId,
        challenge_id: ChallengeId,
        now: Timestamp,
    ) -> Result<ChallengeOutcome, CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        require_status(&file.case, &[CaseStatus::Challenging], "resolve a challenge of")?;
        let CaseFile {
            rounds, challenges, ..
        } = file;
        let round = rounds.last().ok_or(CaseError::NoVotingRound(case_id))?;
        let challenge = challenges
            .iter_mut()
            .find(|c| c.id == challenge_id)
            .ok_or(ChallengeError::UnknownChallenge(challenge_id))?;
        let outcome = self
            .challenges
            .resolve(challenge, round, now, &self.params)?;

        self.dirty.insert(case_id);
        self.pending_events.push(CaseEvent::ChallengeResolved {
            case_id,
            challenge_id,
            outcome,
        });
        Ok(outcome)
    }

    /// Close the challenge phase and move the case to settlement. Returns
    /// whether the result was overturned.
    pub fn end_challenge_phase(&mut self, case_id: CaseId, now: Timestamp) -> Result<bool, CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        let CaseFile {
            case,
            rounds,
            challenges,
            ..
        } = file;
        let round = rounds.last().ok_or(CaseError::NoVotingRound(case_id))?;
        let pending: Vec<ChallengeId> = challenges
            .iter()
            .filter(|c| !c.resolved)
            .map(|c| c.id)
            .collect();

        let overturned =
            self.challenges
                .end_challenge_phase(case, round, challenges, now, &self.params)?;
        case.status = CaseStatus::Settling;

        for challenge in challenges.iter().filter(|c| pending.contains(&c.id)) {
            self.pending_events.push(CaseEvent::ChallengeResolved {
                case_id,
                challenge_id: challenge.id,
                outcome: challenge.outcome,
            });
        }
        self.pending_events.push(CaseEvent::ChallengePhaseEnded {
            case_id,
            overturned,
            result: case.result,
        });
        tracing::info!(case = %case_id, overturned, result = ?case.result, challenges = challenges.len(), "challenge phase ended");
        self.dirty.insert(case_id);
        Ok(overturned)
    }

    // ── Settlement ──────────────────────────────────────────────────────

    pub fn settle(&mut self, case_id: CaseId, now: Timestamp) -> Result<SettlementSummary, CaseError> {
        let file = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))?;
        let CaseFile {
            case,
            rounds,
            challenges,
            settlement,
            ..
        } = file;
        let round = rounds.last().ok_or(CaseError::NoVotingRound(case_id))?;
        let summary =
            self.settlement
                .settle(case, round, challenges, &mut self.ledger, &self.params)?;

        *settlement = Some(summary.clone());
        self.dirty.insert(case_id);
        self.pending_events.push(CaseEvent::CaseSettled {
            case_id,
            result: summary.result,
            records: summary.records.clone(),
        });
        tracing::debug!(case = %case_id, %now, "settlement recorded");
        Ok(summary)
    }

    // ── Views ───────────────────────────────────────────────────────────

    fn file(&self, case_id: CaseId) -> Result<&CaseFile, CaseError> {
        self.cases
            .get(&case_id)
            .ok_or(CaseError::UnknownCase(case_id))
    }

    pub fn case_file(&self, case_id: CaseId) -> Option<&CaseFile> {
        self.cases.get(&case_id)
    }

    pub fn case_view(&self, case_id: CaseId) -> Result<CaseView, CaseError> {
        self.file(case_id).map(CaseView::from)
    }

    pub fn participant_ledger(&self, id: &ParticipantId) -> Result<ParticipantView, CaseError> {
        self.ledger
            .account(id)
            .map(ParticipantView::from)
            .ok_or_else(|| LedgerError::UnknownAccount(id.clone()).into())
    }

    pub fn case_ids(&self) -> impl Iterator<Item = CaseId> + '_ {
        self.cases.keys().copied()
    }

    pub fn next_case_id(&self) -> u64 {
        self.next_case_id
    }

    /// Check ledger rows and case bookkeeping. A failure is a logic defect.
    pub fn check_invariants(&self) -> Result<(), CaseError> {
        if let Err(e) = self.ledger.check_invariants() {
            tracing::error!(error = %e, "ledger invariant violated");
            return Err(e.into());
        }
        for file in self.cases.values() {
            let case = &file.case;
            let finished = case.status.is_terminal();
            let stray_locks = finished && !self.ledger.locks_for_case(case.id).is_empty();
            let bad_settled = case.settled != (case.status == CaseStatus::Completed);
            if stray_locks || bad_settled {
                let msg = format!(
                    "{}: status {:?}, settled {}, stray locks {}",
                    case.id, case.status, case.settled, stray_locks
                );
                tracing::error!(case = %case.id, "{msg}");
                return Err(LedgerError::Invariant(msg).into());
            }
        }
        Ok(())
    }

    // ── Events and change tracking ──────────────────────────────────────

    pub fn drain_events(&mut self) -> Vec<CaseEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Case files changed since the last call.
    pub fn take_dirty_cases(&mut self) -> Vec<CaseFile> {
        std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|id| self.cases.get(&id).cloned())
            .collect()
    }

    pub fn take_ledger_changes(&mut self) -> LedgerChanges {
        self.ledger.take_changes()
    }

    /// The next case id, if it changed since the last call.
    pub fn take_meta_changes(&mut self) -> Option<u64> {
        std::mem::take(&mut self.meta_dirty).then_some(self.next_case_id)
    }
}
