//! Case voting: validators cast weighted ballots on a complaint.

use crate::error::VotingError;
use crate::round::{Ballot, RoundClose, VotingRound};
use std::collections::HashSet;
use tribunal_types::{
    meets_quorum, share_bps, CaseId, CaseParams, CaseResult, Choice, ParticipantId, RiskTier,
    TieBreak, Timestamp,
};

/// Engine for sizing, running and closing voting rounds.
///
/// Stateless: every method operates on the round passed in.
#[derive(Clone, Copy, Debug, Default)]
pub struct VotingEngine;

impl VotingEngine {
    /// Number of validators a case needs, from its risk tier and evidence.
    ///
    /// Low tier starts at `min_validators`, High at `max_validators`, Medium
    /// at the floor midpoint. Three or more pieces of evidence add one,
    /// five or more add two. The result is clamped to the configured range.
    pub fn required_validators(
        &self,
        tier: RiskTier,
        evidence_count: u32,
        params: &CaseParams,
    ) -> u32 {
        let bonus = match evidence_count {
            0..=2 => 0,
            3..=4 => 1,
            _ => 2,
        };
        params
            .base_validators(tier)
            .saturating_add(bonus)
            .clamp(params.min_validators, params.max_validators.max(params.min_validators))
    }

    /// Open a round over the given validators.
    pub fn open_round(
        &self,
        case_id: CaseId,
        index: u32,
        validators: Vec<ParticipantId>,
        required: u32,
        now: Timestamp,
        deadline: Timestamp,
    ) -> Result<VotingRound, VotingError> {
        let mut seen = HashSet::with_capacity(validators.len());
        for v in &validators {
            if !v.is_valid() {
                return Err(VotingError::InvalidValidator);
            }
            if !seen.insert(v) {
                return Err(VotingError::DuplicateValidator(v.clone()));
            }
        }
        let have = validators.len() as u32;
        if have < required || have == 0 {
            return Err(VotingError::NotEnoughValidators {
                have,
                need: required.max(1),
            });
        }

        tracing::info!(case = %case_id, round = index, validators = have, %deadline, "voting round opened");
        Ok(VotingRound {
            case_id,
            index,
            assigned: validators,
            ballots: Vec::new(),
            support_weight: 0,
            reject_weight: 0,
            opened_at: now,
            deadline,
            closed: false,
            result: CaseResult::Undetermined,
        })
    }

    /// Check that `voter` may cast a ballot now, without recording anything.
    pub fn check_ballot(
        &self,
        round: &VotingRound,
        voter: &ParticipantId,
        now: Timestamp,
    ) -> Result<(), VotingError> {
        if round.closed {
            return Err(VotingError::RoundClosed);
        }
        if round.deadline.is_passed(now) {
            return Err(VotingError::DeadlinePassed {
                deadline: round.deadline,
            });
        }
        if !round.is_assigned(voter) {
            return Err(VotingError::NotAssigned(voter.clone()));
        }
        if round.has_voted(voter) {
            return Err(VotingError::AlreadyVoted(voter.clone()));
        }
        Ok(())
    }

    /// Record a ballot. The weight is derived from `unfrozen_balance`, read
    /// before the ballot stake is frozen.
    pub fn cast_ballot(
        &self,
        round: &mut VotingRound,
        voter: &ParticipantId,
        choice: Choice,
        unfrozen_balance: u128,
        now: Timestamp,
        params: &CaseParams,
    ) -> Result<Ballot, VotingError> {
        self.check_ballot(round, voter, now)?;

        let weight = params.weighting.weight(unfrozen_balance);
        match choice {
            Choice::Support => round.support_weight = round.support_weight.saturating_add(weight),
            Choice::Reject => round.reject_weight = round.reject_weight.saturating_add(weight),
        }
        let ballot = Ballot {
            case_id: round.case_id,
            voter: voter.clone(),
            choice,
            weight,
            stake: params.ballot_stake,
            cast_at: now,
        };
        round.ballots.push(ballot.clone());

        tracing::debug!(
            case = %round.case_id,
            voter = %voter,
            ?choice,
            weight,
            cast = round.ballots.len(),
            assigned = round.assigned.len(),
            "ballot cast"
        );
        Ok(ballot)
    }

    /// Close the round if it can be closed at `now`.
    ///
    /// A round closes once every assigned validator has voted, once the
    /// quorum is met, or once the deadline has passed. Closing at the
    /// deadline without quorum yields [`CaseResult::Undetermined`].
    pub fn try_close(
        &self,
        round: &mut VotingRound,
        now: Timestamp,
        params: &CaseParams,
    ) -> Result<RoundClose, VotingError> {
        if round.closed {
            return Err(VotingError::RoundClosed);
        }
        let cast = round.votes_cast();
        let quorum_met =
            round.all_voted() || meets_quorum(cast, round.assigned_count(), params.quorum_bps);

        let result = if quorum_met {
            self.tally(round.support_weight, round.reject_weight, params)
        } else if round.deadline.is_passed(now) {
            tracing::warn!(
                case = %round.case_id,
                cast,
                assigned = round.assigned_count(),
                "voting deadline passed without quorum"
            );
            CaseResult::Undetermined
        } else {
            return Err(VotingError::DeadlineNotReached {
                deadline: round.deadline,
            });
        };

        round.closed = true;
        round.result = result;
        tracing::info!(
            case = %round.case_id,
            ?result,
            support = round.support_weight,
            reject = round.reject_weight,
            cast,
            "voting round closed"
        );
        Ok(RoundClose {
            result,
            quorum_met,
            votes_cast: cast,
        })
    }

    /// Decide a result from the weight totals.
    ///
    /// Upheld iff the floored support share exceeds `majority_bps`. Equal
    /// totals, including no weight at all, follow the configured tie-break.
    pub fn tally(&self, support: u128, reject: u128, params: &CaseParams) -> CaseResult {
        if support == reject {
            return match params.tie_break {
                TieBreak::Reject => CaseResult::ComplaintRejected,
                TieBreak::Uphold => CaseResult::ComplaintUpheld,
            };
        }
        let total = support.saturating_add(reject);
        if share_bps(support, total) > params.majority_bps {
            CaseResult::ComplaintUpheld
        } else {
            CaseResult::ComplaintRejected
        }
    }

    /// Ballots that agree with `result`.
    pub fn winners<'a>(&self, round: &'a VotingRound, result: CaseResult) -> Vec<&'a Ballot> {
        match result.winning_choice() {
            Some(choice) => round.ballots.iter().filter(|b| b.choice == choice).collect(),
            None => Vec::new(),
        }
    }

    /// Ballots that disagree with `result`.
    pub fn losers<'a>(&self, round: &'a VotingRound, result: CaseResult) -> Vec<&'a Ballot> {
        match result.winning_choice() {
            Some(choice) => round.ballots.iter().filter(|b| b.choice != choice).collect(),
            None => Vec::new(),
        }
    }
}
