//! Challenge engine: submission, verifier voting and resolution.

use crate::error::ChallengeError;
use crate::marks::{Mark, MarkEffect, MarkReason};
use crate::state::{Challenge, ChallengeBallot};
use std::collections::HashSet;
use tribunal_types::{
    apply_bps, meets_quorum, share_bps, Case, CaseParams, CaseStatus, ChallengeClaim,
    ChallengeId, ChallengeOutcome, Choice, ParticipantId, Timestamp,
};
use tribunal_voting::VotingRound;

/// What a challenger submits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeRequest {
    pub challenger: ParticipantId,
    pub target: ParticipantId,
    pub claim: ChallengeClaim,
    pub deposit: u128,
}

pub struct ChallengeEngine;

impl ChallengeEngine {
    /// Check a submission against the case, its voting rounds and earlier
    /// challenges. The target must have voted in the deciding (last) round;
    /// the challenger must not have voted in any round.
    pub fn check_submission(
        &self,
        case: &Case,
        rounds: &[VotingRound],
        existing: &[Challenge],
        request: &ChallengeRequest,
        now: Timestamp,
        params: &CaseParams,
    ) -> Result<(), ChallengeError> {
        if case.status != CaseStatus::Challenging {
            return Err(ChallengeError::NotChallenging(case.status));
        }
        if let Some(deadline) = case.challenge_deadline {
            if deadline.is_passed(now) {
                return Err(ChallengeError::ChallengePeriodOver { deadline });
            }
        }
        if request.deposit < params.min_challenge_deposit {
            return Err(ChallengeError::DepositTooLow {
                deposit: request.deposit,
                min: params.min_challenge_deposit,
            });
        }
        let who = &request.challenger;
        let deciding = rounds.last();
        if !deciding.is_some_and(|r| r.has_voted(&request.target)) {
            return Err(ChallengeError::TargetNotVoter(request.target.clone()));
        }
        if voted_in_any(rounds, who) {
            return Err(ChallengeError::ChallengerVoted(who.clone()));
        }
        if case.is_party(who) {
            return Err(ChallengeError::ChallengerIsParty(who.clone()));
        }
        if existing.iter().any(|c| &c.challenger == who) {
            return Err(ChallengeError::AlreadyChallenged(who.clone()));
        }
        if existing.iter().any(|c| c.has_voted(who)) {
            return Err(ChallengeError::ChallengerVotedOnChallenge(who.clone()));
        }
        Ok(())
    }

    /// Participants that may not verify a challenge on this case.
    pub fn verifier_exclusions(
        &self,
        case: &Case,
        rounds: &[VotingRound],
        existing: &[Challenge],
        challenger: &ParticipantId,
    ) -> HashSet<ParticipantId> {
        let mut out: HashSet<ParticipantId> =
            rounds.iter().flat_map(|r| r.voters()).cloned().collect();
        out.extend(existing.iter().map(|c| c.challenger.clone()));
        out.insert(case.complainant.clone());
        out.insert(case.respondent.clone());
        out.insert(challenger.clone());
        out
    }

    /// Build a challenge. The caller freezes the deposit under the case id.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &self,
        case: &Case,
        rounds: &[VotingRound],
        existing: &[Challenge],
        request: ChallengeRequest,
        verifiers: Vec<ParticipantId>,
        now: Timestamp,
        params: &CaseParams,
    ) -> Result<Challenge, ChallengeError> {
        self.check_submission(case, rounds, existing, &request, now, params)?;

        if verifiers.is_empty() {
            return Err(ChallengeError::NoVerifiers);
        }
        let excluded = self.verifier_exclusions(case, rounds, existing, &request.challenger);
        let mut seen = HashSet::with_capacity(verifiers.len());
        for v in &verifiers {
            if !v.is_valid() || excluded.contains(v) || !seen.insert(v) {
                return Err(ChallengeError::InvalidVerifier(v.clone()));
            }
        }

        let id = ChallengeId::new(existing.len() as u32 + 1);
        tracing::info!(
            case = %case.id,
            challenge = %id,
            challenger = %request.challenger,
            target = %request.target,
            claim = ?request.claim,
            deposit = request.deposit,
            verifiers = verifiers.len(),
            "challenge submitted"
        );
        Ok(Challenge {
            case_id: case.id,
            id,
            challenger: request.challenger,
            target: request.target,
            claim: request.claim,
            deposit: request.deposit,
            verifiers,
            ballots: Vec::new(),
            support_weight: 0,
            reject_weight: 0,
            submitted_at: now,
            deadline: now.plus(params.challenge_voting_period_secs),
            outcome: ChallengeOutcome::Pending,
            resolved: false,
            marks: Vec::new(),
        })
    }

    /// Check that `voter` may vote on challenge `id` now.
    pub fn check_ballot(
        &self,
        rounds: &[VotingRound],
        challenges: &[Challenge],
        id: ChallengeId,
        voter: &ParticipantId,
        now: Timestamp,
    ) -> Result<(), ChallengeError> {
        let challenge = challenges
            .iter()
            .find(|c| c.id == id)
            .ok_or(ChallengeError::UnknownChallenge(id))?;
        if challenge.resolved {
            return Err(ChallengeError::AlreadyResolved(id));
        }
        if challenge.deadline.is_passed(now) {
            return Err(ChallengeError::DeadlinePassed {
                deadline: challenge.deadline,
            });
        }
        if !challenge.is_verifier(voter) {
            return Err(ChallengeError::NotVerifier(voter.clone()));
        }
        if voted_in_any(rounds, voter) {
            return Err(ChallengeError::VoterIsCaseVoter(voter.clone()));
        }
        if challenges.iter().any(|c| &c.challenger == voter) {
            return Err(ChallengeError::VoterIsChallenger(voter.clone()));
        }
        // One challenge vote per participant per case, across all challenges.
        if challenges.iter().any(|c| c.has_voted(voter)) {
            return Err(ChallengeError::AlreadyVoted(voter.clone()));
        }
        Ok(())
    }

    /// Record a verifier's vote. The caller freezes the ballot stake.
    #[allow(clippy::too_many_arguments)]
    pub fn cast_ballot(
        &self,
        rounds: &[VotingRound],
        challenges: &mut [Challenge],
        id: ChallengeId,
        voter: &ParticipantId,
        choice: Choice,
        unfrozen_balance: u128,
        now: Timestamp,
        params: &CaseParams,
    ) -> Result<ChallengeBallot, ChallengeError> {
        self.check_ballot(rounds, challenges, id, voter, now)?;
        let challenge = challenges
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ChallengeError::UnknownChallenge(id))?;

        let weight = params.weighting.weight(unfrozen_balance);
        match choice {
            Choice::Support => {
                challenge.support_weight = challenge.support_weight.saturating_add(weight)
            }
            Choice::Reject => {
                challenge.reject_weight = challenge.reject_weight.saturating_add(weight)
            }
        }
        let ballot = ChallengeBallot {
            voter: voter.clone(),
            choice,
            weight,
            stake: params.ballot_stake,
            cast_at: now,
        };
        challenge.ballots.push(ballot.clone());
        tracing::debug!(case = %challenge.case_id, challenge = %id, voter = %voter, ?choice, weight, "challenge ballot cast");
        Ok(ballot)
    }

    /// Whether `challenge` can be resolved at `now`.
    pub fn can_resolve(&self, challenge: &Challenge, now: Timestamp, params: &CaseParams) -> bool {
        !challenge.resolved
            && (self.quorum_met(challenge, params) || challenge.deadline.is_passed(now))
    }

    fn quorum_met(&self, challenge: &Challenge, params: &CaseParams) -> bool {
        challenge.all_voted()
            || meets_quorum(
                challenge.ballots.len() as u32,
                challenge.verifiers.len() as u32,
                params.challenge_quorum_bps,
            )
    }

    /// Resolve a challenge and produce its marks.
    ///
    /// Repeat calls fail with `AlreadyResolved` and leave the marks untouched.
    pub fn resolve(
        &self,
        challenge: &mut Challenge,
        round: &VotingRound,
        now: Timestamp,
        params: &CaseParams,
    ) -> Result<ChallengeOutcome, ChallengeError> {
        if challenge.resolved {
            return Err(ChallengeError::AlreadyResolved(challenge.id));
        }

        let (outcome, marks) = if self.quorum_met(challenge, params) {
            let total = challenge.support_weight.saturating_add(challenge.reject_weight);
            if share_bps(challenge.support_weight, total) > params.challenge_success_bps {
                (ChallengeOutcome::Successful, self.success_marks(challenge, round))
            } else {
                (ChallengeOutcome::Failed, self.failure_marks(challenge))
            }
        } else if challenge.deadline.is_passed(now) {
            let penalty = apply_bps(challenge.deposit, params.expired_challenge_penalty_bps);
            let marks = if penalty > 0 {
                vec![Mark {
                    challenge: challenge.id,
                    participant: challenge.challenger.clone(),
                    effect: MarkEffect::Punishment { amount: penalty },
                    reason: MarkReason::ChallengeExpired,
                }]
            } else {
                Vec::new()
            };
            (ChallengeOutcome::Failed, marks)
        } else {
            return Err(ChallengeError::DeadlineNotReached {
                deadline: challenge.deadline,
            });
        };

        challenge.outcome = outcome;
        challenge.marks = marks;
        challenge.resolved = true;
        tracing::info!(
            case = %challenge.case_id,
            challenge = %challenge.id,
            ?outcome,
            support = challenge.support_weight,
            reject = challenge.reject_weight,
            marks = challenge.marks.len(),
            "challenge resolved"
        );
        Ok(outcome)
    }

    fn success_marks(&self, challenge: &Challenge, round: &VotingRound) -> Vec<Mark> {
        let mut marks = vec![Mark {
            challenge: challenge.id,
            participant: challenge.challenger.clone(),
            effect: MarkEffect::Reward {
                weight: challenge.deposit,
            },
            reason: MarkReason::ChallengeSucceeded,
        }];
        marks.extend(
            challenge
                .ballots
                .iter()
                .filter(|b| b.choice == Choice::Support)
                .map(|b| Mark {
                    challenge: challenge.id,
                    participant: b.voter.clone(),
                    effect: MarkEffect::Reward { weight: b.weight },
                    reason: MarkReason::SupportedSuccessfulChallenge,
                }),
        );
        let target_stake = round.ballot(&challenge.target).map(|b| b.stake).unwrap_or(0);
        marks.push(Mark {
            challenge: challenge.id,
            participant: challenge.target.clone(),
            effect: MarkEffect::Punishment {
                amount: target_stake,
            },
            reason: MarkReason::BallotOverturned,
        });
        marks
    }

    fn failure_marks(&self, challenge: &Challenge) -> Vec<Mark> {
        let mut marks = vec![Mark {
            challenge: challenge.id,
            participant: challenge.challenger.clone(),
            effect: MarkEffect::Punishment {
                amount: challenge.deposit,
            },
            reason: MarkReason::ChallengeFailed,
        }];
        for b in &challenge.ballots {
            let (effect, reason) = match b.choice {
                Choice::Reject => (
                    MarkEffect::Reward { weight: b.weight },
                    MarkReason::RejectedFailedChallenge,
                ),
                Choice::Support => (
                    MarkEffect::Punishment { amount: b.stake },
                    MarkReason::SupportedFailedChallenge,
                ),
            };
            marks.push(Mark {
                challenge: challenge.id,
                participant: b.voter.clone(),
                effect,
                reason,
            });
        }
        marks
    }

    /// Close the challenge phase of a case.
    ///
    /// Requires the challenge deadline to have passed. Every pending challenge
    /// is resolved first; if any cannot be resolved yet nothing is changed.
    /// Returns whether the case result was reversed, which happens iff a
    /// successful challenge carried the `Flip` claim.
    pub fn end_challenge_phase(
        &self,
        case: &mut Case,
        round: &VotingRound,
        challenges: &mut [Challenge],
        now: Timestamp,
        params: &CaseParams,
    ) -> Result<bool, ChallengeError> {
        if case.status != CaseStatus::Challenging {
            return Err(ChallengeError::NotChallenging(case.status));
        }
        if let Some(deadline) = case.challenge_deadline {
            if !deadline.is_passed(now) {
                return Err(ChallengeError::DeadlineNotReached { deadline });
            }
        }
        let blocked = challenges
            .iter()
            .filter(|c| !c.resolved && !self.can_resolve(c, now, params))
            .count();
        if blocked > 0 {
            return Err(ChallengeError::ChallengesPending { count: blocked });
        }

        for challenge in challenges.iter_mut().filter(|c| !c.resolved) {
            self.resolve(challenge, round, now, params)?;
        }

        let overturned = challenges.iter().any(Challenge::overturns);
        if overturned {
            let before = case.result;
            case.result = case.result.flipped();
            tracing::warn!(case = %case.id, ?before, after = ?case.result, "case result overturned by challenge");
        }
        Ok(overturned)
    }
}

fn voted_in_any(rounds: &[VotingRound], who: &ParticipantId) -> bool {
    rounds.iter().any(|r| r.has_voted(who))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::slice::from_ref;
    use tribunal_types::{CaseId, CaseResult, RiskTier};
    use tribunal_voting::VotingEngine;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId::new(s)
    }

    fn params() -> CaseParams {
        CaseParams {
            min_challenge_deposit: 100,
            challenge_voting_period_secs: 50,
            ..CaseParams::default()
        }
    }

    /// A case in the challenge phase whose round was voted Reject by v0, v1
    /// and Support by v2.
    fn setup() -> (Case, VotingRound) {
        let params = params();
        let engine = VotingEngine;
        let mut case = Case::new(
            CaseId::new(1),
            pid("alice"),
            pid("acme"),
            RiskTier::Low,
            0,
            Timestamp::new(0),
        );
        let mut round = engine
            .open_round(
                case.id,
                0,
                vec![pid("v0"), pid("v1"), pid("v2")],
                3,
                Timestamp::new(0),
                Timestamp::new(10),
            )
            .unwrap();
        let now = Timestamp::new(1);
        for (v, c) in [("v0", Choice::Reject), ("v1", Choice::Reject), ("v2", Choice::Support)] {
            engine.cast_ballot(&mut round, &pid(v), c, 100, now, &params).unwrap();
        }
        let close = engine.try_close(&mut round, now, &params).unwrap();
        case.status = CaseStatus::Challenging;
        case.result = close.result;
        case.vote_result = close.result;
        case.challenge_deadline = Some(Timestamp::new(100));
        (case, round)
    }

    fn request(challenger: &str, target: &str, claim: ChallengeClaim) -> ChallengeRequest {
        ChallengeRequest {
            challenger: pid(challenger),
            target: pid(target),
            claim,
            deposit: 100,
        }
    }

    fn verifiers() -> Vec<ParticipantId> {
        vec![pid("x0"), pid("x1"), pid("x2")]
    }

    #[test]
    fn submission_rules() {
        let (case, round) = setup();
        let e = ChallengeEngine;
        let p = params();
        let now = Timestamp::new(20);
        let submit = |req: ChallengeRequest, existing: &[Challenge]| {
            e.submit(&case, from_ref(&round), existing, req, verifiers(), now, &p)
        };

        assert!(matches!(
            submit(request("c", "nobody", ChallengeClaim::Flip), &[]),
            Err(ChallengeError::TargetNotVoter(_))
        ));
        assert!(matches!(
            submit(request("v2", "v0", ChallengeClaim::Flip), &[]),
            Err(ChallengeError::ChallengerVoted(_))
        ));
        assert!(matches!(
            submit(request("alice", "v0", ChallengeClaim::Flip), &[]),
            Err(ChallengeError::ChallengerIsParty(_))
        ));
        let mut low = request("c", "v0", ChallengeClaim::Flip);
        low.deposit = 99;
        assert!(matches!(
            submit(low, &[]),
            Err(ChallengeError::DepositTooLow { .. })
        ));

        let first = submit(request("c", "v0", ChallengeClaim::Flip), &[]).unwrap();
        assert_eq!(first.id, ChallengeId::new(1));
        assert_eq!(first.deadline, Timestamp::new(70));
        let existing = vec![first];
        assert!(matches!(
            submit(request("c", "v1", ChallengeClaim::Flip), &existing),
            Err(ChallengeError::AlreadyChallenged(_))
        ));
        // A second challenger on the same case is fine.
        let second = e
            .submit(
                &case,
                from_ref(&round),
                &existing,
                request("d", "v1", ChallengeClaim::Uphold),
                vec![pid("y0")],
                now,
                &p,
            )
            .unwrap();
        assert_eq!(second.id, ChallengeId::new(2));
    }

    #[test]
    fn verifiers_exclude_voters_parties_and_challengers() {
        let (case, round) = setup();
        let e = ChallengeEngine;
        let p = params();
        let now = Timestamp::new(20);
        for bad in ["v1", "acme", "c"] {
            let err = e
                .submit(
                    &case,
                    from_ref(&round),
                    &[],
                    request("c", "v0", ChallengeClaim::Flip),
                    vec![pid("x0"), pid(bad)],
                    now,
                    &p,
                )
                .unwrap_err();
            assert!(matches!(err, ChallengeError::InvalidVerifier(_)), "{bad}");
        }
    }

    #[test]
    fn submission_after_period_rejected() {
        let (case, round) = setup();
        let err = ChallengeEngine
            .submit(
                &case,
                from_ref(&round),
                &[],
                request("c", "v0", ChallengeClaim::Flip),
                verifiers(),
                Timestamp::new(101),
                &params(),
            )
            .unwrap_err();
        assert!(matches!(err, ChallengeError::ChallengePeriodOver { .. }));
    }

    #[test]
    fn one_challenge_vote_per_case() {
        let (case, round) = setup();
        let e = ChallengeEngine;
        let p = params();
        let now = Timestamp::new(20);
        let a = e
            .submit(&case, from_ref(&round), &[], request("c", "v0", ChallengeClaim::Flip), vec![pid("x0"), pid("x1")], now, &p)
            .unwrap();
        let mut all = vec![a];
        let b = e
            .submit(&case, from_ref(&round), &all, request("d", "v1", ChallengeClaim::Flip), vec![pid("x0"), pid("x2")], now, &p)
            .unwrap();
        all.push(b);

        e.cast_ballot(from_ref(&round), &mut all, ChallengeId::new(1), &pid("x0"), Choice::Support, 10, now, &p)
            .unwrap();
        assert!(matches!(
            e.cast_ballot(from_ref(&round), &mut all, ChallengeId::new(2), &pid("x0"), Choice::Support, 10, now, &p),
            Err(ChallengeError::AlreadyVoted(_))
        ));
        assert!(matches!(
            e.cast_ballot(from_ref(&round), &mut all, ChallengeId::new(1), &pid("x2"), Choice::Support, 10, now, &p),
            Err(ChallengeError::NotVerifier(_))
        ));
        assert!(matches!(
            e.cast_ballot(from_ref(&round), &mut all, ChallengeId::new(9), &pid("x2"), Choice::Support, 10, now, &p),
            Err(ChallengeError::UnknownChallenge(_))
        ));
        // Having voted, x0 cannot become a challenger either.
        assert!(matches!(
            e.submit(&case, from_ref(&round), &all, request("x0", "v2", ChallengeClaim::Flip), vec![pid("z")], now, &p),
            Err(ChallengeError::ChallengerVotedOnChallenge(_))
        ));
    }

    #[test]
    fn successful_flip_marks_and_reverses() {
        let (mut case, round) = setup();
        let e = ChallengeEngine;
        let p = params();
        let now = Timestamp::new(20);
        let c = e
            .submit(&case, from_ref(&round), &[], request("c", "v0", ChallengeClaim::Flip), verifiers(), now, &p)
            .unwrap();
        let mut all = vec![c];
        for (v, choice) in [("x0", Choice::Support), ("x1", Choice::Support), ("x2", Choice::Reject)] {
            e.cast_ballot(from_ref(&round), &mut all, ChallengeId::new(1), &pid(v), choice, 100, now, &p)
                .unwrap();
        }
        assert_eq!(e.resolve(&mut all[0], &round, now, &p).unwrap(), ChallengeOutcome::Successful);
        let marks = &all[0].marks;
        assert!(marks.iter().any(|m| m.participant == pid("c") && m.is_reward()));
        assert!(marks.iter().any(|m| m.participant == pid("x0") && m.is_reward()));
        assert!(marks.iter().any(|m| m.participant == pid("v0")
            && m.effect == MarkEffect::Punishment { amount: p.ballot_stake }));
        assert!(!marks.iter().any(|m| m.participant == pid("x2")));

        assert!(matches!(
            e.resolve(&mut all[0], &round, now, &p),
            Err(ChallengeError::AlreadyResolved(_))
        ));
        assert_eq!(all[0].marks.len(), 4);

        assert_eq!(case.result, CaseResult::ComplaintRejected);
        let overturned = e
            .end_challenge_phase(&mut case, &round, &mut all, Timestamp::new(101), &p)
            .unwrap();
        assert!(overturned);
        assert_eq!(case.result, CaseResult::ComplaintUpheld);
        assert_eq!(case.vote_result, CaseResult::ComplaintRejected);
    }

    #[test]
    fn successful_uphold_claim_does_not_reverse() {
        let (mut case, round) = setup();
        let e = ChallengeEngine;
        let p = params();
        let now = Timestamp::new(20);
        let c = e
            .submit(&case, from_ref(&round), &[], request("c", "v0", ChallengeClaim::Uphold), vec![pid("x0")], now, &p)
            .unwrap();
        let mut all = vec![c];
        e.cast_ballot(from_ref(&round), &mut all, ChallengeId::new(1), &pid("x0"), Choice::Support, 1, now, &p)
            .unwrap();
        let overturned = e
            .end_challenge_phase(&mut case, &round, &mut all, Timestamp::new(101), &p)
            .unwrap();
        assert!(!overturned);
        assert_eq!(all[0].outcome, ChallengeOutcome::Successful);
        assert_eq!(case.result, CaseResult::ComplaintRejected);
    }

    #[test]
    fn failed_challenge_marks() {
        let (case, round) = setup();
        let e = ChallengeEngine;
        let p = params();
        let now = Timestamp::new(20);
        let c = e
            .submit(&case, from_ref(&round), &[], request("c", "v0", ChallengeClaim::Flip), verifiers(), now, &p)
            .unwrap();
        let mut all = vec![c];
        for (v, choice) in [("x0", Choice::Reject), ("x1", Choice::Reject), ("x2", Choice::Support)] {
            e.cast_ballot(from_ref(&round), &mut all, ChallengeId::new(1), &pid(v), choice, 100, now, &p)
                .unwrap();
        }
        assert_eq!(e.resolve(&mut all[0], &round, now, &p).unwrap(), ChallengeOutcome::Failed);
        let marks = &all[0].marks;
        let find = |who: &str| marks.iter().find(|m| m.participant == pid(who)).unwrap();
        assert_eq!(find("c").effect, MarkEffect::Punishment { amount: 100 });
        assert_eq!(find("c").reason, MarkReason::ChallengeFailed);
        assert!(find("x0").is_reward());
        assert_eq!(find("x2").reason, MarkReason::SupportedFailedChallenge);
        assert!(!marks.iter().any(|m| m.participant == pid("v0")));
    }

    #[test]
    fn expired_challenge_forfeits_part_of_deposit() {
        let (case, round) = setup();
        let e = ChallengeEngine;
        let p = params();
        let now = Timestamp::new(20);
        let mut c = e
            .submit(&case, from_ref(&round), &[], request("c", "v0", ChallengeClaim::Flip), verifiers(), now, &p)
            .unwrap();
        assert!(matches!(
            e.resolve(&mut c, &round, now, &p),
            Err(ChallengeError::DeadlineNotReached { .. })
        ));
        let after_deadline = c.deadline.plus(1);
        let outcome = e.resolve(&mut c, &round, after_deadline, &p).unwrap();
        assert_eq!(outcome, ChallengeOutcome::Failed);
        assert_eq!(c.marks.len(), 1);
        assert_eq!(c.marks[0].reason, MarkReason::ChallengeExpired);
        assert_eq!(c.marks[0].effect, MarkEffect::Punishment { amount: 50 });
    }

    #[test]
    fn end_phase_waits_for_deadline_and_pending_votes() {
        let (mut case, round) = setup();
        let e = ChallengeEngine;
        let p = params();
        assert!(matches!(
            e.end_challenge_phase(&mut case, &round, &mut [], Timestamp::new(100), &p),
            Err(ChallengeError::DeadlineNotReached { .. })
        ));
        // Submitted just before the phase ends; its own voting runs past it.
        let c = e
            .submit(&case, from_ref(&round), &[], request("c", "v0", ChallengeClaim::Flip), verifiers(), Timestamp::new(99), &p)
            .unwrap();
        let mut all = vec![c];
        assert!(matches!(
            e.end_challenge_phase(&mut case, &round, &mut all, Timestamp::new(101), &p),
            Err(ChallengeError::ChallengesPending { count: 1 })
        ));
        assert!(!all[0].resolved);
        let overturned = e
            .end_challenge_phase(&mut case, &round, &mut all, Timestamp::new(150), &p)
            .unwrap();
        assert!(!overturned);
        assert_eq!(all[0].marks[0].reason, MarkReason::ChallengeExpired);
    }

    #[test]
    fn earlier_round_voters_stay_excluded_after_reopen() {
        let (case, first) = setup();
        let voting = VotingEngine;
        let p = params();
        let mut second = voting
            .open_round(
                case.id,
                1,
                vec![pid("w0"), pid("w1"), pid("w2")],
                3,
                Timestamp::new(11),
                Timestamp::new(30),
            )
            .unwrap();
        for w in ["w0", "w1", "w2"] {
            voting
                .cast_ballot(&mut second, &pid(w), Choice::Reject, 100, Timestamp::new(12), &p)
                .unwrap();
        }
        let rounds = [first, second];
        let e = ChallengeEngine;
        let now = Timestamp::new(20);

        assert!(matches!(
            e.submit(&case, &rounds, &[], request("v0", "w0", ChallengeClaim::Flip), verifiers(), now, &p),
            Err(ChallengeError::ChallengerVoted(_))
        ));
        // Only the deciding round's voters can be targeted.
        assert!(matches!(
            e.submit(&case, &rounds, &[], request("c", "v0", ChallengeClaim::Flip), verifiers(), now, &p),
            Err(ChallengeError::TargetNotVoter(_))
        ));
        let excluded = e.verifier_exclusions(&case, &rounds, &[], &pid("c"));
        assert!(excluded.contains(&pid("v1")));
        assert!(excluded.contains(&pid("w1")));
        assert!(matches!(
            e.submit(&case, &rounds, &[], request("c", "w0", ChallengeClaim::Flip), vec![pid("x0"), pid("v1")], now, &p),
            Err(ChallengeError::InvalidVerifier(_))
        ));

        // A panel built from the deciding round alone still cannot seat v2.
        let c = e
            .submit(&case, &rounds[1..], &[], request("c", "w0", ChallengeClaim::Flip), vec![pid("x0"), pid("v2")], now, &p)
            .unwrap();
        let mut all = vec![c];
        assert!(matches!(
            e.cast_ballot(&rounds, &mut all, ChallengeId::new(1), &pid("v2"), Choice::Support, 10, now, &p),
            Err(ChallengeError::VoterIsCaseVoter(_))
        ));
        e.cast_ballot(&rounds, &mut all, ChallengeId::new(1), &pid("x0"), Choice::Support, 10, now, &p)
            .unwrap();
    }
}
