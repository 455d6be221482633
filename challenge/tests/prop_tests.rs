use proptest::prelude::*;

use tribunal_challenge::{ChallengeEngine, ChallengeRequest, MarkEffect};
use tribunal_types::{
    share_bps, Case, CaseId, CaseParams, CaseStatus, ChallengeClaim, ChallengeId,
    ChallengeOutcome, Choice, ParticipantId, RiskTier, Timestamp,
};
use tribunal_voting::VotingEngine;

fn pid(s: &str) -> ParticipantId {
    ParticipantId::new(s)
}

proptest! {
    /// With full turnout the outcome follows the support share and nobody is
    /// both rewarded and punished by one challenge.
    #[test]
    fn resolution_follows_support_share(
        votes in prop::collection::vec((any::<bool>(), 1u128..10_000), 1..8),
        claim_flip in any::<bool>(),
    ) {
        let params = CaseParams { min_challenge_deposit: 10, ..CaseParams::default() };
        let voting = VotingEngine;
        let engine = ChallengeEngine;
        let now = Timestamp::new(1);

        let mut case = Case::new(CaseId::new(3), pid("alice"), pid("acme"), RiskTier::Low, 0, now);
        let mut round = voting
            .open_round(case.id, 0, vec![pid("v0"), pid("v1"), pid("v2")], 3, now, Timestamp::new(5))
            .unwrap();
        for v in ["v0", "v1", "v2"] {
            voting.cast_ballot(&mut round, &pid(v), Choice::Support, 10, now, &params).unwrap();
        }
        case.result = voting.try_close(&mut round, now, &params).unwrap().result;
        case.status = CaseStatus::Challenging;
        case.challenge_deadline = Some(Timestamp::new(100));

        let verifiers: Vec<ParticipantId> =
            (0..votes.len()).map(|i| ParticipantId::new(format!("x{i}"))).collect();
        let claim = if claim_flip { ChallengeClaim::Flip } else { ChallengeClaim::Uphold };
        let request = ChallengeRequest { challenger: pid("c"), target: pid("v1"), claim, deposit: 10 };
        let challenge = engine.submit(&case, std::slice::from_ref(&round), &[], request, verifiers.clone(), now, &params).unwrap();
        let mut all = vec![challenge];

        let (mut support, mut reject) = (0u128, 0u128);
        for (i, (yes, balance)) in votes.iter().enumerate() {
            let choice = if *yes { Choice::Support } else { Choice::Reject };
            let b = engine
                .cast_ballot(std::slice::from_ref(&round), &mut all, ChallengeId::new(1), &verifiers[i], choice, *balance, now, &params)
                .unwrap();
            if *yes { support += b.weight } else { reject += b.weight }
        }

        let outcome = engine.resolve(&mut all[0], &round, now, &params).unwrap();
        let expect_success = share_bps(support, support + reject) > params.challenge_success_bps;
        prop_assert_eq!(outcome == ChallengeOutcome::Successful, expect_success);

        let marks = &all[0].marks;
        for m in marks {
            let both = marks.iter().any(|o| o.participant == m.participant
                && matches!(o.effect, MarkEffect::Reward { .. }) != matches!(m.effect, MarkEffect::Reward { .. }));
            prop_assert!(!both);
        }
        let target_punished = marks.iter().any(|m| m.participant == pid("v1") && m.is_punishment());
        prop_assert_eq!(target_punished, expect_success);
        prop_assert_eq!(all[0].overturns(), expect_success && claim_flip);
    }
}
