use proptest::prelude::*;

use tribunal_types::{quorum_count, CaseId, CaseParams, CaseResult, Choice, ParticipantId, Timestamp};
use tribunal_voting::{VotingEngine, VotingError};

fn validators(n: usize) -> Vec<ParticipantId> {
    (0..n).map(|i| ParticipantId::new(format!("v{i}"))).collect()
}

proptest! {
    /// The result does not depend on the order ballots arrive in.
    #[test]
    fn tally_is_order_independent(
        votes in prop::collection::vec((any::<bool>(), 0u128..1_000_000), 1..12),
        seed in any::<u64>(),
    ) {
        let params = CaseParams::default();
        let engine = VotingEngine;
        let n = votes.len();
        let now = Timestamp::new(1);
        let deadline = Timestamp::new(100);

        let mut forward = engine.open_round(CaseId::new(1), 0, validators(n), 1, now, deadline).unwrap();
        for (i, (support, bal)) in votes.iter().enumerate() {
            let choice = if *support { Choice::Support } else { Choice::Reject };
            engine.cast_ballot(&mut forward, &ParticipantId::new(format!("v{i}")), choice, *bal, now, &params).unwrap();
        }

        let mut order: Vec<usize> = (0..n).collect();
        let rot = (seed as usize) % n;
        order.rotate_left(rot);
        order.reverse();
        let mut shuffled = engine.open_round(CaseId::new(1), 0, validators(n), 1, now, deadline).unwrap();
        for i in order {
            let (support, bal) = votes[i];
            let choice = if support { Choice::Support } else { Choice::Reject };
            engine.cast_ballot(&mut shuffled, &ParticipantId::new(format!("v{i}")), choice, bal, now, &params).unwrap();
        }

        let a = engine.try_close(&mut forward, now, &params).unwrap();
        let b = engine.try_close(&mut shuffled, now, &params).unwrap();
        prop_assert_eq!(a.result, b.result);
        prop_assert!(a.result != CaseResult::Undetermined);
    }

    /// Before the deadline a round closes exactly when ceil(N*Q) ballots are in.
    #[test]
    fn early_close_exactly_at_quorum(n in 1usize..15, quorum_bps in 1u32..=10_000) {
        let params = CaseParams { quorum_bps, ..CaseParams::default() };
        let engine = VotingEngine;
        let now = Timestamp::new(1);
        let need = quorum_count(n as u32, quorum_bps).max(1) as usize;
        let mut round = engine.open_round(CaseId::new(7), 0, validators(n), 1, now, Timestamp::new(50)).unwrap();
        for i in 0..n {
            let mut probe = round.clone();
            let closed = engine.try_close(&mut probe, now, &params);
            if i >= need {
                prop_assert!(closed.is_ok());
                break;
            }
            let not_reached = matches!(closed, Err(VotingError::DeadlineNotReached { .. }));
            prop_assert!(not_reached);
            engine.cast_ballot(&mut round, &ParticipantId::new(format!("v{i}")), Choice::Reject, 1, now, &params).unwrap();
        }
    }
}
