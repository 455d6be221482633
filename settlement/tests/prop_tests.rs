use proptest::prelude::*;

use tribunal_ledger::DepositLedger;
use tribunal_settlement::SettlementEngine;
use tribunal_types::{
    Case, CaseId, CaseParams, CaseStatus, Choice, ParticipantId, RewardPolicy, RiskTier, Role,
    Timestamp,
};
use tribunal_voting::VotingEngine;

fn tier() -> impl Strategy<Value = RiskTier> {
    prop_oneof![Just(RiskTier::Low), Just(RiskTier::Medium), Just(RiskTier::High)]
}

proptest! {
    /// Every settlement conserves funds: ledger supply is unchanged, the
    /// summary balances, and no collateral stays frozen for the case.
    #[test]
    fn settlement_conserves_funds(
        tier in tier(),
        votes in prop::collection::vec((any::<bool>(), 0u128..50_000), 3..9),
        reward_share_bps in 0u32..=10_000,
        penalty_bps in 0u32..=10_000,
        proportional in any::<bool>(),
    ) {
        let params = CaseParams {
            reward_share_bps,
            wrong_vote_penalty_bps: penalty_bps,
            reward_policy: if proportional { RewardPolicy::WeightProportional } else { RewardPolicy::FlatEqual },
            ..CaseParams::default()
        };
        let case_id = CaseId::new(9);
        let t0 = Timestamp::new(0);
        let mut ledger = DepositLedger::default();
        let alice = ParticipantId::new("alice");
        let acme = ParticipantId::new("acme");
        ledger.open_account(alice.clone(), Role::Complainant, 0).unwrap();
        ledger.open_account(acme.clone(), Role::Enterprise, 0).unwrap();
        ledger.deposit(&alice, 1_000, t0).unwrap();
        ledger.deposit(&acme, 8_000, t0).unwrap();
        if tier.freezes_respondent() {
            ledger.freeze(case_id, &acme, params.min_enterprise_deposit).unwrap();
        }
        if tier.freezes_complainant() {
            ledger.freeze(case_id, &alice, params.min_complainant_deposit).unwrap();
        }

        let voting = VotingEngine;
        let validators: Vec<ParticipantId> =
            (0..votes.len()).map(|i| ParticipantId::new(format!("v{i}"))).collect();
        let mut round = voting
            .open_round(case_id, 0, validators.clone(), 1, t0, Timestamp::new(10))
            .unwrap();
        for (v, (support, extra)) in validators.iter().zip(&votes) {
            ledger.open_account(v.clone(), Role::Validator, 0).unwrap();
            ledger.deposit(v, params.ballot_stake + extra, t0).unwrap();
            let unfrozen = ledger.unfrozen(v).unwrap();
            let choice = if *support { Choice::Support } else { Choice::Reject };
            voting.cast_ballot(&mut round, v, choice, unfrozen, t0, &params).unwrap();
            ledger.freeze(case_id, v, params.ballot_stake).unwrap();
        }
        let close = voting.try_close(&mut round, t0, &params).unwrap();

        let mut case = Case::new(case_id, alice, acme, tier, 0, t0);
        case.result = close.result;
        case.vote_result = close.result;
        case.status = CaseStatus::Settling;

        let supply = ledger.total_supply();
        let reserve = ledger.reserve();
        let summary = SettlementEngine.settle(&mut case, &round, &[], &mut ledger, &params).unwrap();

        prop_assert_eq!(ledger.total_supply(), supply);
        prop_assert_eq!(
            summary.rewards + summary.reserve_cut + summary.punishments_retained,
            summary.total_pool
        );
        prop_assert_eq!(ledger.reserve(), reserve + summary.reserve_cut + summary.punishments_retained);
        prop_assert!(ledger.locks_for_case(case_id).is_empty());
        prop_assert!(ledger.check_invariants().is_ok());
        prop_assert!(case.settled);
    }
}
