//! Settlement engine.

use crate::error::SettlementError;
use crate::record::{SettlementEffect, SettlementReason, SettlementRecord, SettlementSummary};
use crate::rewards::split_rewards;
use std::collections::{BTreeMap, BTreeSet};
use tribunal_challenge::{Challenge, MarkEffect, MarkReason};
use tribunal_ledger::{DepositLedger, LedgerBatch};
use tribunal_types::{apply_bps, Case, CaseId, CaseParams, CaseStatus, ParticipantId, Role};
use tribunal_voting::{VotingEngine, VotingRound};

/// A punishment to apply, before capping at the case lock.
struct Penalty {
    participant: ParticipantId,
    amount: u128,
    reason: SettlementReason,
}

pub struct SettlementEngine;

impl SettlementEngine {
    /// Settle a case in `Settling`.
    ///
    /// On success the case is marked settled and completed. On any error
    /// neither the case nor the ledger is changed; a second call on a
    /// settled case fails with `AlreadySettled` without touching the ledger.
    pub fn settle(
        &self,
        case: &mut Case,
        round: &VotingRound,
        challenges: &[Challenge],
        ledger: &mut DepositLedger,
        params: &CaseParams,
    ) -> Result<SettlementSummary, SettlementError> {
        if case.settled {
            return Err(SettlementError::AlreadySettled(case.id));
        }
        if case.status != CaseStatus::Settling {
            return Err(SettlementError::NotSettling(case.status));
        }
        let (loser, loser_role) = match case.losing_party() {
            Some(p) if p == &case.complainant => (p.clone(), Role::Complainant),
            Some(p) => (p.clone(), Role::Enterprise),
            None => return Err(SettlementError::Undetermined(case.id)),
        };

        // ── Tags ─────────────────────────────────────────────────────────
        let voting = VotingEngine;
        let mut forfeits = Vec::new(); // failed challenger deposits
        let mut penalties = Vec::new(); // retained by the reserve

        for ballot in voting.losers(round, case.result) {
            penalties.push(Penalty {
                participant: ballot.voter.clone(),
                amount: apply_bps(ballot.stake, params.wrong_vote_penalty_bps),
                reason: SettlementReason::VotedAgainstResult,
            });
        }
        for mark in challenges.iter().flat_map(|c| c.marks.iter()) {
            if let MarkEffect::Punishment { amount } = mark.effect {
                let penalty = Penalty {
                    participant: mark.participant.clone(),
                    amount,
                    reason: SettlementReason::Challenge(mark.reason),
                };
                match mark.reason {
                    MarkReason::ChallengeFailed | MarkReason::ChallengeExpired => {
                        forfeits.push(penalty)
                    }
                    _ => penalties.push(penalty),
                }
            }
        }

        let punished: BTreeSet<ParticipantId> = forfeits
            .iter()
            .chain(penalties.iter())
            .map(|p| p.participant.clone())
            .chain(std::iter::once(loser.clone()))
            .collect();

        let mut recipients: BTreeMap<ParticipantId, (u128, SettlementReason)> = BTreeMap::new();
        for ballot in voting.winners(round, case.result) {
            let entry = recipients
                .entry(ballot.voter.clone())
                .or_insert((0, SettlementReason::VotedWithResult));
            entry.0 = entry.0.saturating_add(ballot.weight);
        }
        for mark in challenges.iter().flat_map(|c| c.marks.iter()) {
            if let MarkEffect::Reward { weight } = mark.effect {
                let entry = recipients
                    .entry(mark.participant.clone())
                    .or_insert((0, SettlementReason::Challenge(mark.reason)));
                entry.0 = entry.0.saturating_add(weight);
            }
        }
        recipients.retain(|id, _| !punished.contains(id));

        // ── Ledger movements ─────────────────────────────────────────────
        let case_id = case.id;
        let min_deposit = params.min_deposit(loser_role);
        let summary = ledger.atomic(|batch| {
            let mut records = Vec::new();

            let lock = batch.account(&loser)?.locked_for(case_id);
            let target = if lock > 0 { lock } else { min_deposit };
            let principal_slashed = batch.slash(case_id, &loser, target)?;
            records.push(SettlementRecord {
                case_id,
                participant: loser.clone(),
                role: loser_role,
                effect: SettlementEffect::Punishment(principal_slashed),
                reason: SettlementReason::LostCase,
            });

            let forfeited = apply_penalties(batch, case_id, &forfeits, &mut records)?;
            let distributable = principal_slashed
                .checked_add(forfeited)
                .ok_or(SettlementError::Overflow)?;
            let reward_pool = apply_bps(distributable, params.reward_share_bps);

            let weighted: Vec<(ParticipantId, u128)> =
                recipients.iter().map(|(id, (w, _))| (id.clone(), *w)).collect();
            let (shares, _dust) = split_rewards(reward_pool, &weighted, params.reward_policy);
            let mut rewards = 0u128;
            for (id, share) in shares {
                batch.distribute(&id, share)?;
                rewards = rewards.checked_add(share).ok_or(SettlementError::Overflow)?;
                let reason = recipients
                    .get(&id)
                    .map(|(_, r)| *r)
                    .unwrap_or(SettlementReason::VotedWithResult);
                records.push(SettlementRecord {
                    case_id,
                    role: batch.account(&id)?.role,
                    participant: id,
                    effect: SettlementEffect::Reward(share),
                    reason,
                });
            }
            let reserve_cut = distributable.saturating_sub(rewards);
            batch.retain(reserve_cut)?;

            let retained = apply_penalties(batch, case_id, &penalties, &mut records)?;
            batch.retain(retained)?;

            let total_pool = distributable
                .checked_add(retained)
                .ok_or(SettlementError::Overflow)?;
            let accounted = rewards
                .checked_add(reserve_cut)
                .and_then(|v| v.checked_add(retained))
                .ok_or(SettlementError::Overflow)?;
            if accounted != total_pool || batch.floating() != 0 {
                tracing::error!(
                    case = %case_id,
                    total_pool,
                    rewards,
                    reserve_cut,
                    retained,
                    floating = batch.floating(),
                    "settlement conservation violated"
                );
                return Err(SettlementError::Conservation {
                    total_pool,
                    rewards,
                    reserve_cut,
                    retained,
                });
            }

            let mut released = 0u128;
            for (id, _) in batch.locked_for_case(case_id) {
                released = released.saturating_add(batch.release(case_id, &id)?);
            }

            for id in recipients.keys() {
                batch.adjust_trust(id, 1)?;
            }
            for id in &punished {
                batch.adjust_trust(id, -1)?;
            }

            Ok::<_, SettlementError>(SettlementSummary {
                case_id,
                result: case.result,
                total_pool,
                distributable,
                reward_pool,
                rewards,
                reserve_cut,
                punishments_retained: retained,
                released,
                records,
            })
        })?;

        case.settled = true;
        case.status = CaseStatus::Completed;
        tracing::info!(
            case = %case.id,
            result = ?case.result,
            total_pool = summary.total_pool,
            rewards = summary.rewards,
            reserve_cut = summary.reserve_cut,
            retained = summary.punishments_retained,
            records = summary.records.len(),
            "case settled"
        );
        Ok(summary)
    }
}

/// Slash each penalty, capped by what the participant still holds for the
/// case. Returns the total slashed; the funds stay in flight for the caller.
fn apply_penalties(
    batch: &mut LedgerBatch<'_>,
    case_id: CaseId,
    penalties: &[Penalty],
    records: &mut Vec<SettlementRecord>,
) -> Result<u128, SettlementError> {
    let mut total = 0u128;
    for p in penalties {
        let row = batch.account(&p.participant)?;
        let role = row.role;
        let capped = p.amount.min(row.locked_for(case_id));
        let slashed = batch.slash(case_id, &p.participant, capped)?;
        if slashed == 0 {
            continue;
        }
        total = total.checked_add(slashed).ok_or(SettlementError::Overflow)?;
        records.push(SettlementRecord {
            case_id,
            participant: p.participant.clone(),
            role,
            effect: SettlementEffect::Punishment(slashed),
            reason: p.reason,
        });
    }
    Ok(total)
}
