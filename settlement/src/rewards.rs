//! Reward pool splitting.

use tribunal_types::{ParticipantId, RewardPolicy};

/// Split `pool` among `recipients` (id, weight) under `policy`.
///
/// Every share is floored; the returned dust is `pool - Σ shares`.
/// Weight-proportional splitting falls back to equal shares when every
/// weight is zero.
pub fn split_rewards(
    pool: u128,
    recipients: &[(ParticipantId, u128)],
    policy: RewardPolicy,
) -> (Vec<(ParticipantId, u128)>, u128) {
    if recipients.is_empty() {
        return (Vec::new(), pool);
    }
    let total_weight = recipients
        .iter()
        .fold(0u128, |acc, (_, w)| acc.saturating_add(*w));

    let shares: Vec<(ParticipantId, u128)> = match policy {
        RewardPolicy::WeightProportional if total_weight > 0 => recipients
            .iter()
            .map(|(id, w)| (id.clone(), mul_div(pool, *w, total_weight)))
            .collect(),
        _ => {
            let each = pool / recipients.len() as u128;
            recipients.iter().map(|(id, _)| (id.clone(), each)).collect()
        }
    };
    let paid = shares.iter().map(|(_, s)| *s).sum::<u128>();
    (shares, pool.saturating_sub(paid))
}

/// `floor(a * b / c)` for `b <= c`. On overflow of the product the result
/// may round further down, never up.
fn mul_div(a: u128, b: u128, c: u128) -> u128 {
    match a.checked_mul(b) {
        Some(p) => p / c,
        None => {
            let whole = (a / c).saturating_mul(b);
            let part = (a % c).checked_mul(b).map_or(0, |p| p / c);
            whole.saturating_add(part)
        }
    }
}
