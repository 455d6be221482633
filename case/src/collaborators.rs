//! External collaborators consumed by the case engine.
//!
//! Registration, risk scoring and randomness live outside this crate. The
//! engine only sees these traits; tests plug in the nullables.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::collections::HashSet;
use tribunal_types::{CaseId, ParticipantId, RiskTier};

type Blake2b256 = Blake2b<U32>;

/// Role registry and trust source.
pub trait AccessControl: Send + Sync {
    /// Whether `who` may file complaints.
    fn can_complain(&self, who: &ParticipantId) -> bool;

    /// Whether `who` is an enterprise that can be named as respondent.
    fn is_registered_respondent(&self, who: &ParticipantId) -> bool;

    /// Whether `who` may vote on cases and challenges.
    fn can_vote(&self, who: &ParticipantId) -> bool;

    /// Initial trust score for a newly registered participant.
    fn trust_score(&self, who: &ParticipantId) -> u32;
}

/// Maps a complaint to a risk tier.
pub trait RiskAssessment: Send + Sync {
    fn assess_risk(
        &self,
        respondent: &ParticipantId,
        description: &str,
        evidence_signal: u32,
    ) -> RiskTier;
}

/// Picks validators and challenge verifiers from an eligible pool.
///
/// Implementations must be deterministic in `seed` and must never return
/// an excluded or duplicate participant. They may return fewer than `count`.
pub trait RandomSelector: Send + Sync {
    fn select_validators(
        &self,
        pool: &[ParticipantId],
        count: usize,
        seed: &[u8],
        exclude: &HashSet<ParticipantId>,
    ) -> Vec<ParticipantId>;

    fn select_verifiers(
        &self,
        pool: &[ParticipantId],
        count: usize,
        seed: &[u8],
        exclude: &HashSet<ParticipantId>,
    ) -> Vec<ParticipantId>;
}

/// Deterministic seed for a selection: `Hash(case ‖ round ‖ purpose)`.
pub fn selection_seed(case: CaseId, round: u32, purpose: &str) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(case.to_be_bytes());
    hasher.update(round.to_be_bytes());
    hasher.update(purpose.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Scores every eligible participant with `Hash(seed ‖ id)` and picks the
/// lowest scores. Anyone can recompute a selection from the seed.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashSelector;

impl HashSelector {
    fn score(seed: &[u8], domain: &[u8], id: &ParticipantId) -> [u8; 32] {
        let mut hasher = Blake2b256::new();
        hasher.update(domain);
        hasher.update(seed);
        hasher.update(id.as_str().as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    fn rank(
        pool: &[ParticipantId],
        count: usize,
        seed: &[u8],
        domain: &[u8],
        exclude: &HashSet<ParticipantId>,
    ) -> Vec<ParticipantId> {
        let mut seen = HashSet::new();
        let mut scored: Vec<([u8; 32], &ParticipantId)> = pool
            .iter()
            .filter(|id| !exclude.contains(*id) && seen.insert(*id))
            .map(|id| (Self::score(seed, domain, id), id))
            .collect();
        scored.sort();
        scored.truncate(count);
        scored.into_iter().map(|(_, id)| id.clone()).collect()
    }
}

impl RandomSelector for HashSelector {
    fn select_validators(
        &self,
        pool: &[ParticipantId],
        count: usize,
        seed: &[u8],
        exclude: &HashSet<ParticipantId>,
    ) -> Vec<ParticipantId> {
        Self::rank(pool, count, seed, b"validators", exclude)
    }

    fn select_verifiers(
        &self,
        pool: &[ParticipantId],
        count: usize,
        seed: &[u8],
        exclude: &HashSet<ParticipantId>,
    ) -> Vec<ParticipantId> {
        Self::rank(pool, count, seed, b"verifiers", exclude)
    }
}
