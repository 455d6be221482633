//! Nullable selection: deterministic panels for testing.

use std::collections::HashSet;
use tribunal_case::RandomSelector;
use tribunal_types::ParticipantId;

/// Picks the first `count` eligible participants in pool order, ignoring
/// the seed. Pools come sorted by id, so tests can predict every panel.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSelector;

impl NullSelector {
    fn first(
        pool: &[ParticipantId],
        count: usize,
        exclude: &HashSet<ParticipantId>,
    ) -> Vec<ParticipantId> {
        let mut seen = HashSet::new();
        pool.iter()
            .filter(|id| !exclude.contains(*id) && seen.insert(*id))
            .take(count)
            .cloned()
            .collect()
    }
}

impl RandomSelector for NullSelector {
    fn select_validators(
        &self,
        pool: &[ParticipantId],
        count: usize,
        _seed: &[u8],
        exclude: &HashSet<ParticipantId>,
    ) -> Vec<ParticipantId> {
        Self::first(pool, count, exclude)
    }

    fn select_verifiers(
        &self,
        pool: &[ParticipantId],
        count: usize,
        _seed: &[u8],
        exclude: &HashSet<ParticipantId>,
    ) -> Vec<ParticipantId> {
        Self::first(pool, count, exclude)
    }
}
