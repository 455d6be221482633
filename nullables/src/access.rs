//! Nullable access control: permissive by default, with deny lists.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tribunal_case::AccessControl;
use tribunal_types::ParticipantId;

/// Everyone may complain, be named and vote unless denied.
pub struct NullAccessControl {
    denied_complainants: Mutex<HashSet<ParticipantId>>,
    unregistered_respondents: Mutex<HashSet<ParticipantId>>,
    denied_voters: Mutex<HashSet<ParticipantId>>,
    trust: Mutex<HashMap<ParticipantId, u32>>,
    default_trust: u32,
}

impl NullAccessControl {
    pub fn new() -> Self {
        Self::with_default_trust(10)
    }

    pub fn with_default_trust(default_trust: u32) -> Self {
        Self {
            denied_complainants: Mutex::new(HashSet::new()),
            unregistered_respondents: Mutex::new(HashSet::new()),
            denied_voters: Mutex::new(HashSet::new()),
            trust: Mutex::new(HashMap::new()),
            default_trust,
        }
    }

    pub fn deny_complainant(&self, id: &ParticipantId) {
        self.denied_complainants.lock().unwrap().insert(id.clone());
    }

    pub fn unregister_respondent(&self, id: &ParticipantId) {
        self.unregistered_respondents
            .lock()
            .unwrap()
            .insert(id.clone());
    }

    pub fn deny_voter(&self, id: &ParticipantId) {
        self.denied_voters.lock().unwrap().insert(id.clone());
    }

    pub fn set_trust(&self, id: &ParticipantId, score: u32) {
        self.trust.lock().unwrap().insert(id.clone(), score);
    }
}

impl Default for NullAccessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessControl for NullAccessControl {
    fn can_complain(&self, who: &ParticipantId) -> bool {
        !self.denied_complainants.lock().unwrap().contains(who)
    }

    fn is_registered_respondent(&self, who: &ParticipantId) -> bool {
        !self.unregistered_respondents.lock().unwrap().contains(who)
    }

    fn can_vote(&self, who: &ParticipantId) -> bool {
        !self.denied_voters.lock().unwrap().contains(who)
    }

    fn trust_score(&self, who: &ParticipantId) -> u32 {
        self.trust
            .lock()
            .unwrap()
            .get(who)
            .copied()
            .unwrap_or(self.default_trust)
    }
}
