//! Nullable risk assessment: a fixed tier with per-respondent overrides.

use std::collections::HashMap;
use std::sync::Mutex;
use tribunal_case::RiskAssessment;
use tribunal_types::{ParticipantId, RiskTier};

pub struct NullRiskAssessment {
    default_tier: Mutex<RiskTier>,
    overrides: Mutex<HashMap<ParticipantId, RiskTier>>,
}

impl NullRiskAssessment {
    /// Assess every complaint as `tier`.
    pub fn fixed(tier: RiskTier) -> Self {
        Self {
            default_tier: Mutex::new(tier),
            overrides: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_default(&self, tier: RiskTier) {
        *self.default_tier.lock().unwrap() = tier;
    }

    /// Assess complaints against `respondent` as `tier`.
    pub fn set_tier(&self, respondent: &ParticipantId, tier: RiskTier) {
        self.overrides
            .lock()
            .unwrap()
            .insert(respondent.clone(), tier);
    }
}

impl RiskAssessment for NullRiskAssessment {
    fn assess_risk(&self, respondent: &ParticipantId, _description: &str, _evidence: u32) -> RiskTier {
        self.overrides
            .lock()
            .unwrap()
            .get(respondent)
            .copied()
            .unwrap_or(*self.default_tier.lock().unwrap())
    }
}
