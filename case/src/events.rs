//! Case events and observers.
//!
//! The engine buffers events as operations succeed; the service drains them
//! after releasing its lock and hands them to every registered observer.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use tribunal_settlement::SettlementRecord;
use tribunal_types::{
    CaseId, CaseResult, ChallengeId, ChallengeOutcome, ParticipantId, RiskTier, Timestamp,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// A principal no longer held the minimum when deposits were locked.
    DepositsUnavailable,
    /// Cancelled by an explicit call.
    Requested,
}

/// Events emitted by the case engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CaseEvent {
    CaseFiled {
        case_id: CaseId,
        complainant: ParticipantId,
        respondent: ParticipantId,
        risk_tier: RiskTier,
    },
    DepositsLocked {
        case_id: CaseId,
    },
    CaseCancelled {
        case_id: CaseId,
        reason: CancelReason,
    },
    VotingOpened {
        case_id: CaseId,
        round: u32,
        validators: Vec<ParticipantId>,
        deadline: Timestamp,
    },
    BallotCast {
        case_id: CaseId,
        voter: ParticipantId,
    },
    VotingClosed {
        case_id: CaseId,
        result: CaseResult,
        quorum_met: bool,
    },
    /// Quorum failed at the deadline; the case needs a reopen or a cancel.
    ReviewRequired {
        case_id: CaseId,
    },
    ChallengeSubmitted {
        case_id: CaseId,
        challenge_id: ChallengeId,
        challenger: ParticipantId,
        target: ParticipantId,
    },
    ChallengeResolved {
        case_id: CaseId,
        challenge_id: ChallengeId,
        outcome: ChallengeOutcome,
    },
    ChallengePhaseEnded {
        case_id: CaseId,
        overturned: bool,
        result: CaseResult,
    },
    CaseSettled {
        case_id: CaseId,
        result: CaseResult,
        records: Vec<SettlementRecord>,
    },
}

impl CaseEvent {
    pub fn case_id(&self) -> CaseId {
        match self {
            Self::CaseFiled { case_id, .. }
            | Self::DepositsLocked { case_id }
            | Self::CaseCancelled { case_id, .. }
            | Self::VotingOpened { case_id, .. }
            | Self::BallotCast { case_id, .. }
            | Self::VotingClosed { case_id, .. }
            | Self::ReviewRequired { case_id }
            | Self::ChallengeSubmitted { case_id, .. }
            | Self::ChallengeResolved { case_id, .. }
            | Self::ChallengePhaseEnded { case_id, .. }
            | Self::CaseSettled { case_id, .. } => *case_id,
        }
    }
}

/// Receives case notifications. Called outside the engine lock.
pub trait CaseObserver: Send + Sync {
    fn on_case_settled(&self, case_id: CaseId, result: CaseResult, records: &[SettlementRecord]);

    fn on_event(&self, _event: &CaseEvent) {}
}

/// Writes every event as one JSON line, for an append-only audit trail.
pub struct JsonLinesObserver<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> CaseObserver for JsonLinesObserver<W> {
    fn on_case_settled(&self, _case_id: CaseId, _result: CaseResult, _records: &[SettlementRecord]) {}

    fn on_event(&self, event: &CaseEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(case = %event.case_id(), error = %e, "failed to encode case event");
                return;
            }
        };
        // A writer poisoned by a panicking thread is still usable for appends.
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}") {
            tracing::warn!(case = %event.case_id(), error = %e, "failed to write case event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_observer_writes_one_line_per_event() {
        let obs = JsonLinesObserver::new(Vec::new());
        obs.on_event(&CaseEvent::DepositsLocked {
            case_id: CaseId::new(4),
        });
        obs.on_event(&CaseEvent::ReviewRequired {
            case_id: CaseId::new(4),
        });
        let text = String::from_utf8(obs.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "deposits_locked");
        assert_eq!(first["case_id"], 4);
    }

    #[test]
    fn poisoned_writer_still_records_events() {
        let obs = std::sync::Arc::new(JsonLinesObserver::new(Vec::new()));
        let holder = obs.clone();
        let joined = std::thread::spawn(move || {
            let _guard = holder.out.lock().unwrap();
            panic!("writer holder panicked");
        })
        .join();
        assert!(joined.is_err());
        assert!(obs.out.is_poisoned());

        obs.on_event(&CaseEvent::DepositsLocked {
            case_id: CaseId::new(7),
        });
        let obs = std::sync::Arc::try_unwrap(obs).ok().unwrap();
        let text = String::from_utf8(obs.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
