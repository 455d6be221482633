//! Recording observer: captures every notification for assertions.

use std::sync::Mutex;
use tribunal_case::{CaseEvent, CaseObserver};
use tribunal_settlement::SettlementRecord;
use tribunal_types::{CaseId, CaseResult};

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CaseEvent>>,
    settled: Mutex<Vec<(CaseId, CaseResult, Vec<SettlementRecord>)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CaseEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn settled(&self) -> Vec<(CaseId, CaseResult, Vec<SettlementRecord>)> {
        self.settled.lock().unwrap().clone()
    }
}

impl CaseObserver for RecordingObserver {
    fn on_case_settled(&self, case_id: CaseId, result: CaseResult, records: &[SettlementRecord]) {
        self.settled
            .lock()
            .unwrap()
            .push((case_id, result, records.to_vec()));
    }

    fn on_event(&self, event: &CaseEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
