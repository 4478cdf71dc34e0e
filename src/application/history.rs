// History buffer - bounded window of records for the selected vessel
use crate::domain::telemetry::TelemetryRecord;
use std::collections::VecDeque;

/// Records kept for charting the selected vessel
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// One shared buffer rather than one per vessel, so memory stays flat as the
/// fleet grows. Switching vessels drops whatever was collected.
#[derive(Debug)]
pub struct HistoryBuffer {
    capacity: usize,
    records: VecDeque<TelemetryRecord>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Append when the record belongs to the selected vessel, otherwise drop it.
    /// Returns whether the record was kept.
    pub fn on_record(&mut self, record: &TelemetryRecord, selected: Option<&str>) -> bool {
        if selected != Some(record.vessel_id.as_str()) {
            return false;
        }
        self.push(record.clone());
        true
    }

    fn push(&mut self, record: TelemetryRecord) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Oldest first
    pub fn snapshot(&self) -> Vec<TelemetryRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
