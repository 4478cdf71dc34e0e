// Alert log - rolling most-recent-first feed of triggered alerts
use crate::domain::alert::Alert;
use std::collections::VecDeque;

pub const DEFAULT_ALERT_CAPACITY: usize = 10;

/// No dedup and no acknowledgement: repeats are kept as separate entries
#[derive(Debug)]
pub struct AlertLog {
    capacity: usize,
    alerts: VecDeque<Alert>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            alerts: VecDeque::with_capacity(capacity),
        }
    }

    pub fn on_alert(&mut self, alert: Alert) {
        self.alerts.push_front(alert);
        self.alerts.truncate(self.capacity);
    }

    /// Most recent first
    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    pub fn for_vessel(&self, vessel_id: &str) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| a.vessel_id == vessel_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}
