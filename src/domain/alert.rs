// Alert domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub vessel_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        vessel_id: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            vessel_id: vessel_id.into(),
            kind: kind.into(),
            message: message.into(),
            timestamp,
        }
    }

    /// Critical alerts count towards the fleet-wide alert tile
    pub fn is_critical(&self) -> bool {
        matches!(self.kind.as_str(), "critical" | "battery_low")
    }
}
