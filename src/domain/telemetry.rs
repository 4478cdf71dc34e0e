// Telemetry data domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GPS fix reported by a vessel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub satellites: Option<u32>,
}

impl Location {
    /// Both coordinates present and finite
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub voltage: Option<f64>,
    pub percentage: Option<f64>,
}

/// 3-axis accelerometer sample in m/s²
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub accel_x: Option<f64>,
    pub accel_y: Option<f64>,
    pub accel_z: Option<f64>,
}

impl Motion {
    pub fn magnitude(&self) -> f64 {
        let x = self.accel_x.unwrap_or(0.0);
        let y = self.accel_y.unwrap_or(0.0);
        let z = self.accel_z.unwrap_or(0.0);
        (x * x + y * y + z * z).sqrt()
    }
}

/// Canonical sensor readings, regardless of which upstream shape delivered them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub rain_status: Option<String>,
    pub battery: Option<Battery>,
    pub motion: Option<Motion>,
}

impl SensorReadings {
    pub fn battery_percentage(&self) -> Option<f64> {
        self.battery.as_ref().and_then(|b| b.percentage)
    }

    pub fn battery_voltage(&self) -> Option<f64> {
        self.battery.as_ref().and_then(|b| b.voltage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatus {
    #[serde(default = "NetworkStatus::default_status")]
    pub status: String,
    #[serde(default = "NetworkStatus::default_signal")]
    pub signal_strength: f64,
    #[serde(default)]
    pub buffered_packets: u64,
}

impl NetworkStatus {
    pub const OFFLINE: &'static str = "OFFLINE";

    fn default_status() -> String {
        "ONLINE".to_string()
    }

    fn default_signal() -> f64 {
        100.0
    }

    pub fn is_offline(&self) -> bool {
        self.status == Self::OFFLINE
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self {
            status: Self::default_status(),
            signal_strength: Self::default_signal(),
            buffered_packets: 0,
        }
    }
}

/// One snapshot from one vessel. Immutable once received; a newer record for
/// the same vessel replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub vessel_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub location: Option<Location>,
    pub sensors: SensorReadings,
    pub network: Option<NetworkStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<serde_json::Value>,
}

impl TelemetryRecord {
    pub fn new(vessel_id: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            vessel_id: vessel_id.into(),
            timestamp: None,
            received_at,
            location: None,
            sensors: SensorReadings::default(),
            network: None,
            engine: None,
            safety: None,
            ai: None,
        }
    }

    /// Origination time when reported, receipt time otherwise.
    /// Records are kept in arrival order; this is never used to reorder them.
    pub fn display_time(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or(self.received_at)
    }

    pub fn speed(&self) -> f64 {
        self.location.as_ref().and_then(|l| l.speed).unwrap_or(0.0)
    }

    pub fn network_or_default(&self) -> NetworkStatus {
        self.network.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_reject_non_finite() {
        let loc = Location {
            latitude: Some(f64::NAN),
            longitude: Some(10.0),
            ..Default::default()
        };
        assert_eq!(loc.coordinates(), None);

        let loc = Location {
            latitude: Some(13.08),
            longitude: Some(80.27),
            ..Default::default()
        };
        assert_eq!(loc.coordinates(), Some((13.08, 80.27)));

        assert_eq!(Location::default().coordinates(), None);
    }

    #[test]
    fn test_display_time_falls_back_to_receipt() {
        let received = Utc::now();
        let mut record = TelemetryRecord::new("V1", received);
        assert_eq!(record.display_time(), received);

        let reported = received - chrono::Duration::seconds(30);
        record.timestamp = Some(reported);
        assert_eq!(record.display_time(), reported);
    }

    #[test]
    fn test_network_defaults() {
        let record = TelemetryRecord::new("V1", Utc::now());
        let network = record.network_or_default();
        assert_eq!(network.status, "ONLINE");
        assert_eq!(network.signal_strength, 100.0);
        assert_eq!(network.buffered_packets, 0);
        assert!(!network.is_offline());

        let partial: NetworkStatus = serde_json::from_str(r#"{"status":"OFFLINE"}"#).unwrap();
        assert!(partial.is_offline());
        assert_eq!(partial.signal_strength, 100.0);
    }

    #[test]
    fn test_motion_magnitude() {
        let motion = Motion {
            accel_x: Some(3.0),
            accel_y: Some(4.0),
            accel_z: None,
        };
        assert_eq!(motion.magnitude(), 5.0);
    }
}
