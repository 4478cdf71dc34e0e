// Wire codec - event envelopes and per-source record shapes
use crate::application::session::SessionEvent;
use crate::domain::alert::Alert;
use crate::domain::telemetry::{
    Battery, Location, Motion, NetworkStatus, SensorReadings, TelemetryRecord,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed event envelope: {0}")]
    Json(#[from] serde_json::Error),
}

/// `{"event": "<name>", "data": {...}}`
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WireEvent {
    #[serde(rename = "connect")]
    Connect,
    #[serde(rename = "disconnect")]
    Disconnect,
    #[serde(rename = "fleet:update", alias = "fleet_update")]
    FleetUpdate(RawTelemetry),
    #[serde(rename = "telemetry:update", alias = "telemetry_update")]
    TelemetryUpdate(RawTelemetry),
    #[serde(rename = "alert:triggered", alias = "alert_triggered")]
    AlertTriggered(RawAlert),
}

impl WireEvent {
    pub fn into_session_event(self, received_at: DateTime<Utc>) -> SessionEvent {
        match self {
            WireEvent::Connect => SessionEvent::Connected,
            WireEvent::Disconnect => SessionEvent::Disconnected,
            WireEvent::FleetUpdate(raw) => SessionEvent::FleetUpdate(raw.into_record(received_at)),
            WireEvent::TelemetryUpdate(raw) => {
                SessionEvent::TelemetryUpdate(raw.into_record(received_at))
            }
            WireEvent::AlertTriggered(raw) => SessionEvent::AlertTriggered(raw.into_alert(received_at)),
        }
    }
}

/// Decode one line of the upstream feed. Blank lines are keep-alives.
pub fn decode_line(line: &str, received_at: DateTime<Utc>) -> Result<Option<SessionEvent>, WireError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let event: WireEvent = serde_json::from_str(line)?;
    Ok(Some(event.into_session_event(received_at)))
}

/// Superset of both upstream shapes: the flat prototype shape carries
/// `sensors.*`, the simulator shape groups readings under `environment`,
/// `engine` and `safety`.
#[derive(Debug, Default, Deserialize)]
pub struct RawTelemetry {
    #[serde(default, alias = "boat_id")]
    pub vessel_id: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<RawLocation>,
    #[serde(default, deserialize_with = "lenient")]
    pub sensors: Option<RawSensors>,
    #[serde(default, deserialize_with = "lenient")]
    pub environment: Option<RawEnvironment>,
    #[serde(default, deserialize_with = "lenient")]
    pub network: Option<NetworkStatus>,
    #[serde(default)]
    pub engine: Option<Value>,
    #[serde(default)]
    pub safety: Option<Value>,
    #[serde(default)]
    pub ai: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawLocation {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub altitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub satellites: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSensors {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rain_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub battery: Option<RawBattery>,
    #[serde(default, deserialize_with = "lenient")]
    pub motion: Option<RawMotion>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawBattery {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub voltage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawMotion {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub accel_x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub accel_y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub accel_z: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawEnvironment {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ambient_temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rain_status: Option<String>,
}

impl RawTelemetry {
    /// Normalize into the canonical record. Flat readings win over grouped ones.
    pub fn into_record(self, received_at: DateTime<Utc>) -> TelemetryRecord {
        let sensors = self.sensors.unwrap_or_default();
        let environment = self.environment.unwrap_or_default();

        TelemetryRecord {
            vessel_id: self.vessel_id,
            timestamp: self.timestamp,
            received_at,
            location: self.location.map(|l| Location {
                latitude: l.latitude,
                longitude: l.longitude,
                altitude: l.altitude,
                speed: l.speed,
                satellites: l.satellites.filter(|s| *s >= 0.0).map(|s| s as u32),
            }),
            sensors: SensorReadings {
                temperature: sensors.temperature.or(environment.ambient_temp),
                humidity: sensors.humidity,
                rain_status: sensors.rain_status.or(environment.rain_status),
                battery: sensors.battery.map(|b| Battery {
                    voltage: b.voltage,
                    percentage: b.percentage,
                }),
                motion: sensors.motion.map(|m| Motion {
                    accel_x: m.accel_x,
                    accel_y: m.accel_y,
                    accel_z: m.accel_z,
                }),
            },
            network: self.network,
            engine: self.engine,
            safety: self.safety,
            ai: self.ai,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawAlert {
    #[serde(default, alias = "boat_id")]
    pub vessel_id: String,
    #[serde(default, rename = "type", alias = "severity", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawAlert {
    pub fn into_alert(self, received_at: DateTime<Utc>) -> Alert {
        Alert {
            vessel_id: self.vessel_id,
            kind: self.kind.unwrap_or_else(|| "unknown".to_string()),
            message: self.message.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or(received_at),
        }
    }
}

/// Any value that does not fit the expected shape reads as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    // Derived structs also accept sequences positionally; a group must be an object
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

/// Numbers may arrive as JSON numbers or numeric strings
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// RFC 3339 strings or epoch milliseconds; anything else falls back to receipt time
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    })
}
