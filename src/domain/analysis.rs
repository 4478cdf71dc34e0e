// Derived metrics - stateless functions over records and history snapshots
use super::telemetry::TelemetryRecord;
use serde::Serialize;

/// Assumed spacing between history entries, in seconds. The feed cadence is
/// not measured, so every stat built on it is an estimate.
pub const ASSUMED_SAMPLE_INTERVAL_SECS: f64 = 2.0;

/// Nominal gravity magnitude for a vessel at rest, m/s²
pub const REFERENCE_MAGNITUDE: f64 = 9.8;

/// Score points lost per m/s² of deviation from the reference magnitude
pub const STABILITY_SENSITIVITY: f64 = 5.0;

const RAIN_FREE_STATES: [&str; 2] = ["NO WATER", "DRY"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub samples: usize,
    pub average_speed: f64,
    pub distance_estimate: f64,
    pub operating_minutes: u64,
    pub battery_trend: f64,
}

pub fn history_stats(history: &[TelemetryRecord]) -> HistoryStats {
    let samples = history.len();
    if samples == 0 {
        return HistoryStats {
            samples,
            average_speed: 0.0,
            distance_estimate: 0.0,
            operating_minutes: 0,
            battery_trend: 0.0,
        };
    }

    let average_speed = history.iter().map(TelemetryRecord::speed).sum::<f64>() / samples as f64;
    let elapsed_secs = samples as f64 * ASSUMED_SAMPLE_INTERVAL_SECS;
    let distance_estimate = average_speed * elapsed_secs / 3600.0;
    let operating_minutes = (elapsed_secs / 60.0).floor() as u64;

    let battery_trend = match (history.first(), history.last()) {
        (Some(first), Some(last)) if samples > 1 => {
            last.sensors.battery_percentage().unwrap_or(0.0)
                - first.sensors.battery_percentage().unwrap_or(0.0)
        }
        _ => 0.0,
    };

    HistoryStats {
        samples,
        average_speed,
        distance_estimate,
        operating_minutes,
        battery_trend,
    }
}

/// Stability index in [0, 100]. A record without motion data scores 100.
pub fn stability_score(record: &TelemetryRecord) -> u32 {
    let Some(motion) = record.sensors.motion.as_ref() else {
        return 100;
    };
    let deviation = (motion.magnitude() - REFERENCE_MAGNITUDE).abs();
    let score = (100.0 - deviation * STABILITY_SENSITIVITY).clamp(0.0, 100.0);
    if score.is_nan() { 0 } else { score.round() as u32 }
}

/// Readings the insight rules look at, with absent values already defaulted
#[derive(Debug, Clone, PartialEq)]
pub struct InsightInputs {
    pub humidity: f64,
    pub rain_status: String,
    pub voltage: f64,
    pub accel_z: f64,
}

impl InsightInputs {
    pub fn from_record(record: &TelemetryRecord) -> Self {
        let sensors = &record.sensors;
        Self {
            humidity: sensors.humidity.unwrap_or(0.0),
            rain_status: sensors
                .rain_status
                .clone()
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            voltage: sensors.battery_voltage().unwrap_or(0.0),
            accel_z: sensors
                .motion
                .as_ref()
                .and_then(|m| m.accel_z)
                .unwrap_or(0.0),
        }
    }
}

/// One row of the insight table
pub struct InsightRule {
    pub id: &'static str,
    pub applies: fn(&InsightInputs) -> bool,
    pub penalty: u32,
    pub anomaly: bool,
    pub message: &'static str,
}

/// Evaluated top to bottom. Moisture is split into two rows where only the
/// first match of the pair may fire.
pub const INSIGHT_RULES: &[InsightRule] = &[
    InsightRule {
        id: "moisture_critical",
        applies: |i| i.humidity > 85.0,
        penalty: 30,
        anomaly: true,
        message: "CRITICAL: High internal moisture (Possible Leak!)",
    },
    InsightRule {
        id: "moisture_warning",
        applies: |i| i.humidity > 70.0 && i.humidity <= 85.0,
        penalty: 10,
        anomaly: false,
        message: "Warning: High humidity levels.",
    },
    InsightRule {
        id: "battery_voltage",
        applies: |i| i.voltage > 0.0 && i.voltage < 3.3,
        penalty: 5,
        anomaly: false,
        message: "Low Battery Voltage - Recharge Required.",
    },
    InsightRule {
        id: "stability",
        applies: |i| i.accel_z.abs() > 1.5,
        penalty: 15,
        anomaly: false,
        message: "Rough seas or instability detected.",
    },
    InsightRule {
        id: "rain",
        applies: |i| !RAIN_FREE_STATES.contains(&i.rain_status.as_str()),
        penalty: 0,
        anomaly: false,
        message: "Rain detected on-board.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyCode {
    Safe,
    Warning,
    Critical,
}

impl SafetyCode {
    pub fn from_score(score: u32) -> Self {
        if score > 80 {
            SafetyCode::Safe
        } else if score > 50 {
            SafetyCode::Warning
        } else {
            SafetyCode::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub insights: Vec<String>,
    pub safety_score: u32,
    pub safety_code: SafetyCode,
    pub anomaly_count: u32,
    pub maintenance: &'static str,
}

pub fn analyze(record: &TelemetryRecord) -> Analysis {
    evaluate_rules(&InsightInputs::from_record(record), INSIGHT_RULES)
}

pub fn evaluate_rules(inputs: &InsightInputs, rules: &[InsightRule]) -> Analysis {
    let mut insights = Vec::new();
    let mut score: u32 = 100;
    let mut anomaly_count = 0;

    for rule in rules {
        if !(rule.applies)(inputs) {
            continue;
        }
        tracing::trace!(rule = rule.id, "insight rule fired");
        insights.push(rule.message.to_string());
        score = score.saturating_sub(rule.penalty);
        if rule.anomaly {
            anomaly_count += 1;
        }
    }

    Analysis {
        insights,
        safety_score: score,
        safety_code: SafetyCode::from_score(score),
        anomaly_count,
        maintenance: if anomaly_count > 0 { "Required" } else { "Good" },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeLevel {
    Normal,
    Warning,
    Danger,
}

/// Colour bands for the detail cards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gauges {
    pub temperature: Option<GaugeLevel>,
    pub humidity: GaugeLevel,
    pub voltage: Option<GaugeLevel>,
}

pub fn gauges(record: &TelemetryRecord) -> Gauges {
    let sensors = &record.sensors;
    let temperature = sensors.temperature.map(|t| {
        if t > 90.0 {
            GaugeLevel::Danger
        } else if t > 75.0 {
            GaugeLevel::Warning
        } else {
            GaugeLevel::Normal
        }
    });
    let humidity = if sensors.humidity.unwrap_or(0.0) > 80.0 {
        GaugeLevel::Danger
    } else {
        GaugeLevel::Normal
    };
    let voltage = sensors.battery_voltage().map(|v| {
        if v < 3.3 {
            GaugeLevel::Danger
        } else {
            GaugeLevel::Normal
        }
    });

    Gauges {
        temperature,
        humidity,
        voltage,
    }
}
