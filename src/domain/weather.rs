// External weather at the displayed location
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub rain: Option<f64>,
    pub wind_speed_10m: Option<f64>,
}

/// Identifies one lookup. Two positions that render the same at 4 decimal
/// places share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LocationKey(String);

impl LocationKey {
    /// Missing, zero, or non-finite coordinates produce no key
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude == 0.0 || longitude == 0.0 {
            return None;
        }
        Some(Self(format!("{:.4},{:.4}", latitude, longitude)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WeatherState {
    Idle,
    Loading { key: LocationKey },
    Ready { key: LocationKey, weather: CurrentWeather },
    Unavailable { key: LocationKey },
}
