// Provider trait for external weather lookups
use crate::domain::weather::CurrentWeather;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("weather service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("weather response had no current conditions")]
    MissingCurrent,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions at a coordinate
    async fn current(&self, latitude: f64, longitude: f64) -> Result<CurrentWeather, WeatherError>;
}
