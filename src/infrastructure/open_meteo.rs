// Open-Meteo weather provider implementation
use crate::application::weather_provider::{WeatherError, WeatherProvider};
use crate::domain::weather::CurrentWeather;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,rain,wind_speed_10m";

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: Option<CurrentWeather>,
}

impl OpenMeteoClient {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build weather HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_forecast_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/v1/forecast?latitude={}&longitude={}&current={}&timezone=auto",
            self.base_url,
            latitude,
            longitude,
            urlencoding::encode(CURRENT_FIELDS)
        )
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<CurrentWeather, WeatherError> {
        let url = self.build_forecast_url(latitude, longitude);
        tracing::debug!("Requesting weather: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status()));
        }

        let data = response.json::<ForecastResponse>().await?;
        data.current.ok_or(WeatherError::MissingCurrent)
    }
}
