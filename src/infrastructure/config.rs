use crate::application::session::SessionLimits;
use crate::infrastructure::event_source::ReconnectPolicy;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub event_source: EventSourceSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub weather: WeatherSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventSourceSettings {
    /// Upstream feed; without it events only arrive through `POST /events`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
}

impl Default for EventSourceSettings {
    fn default() -> Self {
        Self {
            url: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_attempts: default_reconnect_attempts(),
        }
    }
}

impl EventSourceSettings {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            delay: Duration::from_millis(self.reconnect_delay_ms),
            max_attempts: self.reconnect_attempts,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            alert_capacity: default_alert_capacity(),
        }
    }
}

impl SessionSettings {
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            history_capacity: self.history_capacity,
            alert_capacity: self.alert_capacity,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_weather_url(),
            timeout_ms: default_weather_timeout_ms(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_reconnect_attempts() -> u32 {
    10
}

fn default_history_capacity() -> usize {
    SessionLimits::default().history_capacity
}

fn default_alert_capacity() -> usize {
    SessionLimits::default().alert_capacity
}

fn default_true() -> bool {
    true
}

fn default_weather_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_weather_timeout_ms() -> u64 {
    5000
}

/// `config/fleet.{toml,...}` when present, overridden by `FLEET_*` variables
/// (`FLEET_EVENT_SOURCE__URL`, `FLEET_SESSION__HISTORY_CAPACITY`, ...)
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/fleet").required(false))
        .add_source(
            config::Environment::with_prefix("FLEET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.server.bind, "0.0.0.0:8080");
        assert_eq!(settings.event_source.url, None);
        assert_eq!(
            settings.event_source.reconnect_policy(),
            ReconnectPolicy::default()
        );
        assert_eq!(settings.session.limits(), SessionLimits::default());
        assert!(settings.weather.enabled);
    }

    #[test]
    fn test_partial_sections() {
        let settings: Settings = toml::from_str(
            r#"
            [event_source]
            url = "http://localhost:3001/events"
            reconnect_attempts = 3

            [session]
            history_capacity = 100

            [weather]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(
            settings.event_source.url.as_deref(),
            Some("http://localhost:3001/events")
        );
        assert_eq!(settings.event_source.reconnect_delay_ms, 1000);
        assert_eq!(settings.event_source.reconnect_attempts, 3);
        assert_eq!(settings.session.history_capacity, 100);
        assert_eq!(settings.session.alert_capacity, 10);
        assert!(!settings.weather.enabled);
    }

    #[test]
    fn test_config_builder_layers() {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[server]\nbind = \"127.0.0.1:9000\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.server.bind, "127.0.0.1:9000");
        assert_eq!(settings.session.history_capacity, 50);
    }
}
