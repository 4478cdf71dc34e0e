// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::live_session::LiveSession;
use crate::application::weather_service::WeatherService;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::event_source::EventSourceClient;
use crate::infrastructure::open_meteo::OpenMeteoClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    alerts, connection, current_selection, fleet_markers, fleet_rows, fleet_state, fleet_summary,
    health_check, history, history_summary, ingest_event, select_vessel, stream_updates, vessel,
    refresh_weather, vessel_alerts, vessel_analysis, weather,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Create weather provider (infrastructure layer)
    let weather_service = if settings.weather.enabled {
        let client = OpenMeteoClient::new(
            settings.weather.base_url.clone(),
            Duration::from_millis(settings.weather.timeout_ms),
        )?;
        Some(WeatherService::new(Arc::new(client)))
    } else {
        None
    };

    // Create the session (application layer)
    let session = LiveSession::new(settings.session.limits(), weather_service);

    // Feed it from the upstream event stream when one is configured
    match settings.event_source.url.clone() {
        Some(url) => {
            let client = EventSourceClient::new(url, settings.event_source.reconnect_policy());
            tokio::spawn(client.run(session.clone()));
        }
        None => tracing::info!("no event source configured, accepting pushed events only"),
    }

    let state = Arc::new(AppState { session });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/connection", get(connection))
        .route("/fleet", get(fleet_state))
        .route("/fleet/summary", get(fleet_summary))
        .route("/fleet/rows", get(fleet_rows))
        .route("/fleet/markers", get(fleet_markers))
        .route("/selection", get(current_selection))
        .route("/selection/:id", put(select_vessel))
        .route("/history", get(history))
        .route("/history/stats", get(history_summary))
        .route("/alerts", get(alerts))
        .route("/vessels/:id", get(vessel))
        .route("/vessels/:id/alerts", get(vessel_alerts))
        .route("/vessels/:id/analysis", get(vessel_analysis))
        .route("/weather", get(weather))
        .route("/weather/refresh", post(refresh_weather))
        .route("/events", post(ingest_event))
        .route("/stream", get(stream_updates))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = settings
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", settings.server.bind))?;
    tracing::info!("Starting fleet-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
