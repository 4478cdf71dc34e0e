// HTTP request handlers
use crate::domain::analysis::{analyze, gauges, history_stats, stability_score, Analysis, Gauges};
use crate::domain::fleet::{map_markers, vessel_rows};
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::infrastructure::update_stream::stream_from_receiver;
use crate::infrastructure::wire::decode_line;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SelectionBody {
    pub vessel_id: Option<String>,
    pub switched: bool,
}

#[derive(Debug, Serialize)]
pub struct VesselAnalysis {
    pub vessel_id: String,
    pub analysis: Analysis,
    pub stability_score: u32,
    pub gauges: Gauges,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest record for every vessel, ordered by id
pub async fn fleet_state(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let fleet = state.session.read(|s| s.current_fleet_state()).await;
    match json_response(&fleet, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Feed connectivity, including whether reconnection was abandoned
pub async fn connection(State(state): State<Arc<AppState>>) -> Response {
    Json(state.session.read(|s| s.connectivity()).await).into_response()
}

pub async fn fleet_summary(State(state): State<Arc<AppState>>) -> Response {
    Json(state.session.read(|s| s.summary()).await).into_response()
}

pub async fn fleet_rows(State(state): State<Arc<AppState>>) -> Response {
    let rows = state
        .session
        .read(|s| vessel_rows(s.fleet_view(), s.current_selection().as_deref()))
        .await;
    Json(rows).into_response()
}

pub async fn fleet_markers(State(state): State<Arc<AppState>>) -> Response {
    let markers = state
        .session
        .read(|s| map_markers(s.fleet_view(), s.current_selection().as_deref()))
        .await;
    Json(markers).into_response()
}

pub async fn current_selection(State(state): State<Arc<AppState>>) -> Response {
    let vessel_id = state.session.read(|s| s.current_selection()).await;
    Json(SelectionBody {
        vessel_id,
        switched: false,
    })
    .into_response()
}

/// Operator selection; only vessels already seen can be selected
pub async fn select_vessel(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let known = state.session.read(|s| s.vessel(&id).is_some()).await;
    if !known {
        return (StatusCode::NOT_FOUND, format!("unknown vessel {}", id)).into_response();
    }

    let switched = state.session.select(&id).await;
    Json(SelectionBody {
        vessel_id: Some(id),
        switched,
    })
    .into_response()
}

pub async fn history(State(state): State<Arc<AppState>>) -> Response {
    Json(state.session.read(|s| s.current_history()).await).into_response()
}

pub async fn history_summary(State(state): State<Arc<AppState>>) -> Response {
    let stats = state
        .session
        .read(|s| history_stats(&s.current_history()))
        .await;
    Json(stats).into_response()
}

pub async fn alerts(State(state): State<Arc<AppState>>) -> Response {
    Json(state.session.read(|s| s.current_alerts()).await).into_response()
}

pub async fn vessel(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match state.session.read(|s| s.vessel(&id)).await {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn vessel_alerts(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    Json(state.session.read(|s| s.alerts_for(&id)).await).into_response()
}

pub async fn vessel_analysis(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(record) = state.session.read(|s| s.vessel(&id)).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    Json(VesselAnalysis {
        vessel_id: record.vessel_id.clone(),
        analysis: analyze(&record),
        stability_score: stability_score(&record),
        gauges: gauges(&record),
    })
    .into_response()
}

pub async fn weather(State(state): State<Arc<AppState>>) -> Response {
    Json(state.session.weather().await).into_response()
}

/// Re-run the lookup for the displayed location; 202 when one was started
pub async fn refresh_weather(State(state): State<Arc<AppState>>) -> Response {
    let started = state.session.refresh_weather_now().await;
    let status = if started {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    (status, Json(state.session.weather().await)).into_response()
}

/// Push ingestion of a single event envelope
pub async fn ingest_event(State(state): State<Arc<AppState>>, body: String) -> Response {
    let event = match decode_line(&body, chrono::Utc::now()) {
        Ok(Some(event)) => event,
        Ok(None) => return (StatusCode::BAD_REQUEST, "empty event").into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "rejected pushed event");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match state.session.dispatch(event).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "dropped pushed event");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

/// Live feed of session updates (progressive rendering)
pub async fn stream_updates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_receiver(state.session.subscribe())
}
