//! HTTP surface: trigger ingress from the gateway relay, plus read-only
//! statistics, metrics and health endpoints.

use crate::bot::Bot;
use crate::events::{TriggerEvent, TriggerHandler};
use crate::security::verify_relay_secret;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

type ApiError = (StatusCode, Json<Value>);

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    bot: Arc<Bot>,
    relay_secret: Arc<str>,
    started: Instant,
}

impl AppState {
    pub fn new(bot: Arc<Bot>, relay_secret: impl Into<Arc<str>>) -> Self {
        Self {
            bot,
            relay_secret: relay_secret.into(),
            started: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(receive_event))
        .route("/stats", get(global_stats))
        .route("/stats/:server_id", get(server_stats))
        .route("/stats/:server_id/reset", post(reset_stats))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn check_secret(headers: &HeaderMap, state: &AppState) -> Result<(), ApiError> {
    if verify_relay_secret(headers, &state.relay_secret) {
        Ok(())
    } else {
        warn!("Rejected request with a missing or wrong relay secret");
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid relay secret" })),
        ))
    }
}

/// `POST /events`: one trigger forwarded by the relay. The body is only
/// parsed once the secret checks out.
async fn receive_event(
    headers: HeaderMap,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    check_secret(&headers, &state)?;

    let event: TriggerEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!("Malformed trigger event: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("malformed event: {}", e) })),
        )
    })?;

    let outcome = state.bot.handle(event).await;
    Ok(Json(json!(outcome)))
}

/// `GET /stats`: totals across every server.
async fn global_stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.bot.statistics().global_summary()))
}

/// `GET /stats/:server_id`
async fn server_stats(
    Path(server_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    match state.bot.statistics().server_summary(&server_id) {
        Some(summary) => Ok(Json(json!(summary))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no translations recorded for this server" })),
        )),
    }
}

/// `POST /stats/:server_id/reset`
async fn reset_stats(
    Path(server_id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    check_secret(&headers, &state)?;

    match state.bot.statistics().reset(&server_id).await {
        Ok(existed) => Ok(Json(json!({ "server_id": server_id, "reset": existed }))),
        Err(e) => {
            error!("Failed to reset statistics for server {}: {}", server_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "statistics could not be saved" })),
            ))
        }
    }
}

/// `GET /metrics`
async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.bot.metrics().report()))
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.started.elapsed().as_secs(),
        "timestamp": Utc::now().to_rfc3339(),
        "preferences": state.bot.preferences().len(),
    }))
}
