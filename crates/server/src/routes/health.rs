use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use securevote::CircuitState;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "securevote-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime().as_secs(),
    }))
}

/// Readiness check endpoint
///
/// The server accepts requests with an unconfigured or unreachable ledger;
/// votes are then recorded locally. The ledger's state is reported so
/// operators can tell the two apart.
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let coordinator = &state.coordinator;
    let ledger = coordinator.ledger_status();
    let ledger_state = match (ledger.configured, ledger.circuit) {
        (false, _) => "offline",
        (true, Some(CircuitState::Open)) => "circuit_open",
        (true, Some(CircuitState::HalfOpen)) => "recovering",
        (true, Some(CircuitState::Closed) | None) => "ready",
    };

    Ok(Json(json!({
        "status": "ready",
        "service": "securevote-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime().as_secs(),
        "components": {
            "api": "ready",
            "registry": "ready",
            "ledger": ledger_state,
            "embedder": if coordinator.has_embedder() { "ready" } else { "absent" },
        },
        "registered_voters": coordinator.stats().registered,
    })))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state
        .metrics
        .as_ref()
        .filter(|_| state.config.metrics_enabled)
        .ok_or(ServerError::NotFound)?;

    Ok((
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
