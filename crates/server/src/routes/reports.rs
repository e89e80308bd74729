use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Registered, voted, and remaining voter counts
pub async fn voter_stats(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.coordinator.stats()))
}

/// Reconciled results. `remote` is null when the ledger could not be read.
pub async fn results(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.coordinator.results().await))
}

pub async fn ledger_status(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.coordinator.ledger_status()))
}
