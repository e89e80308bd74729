use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use securevote::{CoordinatorError, Embedding};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to register a voter
#[derive(Debug, Deserialize)]
pub struct RegisterVoterRequest {
    pub name: String,
    /// Face embedding produced by the client's embedder
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct RegisterVoterResponse {
    pub name: String,
    pub status: String,
    pub registered_voters: usize,
}

pub(crate) fn parse_embedding(values: Vec<f32>) -> Result<Embedding, CoordinatorError> {
    Embedding::new(values).map_err(CoordinatorError::from)
}

/// Register a voter
///
/// Rejected with 409 when the name is taken or the face already belongs to
/// another voter.
pub async fn register_voter(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<RegisterVoterRequest>,
) -> ServerResult<impl IntoResponse> {
    let outcome = parse_embedding(request.embedding)
        .and_then(|embedding| state.coordinator.register(&request.name, embedding));

    let label = match &outcome {
        Ok(()) => "registered",
        Err(CoordinatorError::NameTaken(_)) => "name_taken",
        Err(CoordinatorError::DuplicateIdentity { .. }) => "duplicate_identity",
        Err(_) => "error",
    };
    metrics::counter!("securevote_registrations_total", "outcome" => label).increment(1);
    outcome?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterVoterResponse {
            name: request.name,
            status: "registered".to_string(),
            registered_voters: state.coordinator.stats().registered,
        }),
    ))
}

/// Remove a voter (admin only). Any vote already cast stays on record.
pub async fn delete_voter(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<impl IntoResponse> {
    state.coordinator.remove_voter(&name)?;
    tracing::info!(voter = %name, "voter removed");
    Ok(StatusCode::NO_CONTENT)
}
