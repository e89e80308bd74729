use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use securevote::CoordinatorError;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub voter_name: String,
    pub candidate_id: String,
}

/// Cast a vote
///
/// Responds 201 with the vote record. `remote_status` tells whether the
/// external ledger accepted the vote; a local-only record is still a vote.
pub async fn cast_vote(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CastVoteRequest>,
) -> ServerResult<impl IntoResponse> {
    let outcome = state
        .coordinator
        .vote(&request.voter_name, &request.candidate_id)
        .await;

    let label = match &outcome {
        Ok(record) => record.remote_status.as_str(),
        Err(CoordinatorError::AlreadyVoted(_)) => "already_voted",
        Err(_) => "error",
    };
    metrics::counter!("securevote_votes_total", "remote_status" => label).increment(1);

    let record = outcome?;
    Ok((StatusCode::CREATED, Json(record)))
}
