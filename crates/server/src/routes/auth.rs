use super::voters::parse_embedding;
use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use securevote::AuthResult;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub embedding: Vec<f32>,
}

/// Identify the owner of a face embedding.
///
/// No match is a normal outcome (200 with `status: "no_match"`), not an error.
pub async fn authenticate(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<AuthenticateRequest>,
) -> ServerResult<impl IntoResponse> {
    let probe = parse_embedding(request.embedding)?;
    let result = state.coordinator.authenticate(&probe).await?;

    let outcome = match &result {
        AuthResult::Authenticated { .. } => "authenticated",
        AuthResult::NoMatch => "no_match",
    };
    metrics::counter!("securevote_auth_total", "outcome" => outcome).increment(1);

    Ok(Json(result))
}

/// Nearest registered identities to an embedding, threshold ignored.
///
/// Admin only. Lets operators review near misses behind a `no_match`.
pub async fn candidates(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<AuthenticateRequest>,
) -> ServerResult<impl IntoResponse> {
    let probe = parse_embedding(request.embedding)?;
    let candidates = state.coordinator.candidates(&probe)?;
    Ok(Json(json!({ "candidates": candidates })))
}
