//! API route handlers
//!
//! - `health`: liveness, readiness, and Prometheus metrics
//! - `voters`: registration and admin removal
//! - `auth`: face authentication
//! - `votes`: vote casting
//! - `reports`: stats, results, and ledger status

pub mod auth;
pub mod health;
pub mod reports;
pub mod voters;
pub mod votes;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Root endpoint (GET /), no authentication required.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "SecureVote Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/voters",
            "/api/v1/authenticate",
            "/api/v1/authenticate/candidates",
            "/api/v1/votes",
            "/api/v1/stats",
            "/api/v1/results",
            "/api/v1/ledger/status",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
