use crate::error::ServerError;
use crate::state::ServerState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Identifier attached to every request, readable from handler extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Key that authenticated the request.
#[derive(Debug, Clone)]
pub struct ApiKey(pub String);

fn extract_api_key(request: &Request) -> Option<String> {
    request
        .headers()
        .get("x-api-key")
        .or_else(|| request.headers().get(AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s).to_string())
}

/// API Key authentication middleware
pub async fn api_key_auth(
    State(state): State<Arc<ServerState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(key) = extract_api_key(&request) else {
        return Err(ServerError::Authentication(
            "API key required. Provide it in 'X-API-Key' or 'Authorization: Bearer <key>' header"
                .to_string(),
        ));
    };

    if !state.config.is_api_key(&key) {
        return Err(ServerError::Authentication("Invalid API key".to_string()));
    }

    if !state.check_rate_limit(&key) {
        tracing::warn!("rate limit exceeded");
        return Err(ServerError::RateLimitExceeded);
    }

    request.extensions_mut().insert(ApiKey(key));
    Ok(next.run(request).await)
}

/// Admin gate. Runs after [`api_key_auth`], so the key is already known valid.
pub async fn require_admin(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let is_admin = request
        .extensions()
        .get::<ApiKey>()
        .is_some_and(|ApiKey(key)| state.config.is_admin_key(key));

    if !is_admin {
        return Err(ServerError::Forbidden(
            "admin API key required".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|RequestId(id)| id.clone())
        .unwrap_or_default();

    tracing::debug!(
        method = %method,
        uri = %uri,
        request_id = %request_id,
        "Request started"
    );

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "Request completed"
    );

    metrics::histogram!("securevote_http_request_duration_seconds", "status" => status.as_u16().to_string())
        .record(duration.as_secs_f64());

    response
}
