use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use securevote::{
    EmbeddingRegistry, InMemoryLedger, IntegrityCoordinator, Matcher, RegistryConfig, VoteLedger,
};
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

const USER_KEY: &str = "user-key";
const ADMIN_KEY: &str = "admin-key";

fn test_state(remote: &InMemoryLedger) -> ServerState {
    let mut config = ServerConfig {
        rate_limit_per_minute: 1_000,
        ..ServerConfig::default()
    };
    config.api_keys.insert(USER_KEY.to_string());
    config.admin_api_keys.insert(ADMIN_KEY.to_string());

    let registry = EmbeddingRegistry::in_memory(RegistryConfig::new(3)).unwrap();
    let ledger = VoteLedger::in_memory(Arc::new(remote.clone())).unwrap();
    let coordinator = IntegrityCoordinator::new(registry, Matcher::default(), ledger);
    ServerState::new(config, coordinator)
}

fn test_router(remote: &InMemoryLedger) -> Router {
    build_router(Arc::new(test_state(remote)))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, name: &str, embedding: [f32; 3]) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/v1/voters",
        Some(USER_KEY),
        Some(json!({ "name": name, "embedding": embedding })),
    )
    .await
}

#[tokio::test]
async fn health_is_public() {
    let app = test_router(&InMemoryLedger::new());
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn readiness_reports_ledger_state() {
    let app = test_router(&InMemoryLedger::new());
    let (status, body) = send(&app, "GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["components"]["ledger"], "ready");
    assert_eq!(body["components"]["embedder"], "absent");
}

#[tokio::test]
async fn protected_routes_require_a_key() {
    let app = test_router(&InMemoryLedger::new());

    let (status, body) = send(&app, "GET", "/api/v1/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_FAILED");

    let (status, _) = send(&app, "GET", "/api/v1/stats", Some("wrong"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/v1/stats", Some(USER_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_authenticate_vote_flow() {
    let remote = InMemoryLedger::new();
    let app = test_router(&remote);

    let (status, body) = register(&app, "alice", [0.3, 0.5, 0.8]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["registered_voters"], 1);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/authenticate",
        Some(USER_KEY),
        Some(json!({ "embedding": [0.3, 0.5, 0.8] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "authenticated");
    assert_eq!(body["identity"], "alice");
    assert_eq!(body["has_voted"], false);

    let vote = json!({ "voter_name": "alice", "candidate_id": "cand1" });
    let (status, body) = send(&app, "POST", "/api/v1/votes", Some(USER_KEY), Some(vote.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["candidate_id"], "cand1");
    assert_eq!(body["remote_status"], "succeeded");
    assert_eq!(remote.vote_of("alice").as_deref(), Some("cand1"));

    let (status, body) = send(&app, "POST", "/api/v1/votes", Some(USER_KEY), Some(vote)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_VOTED");

    let (_, body) = send(&app, "GET", "/api/v1/stats", Some(USER_KEY), None).await;
    assert_eq!(body, json!({ "registered": 1, "voted": 1, "remaining": 0 }));

    let (_, body) = send(&app, "GET", "/api/v1/results", Some(USER_KEY), None).await;
    assert_eq!(body["counts"]["cand1"], 1);
    assert_eq!(body["mismatched"], json!([]));
}

#[tokio::test]
async fn unknown_face_is_not_an_error() {
    let app = test_router(&InMemoryLedger::new());
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/authenticate",
        Some(USER_KEY),
        Some(json!({ "embedding": [1.0, 0.0, 0.0] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_match");
}

#[tokio::test]
async fn registration_conflicts_are_409() {
    let app = test_router(&InMemoryLedger::new());
    register(&app, "alice", [1.0, 0.0, 0.0]).await;

    let (status, body) = register(&app, "alice", [0.0, 1.0, 0.0]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NAME_TAKEN");

    let (status, body) = register(&app, "mallory", [1.0, 0.01, 0.0]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_IDENTITY");
}

#[tokio::test]
async fn bad_embeddings_are_400() {
    let app = test_router(&InMemoryLedger::new());

    let (status, body) = register(&app, "alice", [0.0, 0.0, 0.0]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/voters",
        Some(USER_KEY),
        Some(json!({ "name": "bob", "embedding": [1.0, 0.0] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DIMENSION_MISMATCH");
}

#[tokio::test]
async fn voting_requires_registration() {
    let app = test_router(&InMemoryLedger::new());
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/votes",
        Some(USER_KEY),
        Some(json!({ "voter_name": "ghost", "candidate_id": "cand1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNKNOWN_VOTER");
}

#[tokio::test]
async fn unreachable_ledger_still_records_the_vote() {
    let remote = InMemoryLedger::new();
    remote.set_available(false);
    let app = test_router(&remote);
    register(&app, "alice", [1.0, 0.0, 0.0]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/votes",
        Some(USER_KEY),
        Some(json!({ "voter_name": "alice", "candidate_id": "cand1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["remote_status"], "failed");

    let (_, body) = send(&app, "GET", "/api/v1/results", Some(USER_KEY), None).await;
    assert_eq!(body["counts"]["cand1"], 1);
    assert_eq!(body["remote"], Value::Null);
}

#[tokio::test]
async fn voter_removal_needs_an_admin_key() {
    let app = test_router(&InMemoryLedger::new());
    register(&app, "alice", [1.0, 0.0, 0.0]).await;

    let (status, body) = send(&app, "DELETE", "/api/v1/voters/alice", Some(USER_KEY), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = send(&app, "DELETE", "/api/v1/voters/alice", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "DELETE", "/api/v1/voters/alice", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "VOTER_NOT_FOUND");
}

#[tokio::test]
async fn candidate_lookup_is_admin_only() {
    let app = test_router(&InMemoryLedger::new());
    register(&app, "alice", [1.0, 0.0, 0.0]).await;
    register(&app, "bob", [0.0, 1.0, 0.0]).await;
    let body = json!({ "embedding": [0.2, 1.0, 0.0] });

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/authenticate/candidates",
        Some(USER_KEY),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/authenticate/candidates",
        Some(ADMIN_KEY),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0]["identity"], "bob");
    assert_eq!(candidates[1]["identity"], "alice");
}

#[tokio::test]
async fn ledger_status_is_exposed() {
    let app = test_router(&InMemoryLedger::new());
    let (status, body) = send(&app, "GET", "/api/v1/ledger/status", Some(USER_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], true);
}

#[tokio::test]
async fn rate_limit_applies_per_key() {
    let mut config = ServerConfig {
        rate_limit_per_minute: 1,
        ..ServerConfig::default()
    };
    config.api_keys.insert(USER_KEY.to_string());
    let registry = EmbeddingRegistry::in_memory(RegistryConfig::new(3)).unwrap();
    let ledger = VoteLedger::in_memory(Arc::new(InMemoryLedger::new())).unwrap();
    let state = ServerState::new(
        config,
        IntegrityCoordinator::new(registry, Matcher::default(), ledger),
    );
    let app = build_router(Arc::new(state));

    let (status, _) = send(&app, "GET", "/api/v1/stats", Some(USER_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "GET", "/api/v1/stats", Some(USER_KEY), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn metrics_endpoint_renders_prometheus_text() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let state = test_state(&InMemoryLedger::new()).with_metrics(handle);
    let app = build_router(Arc::new(state));

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn metrics_are_hidden_without_a_recorder() {
    let app = test_router(&InMemoryLedger::new());
    let (status, _) = send(&app, "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_routes_and_request_ids() {
    let app = test_router(&InMemoryLedger::new());
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/nope")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["x-request-id"], "req-42");
}
