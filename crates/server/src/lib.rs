//! SecureVote Server - HTTP REST API for the SecureVote integrity engine
//!
//! Exposes voter registration, face authentication, and vote casting over
//! HTTP. Clients send face embeddings produced by their own embedder; the
//! server never sees images.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe, including ledger state
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Protected Endpoints (API Key Required)
//!
//! - `POST /api/v1/voters` - Register a voter from `{name, embedding}`
//! - `POST /api/v1/authenticate` - Identify a voter from `{embedding}`
//! - `POST /api/v1/votes` - Cast a vote `{voter_name, candidate_id}`
//! - `GET /api/v1/stats` - Registered, voted, and remaining counts
//! - `GET /api/v1/results` - Local and remote tallies, reconciled
//! - `GET /api/v1/ledger/status` - External ledger configuration and circuit state
//!
//! ## Admin Endpoints (Admin API Key Required)
//!
//! - `DELETE /api/v1/voters/{name}` - Remove a voter; cast votes are kept
//! - `POST /api/v1/authenticate/candidates` - Nearest identities to `{embedding}`, threshold ignored
//!
//! Errors are returned as `{"error": {"code", "message"}}` with 400 for bad
//! input, 409 for conflicts (name taken, duplicate face, already voted), and
//! 500 for storage failures.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server, PrometheusMatchMetrics};
pub use state::ServerState;
