//! # SecureVote Ledger Gateway (`gateway`)
//!
//! ## Purpose
//!
//! `gateway` is the thin adapter between the vote ledger and the external
//! system of record (a contract fronted by some transport). Its single job is
//! to turn whatever the remote does into one of three outcomes:
//!
//! - [`GatewayOutcome::Success`]: the call completed.
//! - [`GatewayOutcome::RecoverableFailure`]: timeout, connectivity, server
//!   errors, an open circuit, or anything not positively identified.
//! - [`GatewayOutcome::DefinitiveFailure`]: the remote explicitly refused, either
//!   because the voter already voted ([`Rejection::AlreadyVoted`]) or because the
//!   contract rejected the call ([`Rejection::Rejected`]).
//!
//! Unknown failures are always recoverable. Treating a timeout as "already
//! voted" would lock a legitimate voter out, so only explicit remote signals
//! reach the definitive branch (see [`classify_failure`]).
//!
//! ## Gateways
//!
//! - [`OfflineGateway`]: no ledger configured; every call is recoverable.
//! - [`InMemoryLedger`]: a simulated contract with availability and latency
//!   controls, used for tests and single-node demos.
//! - [`HttpRelayGateway`]: JSON relay over HTTP.
//! - [`GuardedGateway`]: wraps any of the above with a per-call timeout, a
//!   circuit breaker, and retries for reads. Writes are attempted once.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use gateway::{GatewayOutcome, GuardConfig, GuardedGateway, InMemoryLedger, LedgerGateway};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let ledger = InMemoryLedger::new();
//! let gateway = GuardedGateway::new(Arc::new(ledger.clone()), GuardConfig::default());
//!
//! assert!(gateway.cast_vote("alice", "cand1").await.is_success());
//! assert_eq!(gateway.has_voted("alice").await, GatewayOutcome::Success(true));
//! # });
//! ```

mod classify;
mod config;
mod guarded;
mod memory;
mod offline;
mod relay;
pub mod resilience;
mod types;

use std::time::Duration;

use async_trait::async_trait;

pub use crate::classify::classify_failure;
pub use crate::config::{GatewayBackendConfig, GatewayConfig};
pub use crate::guarded::{GuardConfig, GuardedGateway};
pub use crate::memory::InMemoryLedger;
pub use crate::offline::OfflineGateway;
pub use crate::relay::{HttpRelayGateway, RelayConfig};
pub use crate::resilience::CircuitState;
pub use crate::types::{
    CastReceipt, GatewayError, GatewayOutcome, GatewayStatus, Rejection, RemoteTally,
};

/// Uniform interface over the external vote ledger.
///
/// Implementations classify failures and never retry writes. `has_voted` and
/// `tally_results` must be free of side effects so callers may repeat them.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Short label used in logs and status reports.
    fn name(&self) -> &str;

    /// Whether a real ledger sits behind this gateway.
    fn is_configured(&self) -> bool {
        true
    }

    /// Upper bound on a single call, if the gateway enforces one.
    fn call_timeout(&self) -> Option<Duration> {
        None
    }

    /// Upper bound on one `has_voted` (retries included) followed by one
    /// `cast_vote`, if the gateway enforces one.
    fn max_cast_duration(&self) -> Option<Duration> {
        None
    }

    fn status(&self) -> GatewayStatus {
        GatewayStatus {
            name: self.name().to_string(),
            configured: self.is_configured(),
            circuit: None,
        }
    }

    async fn cast_vote(&self, identity: &str, candidate_id: &str) -> GatewayOutcome<CastReceipt>;

    async fn has_voted(&self, identity: &str) -> GatewayOutcome<bool>;

    async fn tally_results(&self) -> GatewayOutcome<RemoteTally>;
}
