use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::resilience::{retry_recoverable, CircuitBreaker, CircuitBreakerConfig, RetryConfig};
use crate::types::{CastReceipt, GatewayOutcome, GatewayStatus, RemoteTally};
use crate::LedgerGateway;

/// Timeout, breaker, and retry policy applied by [`GuardedGateway`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "GuardConfig::default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "GuardConfig::default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "GuardConfig::default_reset_timeout_secs")]
    pub reset_timeout_secs: u64,
    /// Retries for `has_voted` and `tally_results`. Writes are never retried.
    #[serde(default = "GuardConfig::default_read_retries")]
    pub read_retries: u32,
    #[serde(default = "GuardConfig::default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl GuardConfig {
    fn default_call_timeout_ms() -> u64 {
        10_000
    }

    fn default_failure_threshold() -> u32 {
        5
    }

    fn default_reset_timeout_secs() -> u64 {
        30
    }

    fn default_read_retries() -> u32 {
        2
    }

    fn default_retry_base_delay_ms() -> u64 {
        100
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    fn breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::default()
            .with_failure_threshold(self.failure_threshold)
            .with_reset_timeout(Duration::from_secs(self.reset_timeout_secs))
    }

    fn retry(&self) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(self.read_retries)
            .with_base_delay(Duration::from_millis(self.retry_base_delay_ms))
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: Self::default_call_timeout_ms(),
            failure_threshold: Self::default_failure_threshold(),
            reset_timeout_secs: Self::default_reset_timeout_secs(),
            read_retries: Self::default_read_retries(),
            retry_base_delay_ms: Self::default_retry_base_delay_ms(),
        }
    }
}

/// Wraps a gateway with a bounded per-call timeout, a circuit breaker, and
/// retries on reads.
///
/// A call that exceeds the timeout is reported as recoverable. Definitive
/// failures count as a healthy remote for the breaker, since the remote
/// answered.
pub struct GuardedGateway {
    inner: Arc<dyn LedgerGateway>,
    cfg: GuardConfig,
    breaker: CircuitBreaker,
    retry: RetryConfig,
}

impl GuardedGateway {
    pub fn new(inner: Arc<dyn LedgerGateway>, cfg: GuardConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(cfg.breaker()),
            retry: cfg.retry(),
            inner,
            cfg,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn guarded<T, F, Fut>(&self, op: &'static str, call: F) -> GatewayOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayOutcome<T>>,
    {
        if !self.breaker.allow_request() {
            return GatewayOutcome::RecoverableFailure(format!(
                "{} circuit open, {op} skipped",
                self.inner.name()
            ));
        }

        let timeout = self.cfg.call_timeout();
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(outcome) => outcome,
            Err(_) => GatewayOutcome::RecoverableFailure(format!(
                "{op} timed out after {}ms",
                timeout.as_millis()
            )),
        };

        match &outcome {
            GatewayOutcome::RecoverableFailure(reason) => {
                self.breaker.record_failure();
                tracing::warn!(gateway = self.inner.name(), op, %reason, "ledger call failed");
            }
            _ => self.breaker.record_success(),
        }
        outcome
    }
}

#[async_trait]
impl LedgerGateway for GuardedGateway {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    fn call_timeout(&self) -> Option<Duration> {
        Some(self.cfg.call_timeout())
    }

    /// `(read_retries + 1)` timed-out reads, their backoff, and one timed-out write.
    fn max_cast_duration(&self) -> Option<Duration> {
        let calls = self.cfg.read_retries.saturating_add(2);
        Some(
            self.cfg
                .call_timeout()
                .saturating_mul(calls)
                .saturating_add(self.retry.max_total_delay()),
        )
    }

    fn status(&self) -> GatewayStatus {
        GatewayStatus {
            circuit: Some(self.breaker.current_state()),
            ..self.inner.status()
        }
    }

    async fn cast_vote(&self, identity: &str, candidate_id: &str) -> GatewayOutcome<CastReceipt> {
        self.guarded("cast_vote", move || self.inner.cast_vote(identity, candidate_id))
            .await
    }

    async fn has_voted(&self, identity: &str) -> GatewayOutcome<bool> {
        retry_recoverable(&self.retry, move |_| {
            self.guarded("has_voted", move || self.inner.has_voted(identity))
        })
        .await
    }

    async fn tally_results(&self) -> GatewayOutcome<RemoteTally> {
        retry_recoverable(&self.retry, move |_| {
            self.guarded("tally_results", move || self.inner.tally_results())
        })
        .await
    }
}
