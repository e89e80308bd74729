//! Retry with exponential backoff for idempotent ledger reads.
//!
//! Only [`GatewayOutcome::RecoverableFailure`] is retried. Success and
//! definitive failures return immediately.

use std::future::Future;
use std::time::Duration;

use crate::types::GatewayOutcome;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay, doubled per attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Add 0-50% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Longest total sleep across all retries, jitter included.
    pub fn max_total_delay(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| {
                let delay = capped_delay_ms(self, attempt);
                let jitter = if self.jitter { delay / 2 } else { 0 };
                Duration::from_millis(delay.saturating_add(jitter))
            })
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Run `operation` until it stops failing recoverably or retries run out.
///
/// The attempt number (starting at 0) is passed to `operation`.
pub async fn retry_recoverable<T, F, Fut>(config: &RetryConfig, mut operation: F) -> GatewayOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = GatewayOutcome<T>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            GatewayOutcome::RecoverableFailure(reason) if attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, %reason, "retrying ledger read");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}

fn capped_delay_ms(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.base_delay.as_millis() as u64;
    let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
    exponential.min(config.max_delay.as_millis() as u64)
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let delay = capped_delay_ms(config, attempt);

    if config.jitter {
        let jitter = fastrand::u64(0..=delay / 2);
        Duration::from_millis(delay + jitter)
    } else {
        Duration::from_millis(delay)
    }
}
