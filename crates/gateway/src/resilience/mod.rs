//! Resilience patterns for remote ledger calls: circuit breaking and retries.
//!
//! The breaker stops hammering a ledger that keeps failing; retries smooth
//! over transient hiccups on read calls.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{retry_recoverable, RetryConfig};
