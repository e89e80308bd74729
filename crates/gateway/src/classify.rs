//! Failure classification for remote ledger responses.
//!
//! Only explicit remote signals are definitive. Everything else, including
//! messages this module has never seen, is recoverable.

use crate::types::{GatewayOutcome, Rejection};

/// Classify a failed remote call.
///
/// `status` is the transport status code when one was received. Transient
/// statuses (408, 429, 5xx) are recoverable even if the body mentions a
/// rejection, because the remote did not finish processing the call.
pub fn classify_failure<T>(status: Option<u16>, message: &str) -> GatewayOutcome<T> {
    let lower = message.to_lowercase();
    let reason = if message.trim().is_empty() {
        status
            .map(|code| format!("HTTP {code}"))
            .unwrap_or_else(|| "unknown ledger failure".to_string())
    } else {
        message.to_string()
    };

    if let Some(code) = status {
        if code == 408 || code == 429 || code >= 500 {
            return GatewayOutcome::RecoverableFailure(reason);
        }
    }

    if status == Some(409) || lower.contains("already voted") {
        return GatewayOutcome::DefinitiveFailure(Rejection::AlreadyVoted);
    }

    if matches!(status, Some(400 | 401 | 403 | 404 | 422)) || lower.contains("revert") {
        return GatewayOutcome::DefinitiveFailure(Rejection::Rejected(reason));
    }

    GatewayOutcome::RecoverableFailure(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(status: Option<u16>, message: &str) -> GatewayOutcome<()> {
        classify_failure(status, message)
    }

    #[test]
    fn transport_errors_are_recoverable() {
        assert!(classify(None, "operation timed out").is_recoverable());
        assert!(classify(None, "connection refused").is_recoverable());
        assert!(classify(Some(503), "").is_recoverable());
        assert!(classify(Some(502), "bad gateway").is_recoverable());
        assert!(classify(Some(429), "slow down").is_recoverable());
        assert!(classify(Some(408), "").is_recoverable());
    }

    #[test]
    fn unknown_failures_default_to_recoverable() {
        assert!(classify(None, "contract not initialized").is_recoverable());
        assert!(classify(None, "").is_recoverable());
        assert!(classify(Some(418), "teapot").is_recoverable());
    }

    #[test]
    fn transient_status_wins_over_body_text() {
        assert!(classify(Some(504), "already voted?").is_recoverable());
    }

    #[test]
    fn explicit_already_voted_is_definitive() {
        assert_eq!(
            classify(Some(409), ""),
            GatewayOutcome::DefinitiveFailure(Rejection::AlreadyVoted)
        );
        assert_eq!(
            classify(None, "Already voted on blockchain"),
            GatewayOutcome::DefinitiveFailure(Rejection::AlreadyVoted)
        );
    }

    #[test]
    fn contract_rejections_are_definitive() {
        assert_eq!(
            classify(Some(422), "unknown candidate"),
            GatewayOutcome::DefinitiveFailure(Rejection::Rejected("unknown candidate".into()))
        );
        assert_eq!(
            classify(None, "execution reverted"),
            GatewayOutcome::DefinitiveFailure(Rejection::Rejected("execution reverted".into()))
        );
        assert_eq!(
            classify(Some(401), ""),
            GatewayOutcome::DefinitiveFailure(Rejection::Rejected("HTTP 401".into()))
        );
    }
}
