use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::CircuitState;

/// Per-candidate vote counts as reported by the remote ledger.
pub type RemoteTally = BTreeMap<String, u64>;

/// Tri-state result of every gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome<T> {
    Success(T),
    /// Timeout, connectivity, server-side errors, or anything unclassified.
    RecoverableFailure(String),
    /// The remote explicitly refused the call.
    DefinitiveFailure(Rejection),
}

impl<T> GatewayOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, GatewayOutcome::Success(_))
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, GatewayOutcome::RecoverableFailure(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            GatewayOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GatewayOutcome<U> {
        match self {
            GatewayOutcome::Success(value) => GatewayOutcome::Success(f(value)),
            GatewayOutcome::RecoverableFailure(reason) => GatewayOutcome::RecoverableFailure(reason),
            GatewayOutcome::DefinitiveFailure(rejection) => {
                GatewayOutcome::DefinitiveFailure(rejection)
            }
        }
    }

    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            GatewayOutcome::Success(_) => "success",
            GatewayOutcome::RecoverableFailure(_) => "recoverable",
            GatewayOutcome::DefinitiveFailure(Rejection::AlreadyVoted) => "already_voted",
            GatewayOutcome::DefinitiveFailure(Rejection::Rejected(_)) => "rejected",
        }
    }
}

/// Why the remote definitively refused a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    AlreadyVoted,
    Rejected(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::AlreadyVoted => f.write_str("already voted on the remote ledger"),
            Rejection::Rejected(reason) => write!(f, "rejected by the remote ledger: {reason}"),
        }
    }
}

/// Remote acknowledgement of a cast vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastReceipt {
    /// Opaque transaction reference.
    pub tx_ref: String,
    pub block_number: Option<u64>,
}

/// Snapshot of a gateway for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayStatus {
    pub name: String,
    pub configured: bool,
    pub circuit: Option<CircuitState>,
}

/// Errors raised while constructing gateways. Calls themselves never error;
/// they return a [`GatewayOutcome`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid gateway config: {0}")]
    InvalidConfig(String),
    #[error("failed to build gateway client: {0}")]
    Client(String),
}
