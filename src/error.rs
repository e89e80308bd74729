use gateway::GatewayError;
use ledger::LedgerError;
use matcher::MatchError;
use registry::RegistryError;
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

use crate::embedder::EmbedError;

/// Coarse error classes callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad request data. No state changed.
    Input,
    /// Name taken, duplicate face, or already voted. No state changed.
    Conflict,
    /// A durable write failed; the operation did not happen.
    Storage,
    /// Deployment misconfiguration, fatal at startup.
    Configuration,
    Internal,
}

/// Errors surfaced by [`crate::IntegrityCoordinator`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error("no face detected in image")]
    NoFaceDetected,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("invalid request: {0}")]
    InvalidInput(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("'{0}' is not a registered voter")]
    UnknownVoter(String),
    #[error("voter '{0}' not found")]
    NotFound(String),
    #[error("identity '{0}' is already registered")]
    NameTaken(String),
    #[error("face is already registered under '{existing}'")]
    DuplicateIdentity { existing: String, distance: f64 },
    #[error("'{0}' has already voted")]
    AlreadyVoted(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::NoFaceDetected
            | CoordinatorError::InvalidImage(_)
            | CoordinatorError::InvalidInput(_)
            | CoordinatorError::DimensionMismatch { .. }
            | CoordinatorError::UnknownVoter(_)
            | CoordinatorError::NotFound(_) => ErrorKind::Input,
            CoordinatorError::NameTaken(_)
            | CoordinatorError::DuplicateIdentity { .. }
            | CoordinatorError::AlreadyVoted(_) => ErrorKind::Conflict,
            CoordinatorError::Storage(_) => ErrorKind::Storage,
            CoordinatorError::Configuration(_) => ErrorKind::Configuration,
            CoordinatorError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<RegistryError> for CoordinatorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidIdentity(msg) | RegistryError::InvalidEmbedding(msg) => {
                CoordinatorError::InvalidInput(msg)
            }
            RegistryError::DimensionMismatch { expected, actual } => {
                CoordinatorError::DimensionMismatch { expected, actual }
            }
            RegistryError::NameTaken(name) => CoordinatorError::NameTaken(name),
            RegistryError::DuplicateIdentity { existing, distance } => {
                CoordinatorError::DuplicateIdentity { existing, distance }
            }
            RegistryError::NotFound(name) => CoordinatorError::NotFound(name),
            RegistryError::Configuration(msg) => CoordinatorError::Configuration(msg),
            RegistryError::Storage(err) => CoordinatorError::Storage(err),
        }
    }
}

impl From<MatchError> for CoordinatorError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidConfig(msg) => CoordinatorError::Configuration(msg),
            MatchError::DimensionMismatch { expected, actual } => {
                CoordinatorError::DimensionMismatch { expected, actual }
            }
            MatchError::Registry(err) => err.into(),
        }
    }
}

impl From<LedgerError> for CoordinatorError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidInput(msg) => CoordinatorError::InvalidInput(msg),
            LedgerError::AlreadyVoted(name) => CoordinatorError::AlreadyVoted(name),
            LedgerError::Configuration(msg) => CoordinatorError::Configuration(msg),
            LedgerError::Storage(err) => CoordinatorError::Storage(err),
        }
    }
}

impl From<GatewayError> for CoordinatorError {
    fn from(err: GatewayError) -> Self {
        CoordinatorError::Configuration(err.to_string())
    }
}

impl From<EmbedError> for CoordinatorError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::NoFaceDetected => CoordinatorError::NoFaceDetected,
            EmbedError::InvalidImage(msg) => CoordinatorError::InvalidImage(msg),
            EmbedError::Backend(msg) => CoordinatorError::Internal(format!("embedder: {msg}")),
        }
    }
}
