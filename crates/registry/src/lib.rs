//! # SecureVote Face Registry
//!
//! Keyed store of identity → face embedding that enforces one identity per
//! face at write time.
//!
//! ## Guarantees
//!
//! - **Unique names**: an identity key is inserted at most once and never
//!   overwritten; a second insert under the same key is [`RegistryError::NameTaken`].
//! - **Unique faces**: an embedding whose cosine distance to any stored
//!   embedding is below the duplicate threshold is rejected with
//!   [`RegistryError::DuplicateIdentity`], whatever name it arrives under.
//! - **Atomic check-then-insert**: both checks and the durable write run under
//!   one registry-wide mutex, so two concurrent registrations of the same face
//!   cannot both succeed.
//! - **Snapshots**: readers take an `Arc<RegistrySnapshot>` that is replaced,
//!   never mutated, so a scan in flight never sees a half-written insert and
//!   never blocks a writer.
//!
//! ## Example
//!
//! ```
//! use registry::{Embedding, EmbeddingRegistry, RegistryConfig, RegistryError};
//!
//! let registry = EmbeddingRegistry::in_memory(RegistryConfig::new(2)).unwrap();
//! let face = Embedding::new(vec![1.0, 0.0]).unwrap();
//! registry.try_insert("alice", face.clone()).unwrap();
//!
//! // Same face, new name: rejected as a duplicate identity.
//! let err = registry.try_insert("bob", face).unwrap_err();
//! assert!(matches!(err, RegistryError::DuplicateIdentity { ref existing, .. } if existing == "alice"));
//! ```

mod embedding;
mod registry;

pub use embedding::{cosine_distance, similarity_score, validate_identity, Embedding};
pub use registry::{
    EmbeddingRegistry, Neighbor, RegistryConfig, RegistrySnapshot, DEFAULT_DUPLICATE_THRESHOLD,
    REGISTRY_SCHEMA_VERSION, REGISTRY_TABLE,
};

use store::StoreError;
use thiserror::Error;

/// Errors produced by the registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("identity '{0}' is already registered")]
    NameTaken(String),
    #[error("face is already registered under '{existing}'")]
    DuplicateIdentity { existing: String, distance: f64 },
    #[error("identity '{0}' not found")]
    NotFound(String),
    #[error("registry configuration error: {0}")]
    Configuration(String),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
