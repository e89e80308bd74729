//! Workspace umbrella crate for SecureVote.
//!
//! Wires the face registry, matcher, vote ledger, and ledger gateway into an
//! [`IntegrityCoordinator`] that fixes the order of every registration,
//! authentication, and voting flow.
//!
//! ## Guarantees
//!
//! - No two registrations of the same face succeed, even concurrently.
//! - Authenticating with a stored embedding always returns its owner.
//! - An identity commits at most one vote; a repeat returns `AlreadyVoted`.
//! - An unreachable external ledger never fails a vote. The vote commits
//!   locally with a failed remote status.
//!
//! ## Example
//!
//! ```
//! use securevote::{AuthResult, Embedding, SecureVoteConfig};
//!
//! # tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async {
//! let config = SecureVoteConfig {
//!     embedding_dimension: 3,
//!     ..SecureVoteConfig::default()
//! };
//! let coordinator = config.build().unwrap();
//!
//! let face = Embedding::new(vec![0.1, 0.7, 0.2]).unwrap();
//! coordinator.register("alice", face.clone()).unwrap();
//!
//! let auth = coordinator.authenticate(&face).await.unwrap();
//! assert!(matches!(auth, AuthResult::Authenticated { ref identity, has_voted: false, .. } if identity == "alice"));
//!
//! coordinator.vote("alice", "cand1").await.unwrap();
//! assert_eq!(coordinator.stats().remaining, 0);
//! # });
//! ```

pub mod config;
mod coordinator;
mod embedder;
mod error;

pub use crate::config::{ConfigLoadError, RegistryYamlConfig, SecureVoteConfig, StorageYamlConfig};
pub use crate::coordinator::{AuthResult, IntegrityCoordinator, VoterStats};
pub use crate::embedder::{EmbedError, Embedder};
pub use crate::error::{CoordinatorError, ErrorKind};

pub use gateway::{
    CircuitState, GatewayBackendConfig, GatewayConfig, GatewayOutcome, GatewayStatus, GuardConfig,
    InMemoryLedger, LedgerGateway, OfflineGateway,
};
pub use ledger::{LedgerConfig, RemoteStatus, TallyReport, VoteLedger, VoteRecord};
pub use matcher::{set_match_metrics, MatchConfig, MatchHit, MatchMetrics, Matcher};
pub use registry::{Embedding, EmbeddingRegistry, RegistryConfig};
pub use store::BackendConfig;
