//! # SecureVote Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` maps a probe face embedding to a registered identity. It runs a
//! linear scan over an immutable [`registry::RegistrySnapshot`], keeps the
//! minimum cosine distance, and accepts it only when it is strictly below the
//! authentication threshold.
//!
//! ## Determinism
//!
//! The snapshot iterates identities in lexicographic order and only a strictly
//! smaller distance replaces the current best, so exact floating-point ties
//! always resolve to the lexicographically smallest identity.
//!
//! ## Core Types
//!
//! - [`MatchConfig`]: authentication threshold and diagnostic candidate count.
//! - [`MatchOutcome`]: `Matched(MatchHit)` or `NoMatch`.
//! - [`MatchHit`]: identity, raw distance, and display score `clamp(1 - distance, 0, 1)`.
//! - [`Matcher`]: the scan itself.
//!
//! ## Example Usage
//!
//! ```
//! use matcher::{MatchConfig, MatchOutcome, Matcher};
//! use registry::{Embedding, EmbeddingRegistry, RegistryConfig};
//!
//! let registry = EmbeddingRegistry::in_memory(RegistryConfig::new(3)).unwrap();
//! let face = Embedding::new(vec![0.2, 0.4, 0.9]).unwrap();
//! registry.try_insert("alice", face.clone()).unwrap();
//!
//! let matcher = Matcher::new(MatchConfig::default()).unwrap();
//! match matcher.identify(&face, &registry.all()).unwrap() {
//!     MatchOutcome::Matched(hit) => {
//!         assert_eq!(hit.identity, "alice");
//!         assert_eq!(hit.score, 1.0);
//!     }
//!     MatchOutcome::NoMatch { .. } => unreachable!(),
//! }
//! ```
//!
//! ## Observability
//!
//! Install a [`MatchMetrics`] implementation via [`set_match_metrics`] to record
//! per-scan latency, registry size, and match rate.

pub mod engine;
pub mod metrics;
pub mod types;

pub use crate::engine::Matcher;
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::types::{
    MatchConfig, MatchError, MatchHit, MatchOutcome, DEFAULT_AUTH_THRESHOLD,
};
