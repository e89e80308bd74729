use registry::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cosine-distance threshold for accepting a match.
pub const DEFAULT_AUTH_THRESHOLD: f64 = 0.4;

/// Matcher configuration.
///
/// The authentication threshold is tuned independently of the registry's
/// duplicate threshold; neither is assumed to bound the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    /// A match is accepted only when the minimum distance is strictly below this.
    #[serde(default = "MatchConfig::default_auth_threshold")]
    pub auth_threshold: f64,
    /// Number of ranked candidates returned by [`crate::Matcher::candidates`].
    #[serde(default = "MatchConfig::default_max_candidates")]
    pub max_candidates: usize,
}

impl MatchConfig {
    pub(crate) fn default_auth_threshold() -> f64 {
        DEFAULT_AUTH_THRESHOLD
    }

    pub(crate) fn default_max_candidates() -> usize {
        5
    }

    pub fn with_auth_threshold(mut self, threshold: f64) -> Self {
        self.auth_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !(0.0..=2.0).contains(&self.auth_threshold) {
            return Err(MatchError::InvalidConfig(format!(
                "auth_threshold must be within [0, 2], got {}",
                self.auth_threshold
            )));
        }
        if self.max_candidates == 0 {
            return Err(MatchError::InvalidConfig(
                "max_candidates must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            auth_threshold: Self::default_auth_threshold(),
            max_candidates: Self::default_max_candidates(),
        }
    }
}

/// An accepted match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchHit {
    pub identity: String,
    /// Raw cosine distance used for the threshold decision.
    pub distance: f64,
    /// `1 - distance` clamped to `[0, 1]`, for display.
    pub score: f64,
}

/// Result of [`crate::Matcher::identify`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(MatchHit),
    /// No stored face within the threshold. `nearest_distance` is `None` for
    /// an empty registry.
    NoMatch { nearest_distance: Option<f64> },
}

impl MatchOutcome {
    pub fn hit(&self) -> Option<&MatchHit> {
        match self {
            MatchOutcome::Matched(hit) => Some(hit),
            MatchOutcome::NoMatch { .. } => None,
        }
    }
}

/// Errors produced by the matching layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    #[error("probe dimension mismatch: registry holds {expected}, probe has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
