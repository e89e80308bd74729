use std::sync::Arc;

use gateway::GatewayStatus;
use ledger::{TallyReport, VoteLedger, VoteRecord};
use matcher::{MatchHit, MatchOutcome, Matcher};
use registry::{validate_identity, Embedding, EmbeddingRegistry};
use serde::Serialize;

use crate::embedder::Embedder;
use crate::error::CoordinatorError;

/// Result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthResult {
    Authenticated {
        identity: String,
        /// Raw cosine distance used for the decision.
        distance: f64,
        /// `1 - distance` clamped to `[0, 1]`.
        score: f64,
        has_voted: bool,
    },
    NoMatch,
}

/// Registration counters. `remaining` is clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoterStats {
    pub registered: usize,
    pub voted: usize,
    pub remaining: usize,
}

/// Orchestrates registration, authentication, and voting over one registry
/// and one ledger.
///
/// Holds no state of its own beyond the components it owns. Operation order
/// is fixed here: cheap name checks before embedding, registry membership
/// before any ledger work.
pub struct IntegrityCoordinator {
    registry: Arc<EmbeddingRegistry>,
    matcher: Matcher,
    ledger: Arc<VoteLedger>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl IntegrityCoordinator {
    pub fn new(registry: EmbeddingRegistry, matcher: Matcher, ledger: VoteLedger) -> Self {
        Self {
            registry: Arc::new(registry),
            matcher,
            ledger: Arc::new(ledger),
            embedder: None,
        }
    }

    /// Attach the image embedder. Its dimension must match the registry's.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Result<Self, CoordinatorError> {
        if embedder.dimension() != self.registry.dimension() {
            return Err(CoordinatorError::Configuration(format!(
                "embedder produces {}-dimensional embeddings, registry holds {}",
                embedder.dimension(),
                self.registry.dimension()
            )));
        }
        self.embedder = Some(embedder);
        Ok(self)
    }

    pub fn registry(&self) -> &EmbeddingRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    /// Register `identity` with a precomputed embedding.
    pub fn register(&self, identity: &str, embedding: Embedding) -> Result<(), CoordinatorError> {
        self.registry.try_insert(identity, embedding)?;
        Ok(())
    }

    /// Register from an image. The name is checked before the embedder runs.
    pub fn register_image(&self, identity: &str, image: &[u8]) -> Result<(), CoordinatorError> {
        validate_identity(identity)?;
        if self.registry.contains(identity) {
            return Err(CoordinatorError::NameTaken(identity.to_string()));
        }
        let embedding = self.embed(image)?;
        self.register(identity, embedding)
    }

    /// Identify the probe's owner and report whether they already voted.
    pub async fn authenticate(&self, probe: &Embedding) -> Result<AuthResult, CoordinatorError> {
        let snapshot = self.registry.all();
        match self.matcher.identify(probe, &snapshot)? {
            MatchOutcome::Matched(hit) => {
                let has_voted = self.ledger.has_voted(&hit.identity).await;
                tracing::info!(identity = %hit.identity, distance = hit.distance, has_voted, "voter authenticated");
                Ok(AuthResult::Authenticated {
                    identity: hit.identity,
                    distance: hit.distance,
                    score: hit.score,
                    has_voted,
                })
            }
            MatchOutcome::NoMatch { nearest_distance } => {
                tracing::info!(?nearest_distance, "authentication found no match");
                Ok(AuthResult::NoMatch)
            }
        }
    }

    pub async fn authenticate_image(&self, image: &[u8]) -> Result<AuthResult, CoordinatorError> {
        let probe = self.embed(image)?;
        self.authenticate(&probe).await
    }

    /// Closest registered identities to the probe, nearest first, ignoring
    /// the authentication threshold. For operator review of near misses;
    /// never grants a vote.
    pub fn candidates(&self, probe: &Embedding) -> Result<Vec<MatchHit>, CoordinatorError> {
        let hits = self.matcher.candidates(probe, &self.registry.all())?;
        tracing::debug!(returned = hits.len(), "candidate lookup");
        Ok(hits)
    }

    /// Cast a vote for a registered voter.
    ///
    /// The ledger work runs on its own task, so a caller that goes away after
    /// the reservation still leaves the vote with a definite outcome.
    pub async fn vote(
        &self,
        identity: &str,
        candidate_id: &str,
    ) -> Result<VoteRecord, CoordinatorError> {
        if !self.registry.contains(identity) {
            return Err(CoordinatorError::UnknownVoter(identity.to_string()));
        }

        let ledger = Arc::clone(&self.ledger);
        let identity = identity.to_string();
        let candidate_id = candidate_id.to_string();
        let task = tokio::spawn(async move { ledger.cast_vote(&identity, &candidate_id).await });

        match task.await {
            Ok(result) => Ok(result?),
            Err(join_err) => Err(CoordinatorError::Internal(format!(
                "vote task failed: {join_err}"
            ))),
        }
    }

    pub fn stats(&self) -> VoterStats {
        let registered = self.registry.len();
        let voted = self.ledger.voted_count();
        VoterStats {
            registered,
            voted,
            remaining: registered.saturating_sub(voted),
        }
    }

    pub async fn results(&self) -> TallyReport {
        self.ledger.results().await
    }

    /// Admin deletion. The voter's vote record, if any, is kept.
    pub fn remove_voter(&self, identity: &str) -> Result<(), CoordinatorError> {
        self.registry.delete(identity)?;
        Ok(())
    }

    pub fn ledger_status(&self) -> GatewayStatus {
        self.ledger.gateway_status()
    }

    fn embed(&self, image: &[u8]) -> Result<Embedding, CoordinatorError> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            CoordinatorError::Configuration("no embedder configured".into())
        })?;
        let embedding = embedder.embed(image)?;
        self.registry.check_dimension(&embedding)?;
        Ok(embedding)
    }
}
