use std::time::Instant;

use registry::{similarity_score, Embedding, Neighbor, RegistrySnapshot};

use crate::metrics::metrics_recorder;
use crate::types::{MatchConfig, MatchError, MatchHit, MatchOutcome};


/// Nearest-neighbor matcher over registry snapshots.
///
/// O(N) per call in the number of registered faces. The matcher holds no
/// reference to the registry; callers pass the snapshot they want scanned, so
/// a registration completing mid-scan is simply not visible to that scan.
#[derive(Debug, Clone)]
pub struct Matcher {
    cfg: MatchConfig,
}

impl Matcher {
    pub fn new(cfg: MatchConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Map `probe` to the closest registered identity, if close enough.
    pub fn identify(
        &self,
        probe: &Embedding,
        snapshot: &RegistrySnapshot,
    ) -> Result<MatchOutcome, MatchError> {
        check_dimension(probe, snapshot)?;
        let start = Instant::now();

        let outcome = match snapshot.nearest(probe) {
            Some(nearest) if nearest.distance < self.cfg.auth_threshold => {
                MatchOutcome::Matched(to_hit(nearest))
            }
            nearest => MatchOutcome::NoMatch {
                nearest_distance: nearest.map(|n| n.distance),
            },
        };

        let latency = start.elapsed();
        tracing::debug!(
            scanned = snapshot.len(),
            matched = outcome.hit().is_some(),
            latency_us = latency.as_micros() as u64,
            "identify scan complete"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_identify(latency, snapshot.len(), outcome.hit().is_some());
        }

        Ok(outcome)
    }

    /// Closest `max_candidates` identities ordered by (distance, identity),
    /// regardless of threshold. Diagnostic only; never an authentication
    /// decision.
    pub fn candidates(
        &self,
        probe: &Embedding,
        snapshot: &RegistrySnapshot,
    ) -> Result<Vec<MatchHit>, MatchError> {
        check_dimension(probe, snapshot)?;
        Ok(snapshot
            .ranked(probe, self.cfg.max_candidates)
            .into_iter()
            .map(to_hit)
            .collect())
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            cfg: MatchConfig::default(),
        }
    }
}

fn check_dimension(probe: &Embedding, snapshot: &RegistrySnapshot) -> Result<(), MatchError> {
    if probe.dimension() != snapshot.dimension() {
        return Err(MatchError::DimensionMismatch {
            expected: snapshot.dimension(),
            actual: probe.dimension(),
        });
    }
    Ok(())
}

fn to_hit(neighbor: Neighbor) -> MatchHit {
    MatchHit {
        score: similarity_score(neighbor.distance),
        identity: neighbor.identity,
        distance: neighbor.distance,
    }
}
