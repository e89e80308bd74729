use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use gateway::{GatewayOutcome, GatewayStatus, LedgerGateway, Rejection};
use serde::{Deserialize, Serialize};
use store::{decode, encode, InMemoryBackend, KvBackend};

use crate::record::{RemoteStatus, TallyReport, VoteRecord};
use crate::reservation::{lock_state, LedgerState, Reservation, ReservationGuard};
use crate::LedgerError;


/// Bump whenever the on-disk [`VoteRecord`] layout changes.
pub const LEDGER_SCHEMA_VERSION: u16 = 1;

/// Storage table holding committed votes.
pub const VOTE_TABLE: &str = "vote_records";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// How long a reservation blocks other requests for the same identity.
    #[serde(default = "LedgerConfig::default_reservation_ttl_ms")]
    pub reservation_ttl_ms: u64,
}

impl LedgerConfig {
    fn default_reservation_ttl_ms() -> u64 {
        60_000
    }

    pub fn reservation_ttl(&self) -> Duration {
        Duration::from_millis(self.reservation_ttl_ms)
    }

    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The TTL must outlast a whole cast: the remote re-check with its
    /// retries, then the remote write. `max_cast` is that bound as reported
    /// by the gateway.
    pub fn validate(&self, max_cast: Option<Duration>) -> Result<(), LedgerError> {
        let ttl = self.reservation_ttl();
        if ttl.is_zero() {
            return Err(LedgerError::Configuration(
                "reservation_ttl_ms must be greater than zero".into(),
            ));
        }
        if let Some(max_cast) = max_cast {
            if ttl <= max_cast {
                return Err(LedgerError::Configuration(format!(
                    "reservation ttl {}ms must exceed the gateway's worst-case cast time ({}ms)",
                    ttl.as_millis(),
                    max_cast.as_millis()
                )));
            }
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            reservation_ttl_ms: Self::default_reservation_ttl_ms(),
        }
    }
}

/// Single-vote ledger over a local durable table and a remote gateway.
pub struct VoteLedger {
    backend: Box<dyn KvBackend>,
    gateway: Arc<dyn LedgerGateway>,
    cfg: LedgerConfig,
    state: Mutex<LedgerState>,
}

impl VoteLedger {
    /// Open the ledger, loading every committed vote from `backend`.
    pub fn open(
        cfg: LedgerConfig,
        backend: Box<dyn KvBackend>,
        gateway: Arc<dyn LedgerGateway>,
    ) -> Result<Self, LedgerError> {
        cfg.validate(gateway.max_cast_duration())?;

        let mut loaded = Vec::new();
        backend.scan(&mut |key, bytes| {
            let record: VoteRecord = decode(bytes)?;
            loaded.push((key.to_string(), record));
            Ok(())
        })?;

        let mut committed = BTreeMap::new();
        for (key, record) in loaded {
            if record.schema_version > LEDGER_SCHEMA_VERSION {
                return Err(LedgerError::Configuration(format!(
                    "vote record '{key}' has schema version {}, newer than supported {}",
                    record.schema_version, LEDGER_SCHEMA_VERSION
                )));
            }
            if record.identity != key {
                return Err(LedgerError::Configuration(format!(
                    "vote record stored under '{key}' belongs to '{}'",
                    record.identity
                )));
            }
            committed.insert(key, record);
        }

        tracing::info!(
            voted = committed.len(),
            gateway = gateway.name(),
            reservation_ttl_ms = cfg.reservation_ttl_ms,
            "vote ledger loaded"
        );

        Ok(Self {
            backend,
            gateway,
            cfg,
            state: Mutex::new(LedgerState {
                committed,
                ..LedgerState::default()
            }),
        })
    }

    /// Ledger with no durable storage.
    pub fn in_memory(gateway: Arc<dyn LedgerGateway>) -> Result<Self, LedgerError> {
        Self::open(
            LedgerConfig::default(),
            Box::new(InMemoryBackend::new()),
            gateway,
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.cfg
    }

    pub fn gateway_status(&self) -> GatewayStatus {
        self.gateway.status()
    }

    pub fn has_voted_locally(&self, identity: &str) -> bool {
        lock_state(&self.state).committed.contains_key(identity)
    }

    /// True if a local record exists or the remote ledger reports a vote.
    ///
    /// Remote failures are treated as "not voted remotely".
    pub async fn has_voted(&self, identity: &str) -> bool {
        if self.has_voted_locally(identity) {
            return true;
        }
        self.remote_has_voted(identity).await
    }

    async fn remote_has_voted(&self, identity: &str) -> bool {
        match self.gateway.has_voted(identity).await {
            GatewayOutcome::Success(voted) => voted,
            GatewayOutcome::RecoverableFailure(reason) => {
                tracing::warn!(%identity, %reason, "remote has_voted unavailable, using local record");
                false
            }
            GatewayOutcome::DefinitiveFailure(rejection) => {
                tracing::warn!(%identity, %rejection, "remote has_voted rejected, using local record");
                false
            }
        }
    }

    pub fn record(&self, identity: &str) -> Option<VoteRecord> {
        lock_state(&self.state).committed.get(identity).cloned()
    }

    pub fn voted_count(&self) -> usize {
        lock_state(&self.state).committed.len()
    }

    /// Committed votes per candidate.
    pub fn local_tally(&self) -> BTreeMap<String, u64> {
        let state = lock_state(&self.state);
        let mut tally = BTreeMap::new();
        for record in state.committed.values() {
            *tally.entry(record.candidate_id.clone()).or_insert(0) += 1;
        }
        tally
    }

    /// Local tally reconciled with the remote one when it is reachable.
    pub async fn results(&self) -> TallyReport {
        let local = self.local_tally();
        let remote = match self.gateway.tally_results().await {
            GatewayOutcome::Success(tally) => Some(tally),
            other => {
                tracing::warn!(outcome = other.label(), "remote tally unavailable, reporting local counts");
                None
            }
        };
        let report = TallyReport::reconcile(local, remote);
        if !report.mismatched.is_empty() {
            tracing::warn!(candidates = ?report.mismatched, "local and remote tallies disagree");
        }
        report
    }

    /// Cast a vote for `identity`.
    ///
    /// Returns the committed record, whose `remote_status` says whether the
    /// remote write went through. Fails with [`LedgerError::AlreadyVoted`] if
    /// the identity has a committed vote, holds a live reservation from another
    /// request, or the remote explicitly reports a prior vote.
    pub async fn cast_vote(
        &self,
        identity: &str,
        candidate_id: &str,
    ) -> Result<VoteRecord, LedgerError> {
        if identity.trim().is_empty() {
            return Err(LedgerError::InvalidInput("identity must not be empty".into()));
        }
        if candidate_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "candidate_id must not be empty".into(),
            ));
        }

        let guard = self.reserve(identity)?;

        if self.remote_has_voted(identity).await {
            tracing::info!(%identity, "remote ledger already holds a vote");
            return Err(LedgerError::AlreadyVoted(identity.to_string()));
        }

        let (remote_status, remote_tx_ref, remote_detail) =
            match self.gateway.cast_vote(identity, candidate_id).await {
                GatewayOutcome::Success(receipt) => {
                    (RemoteStatus::Succeeded, Some(receipt.tx_ref), None)
                }
                GatewayOutcome::DefinitiveFailure(Rejection::AlreadyVoted) => {
                    tracing::info!(%identity, "remote ledger rejected vote as duplicate");
                    return Err(LedgerError::AlreadyVoted(identity.to_string()));
                }
                GatewayOutcome::DefinitiveFailure(rejection) => {
                    tracing::warn!(%identity, %rejection, "remote vote rejected, committing locally");
                    (RemoteStatus::Failed, None, Some(rejection.to_string()))
                }
                GatewayOutcome::RecoverableFailure(reason) => {
                    tracing::warn!(%identity, %reason, "remote vote failed, committing locally");
                    (RemoteStatus::Failed, None, Some(reason))
                }
            };

        let record = VoteRecord {
            schema_version: LEDGER_SCHEMA_VERSION,
            identity: identity.to_string(),
            candidate_id: candidate_id.to_string(),
            remote_status,
            remote_tx_ref,
            remote_detail,
            cast_at: Utc::now(),
        };
        self.commit(guard, record)
    }

    fn reserve(&self, identity: &str) -> Result<ReservationGuard<'_>, LedgerError> {
        let ttl = self.cfg.reservation_ttl();
        let mut state = lock_state(&self.state);
        if state.committed.contains_key(identity) {
            return Err(LedgerError::AlreadyVoted(identity.to_string()));
        }
        if let Some(existing) = state.reservations.get(identity) {
            if existing.is_live(ttl) {
                return Err(LedgerError::AlreadyVoted(identity.to_string()));
            }
            tracing::warn!(%identity, "taking over expired vote reservation");
        }

        state.next_token += 1;
        let token = state.next_token;
        state.reservations.insert(
            identity.to_string(),
            Reservation {
                token,
                acquired_at: Instant::now(),
            },
        );
        Ok(ReservationGuard::new(&self.state, identity.to_string(), token))
    }

    /// Persist and publish `record` under the state mutex.
    fn commit(
        &self,
        mut guard: ReservationGuard<'_>,
        record: VoteRecord,
    ) -> Result<VoteRecord, LedgerError> {
        let ttl = self.cfg.reservation_ttl();
        let mut state = lock_state(&self.state);

        if state.committed.contains_key(guard.identity()) {
            guard.release_locked(&mut state);
            return Err(LedgerError::AlreadyVoted(record.identity));
        }
        if let Some(current) = state.reservations.get(guard.identity()) {
            if current.token != guard.token() && current.is_live(ttl) {
                tracing::warn!(identity = %record.identity, "vote reservation lost to a newer request");
                guard.release_locked(&mut state);
                return Err(LedgerError::AlreadyVoted(record.identity));
            }
        }

        let persisted = encode(&record).and_then(|bytes| self.backend.put(&record.identity, &bytes));
        if let Err(err) = persisted {
            guard.release_locked(&mut state);
            tracing::error!(identity = %record.identity, error = %err, "failed to persist vote");
            return Err(err.into());
        }

        state.reservations.remove(guard.identity());
        guard.release_locked(&mut state);
        state
            .committed
            .insert(record.identity.clone(), record.clone());

        tracing::info!(
            identity = %record.identity,
            candidate = %record.candidate_id,
            remote_status = record.remote_status.as_str(),
            "vote committed"
        );
        Ok(record)
    }
}
