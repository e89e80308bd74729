use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::types::{CastReceipt, GatewayOutcome, Rejection, RemoteTally};
use crate::LedgerGateway;

#[derive(Debug, Default)]
struct ContractState {
    votes: BTreeMap<String, String>,
    tally: RemoteTally,
    block_number: u64,
}

#[derive(Debug, Default)]
struct Controls {
    available: AtomicBool,
    lose_responses: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicU64,
}

/// In-process stand-in for the voting contract.
///
/// Enforces one vote per voter, keeps per-candidate tallies, and hands out
/// monotone transaction references and block numbers. Availability, latency,
/// and lost responses (write applied, acknowledgement dropped) can be toggled
/// at runtime. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    state: Arc<Mutex<ContractState>>,
    controls: Arc<Controls>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        let controls = Controls::default();
        controls.available.store(true, Ordering::SeqCst);
        Self {
            state: Arc::new(Mutex::new(ContractState::default())),
            controls: Arc::new(controls),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.controls.available.store(available, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.controls
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Apply writes but report them as recoverable failures.
    pub fn set_lose_responses(&self, lose: bool) {
        self.controls.lose_responses.store(lose, Ordering::SeqCst);
    }

    /// Record a vote directly, as if cast through another node.
    pub fn preload_vote(&self, identity: &str, candidate_id: &str) {
        let mut state = self.lock();
        if state.votes.contains_key(identity) {
            return;
        }
        state.votes.insert(identity.to_string(), candidate_id.to_string());
        *state.tally.entry(candidate_id.to_string()).or_insert(0) += 1;
        state.block_number += 1;
    }

    /// Total calls received, including ones that failed.
    pub fn call_count(&self) -> u64 {
        self.controls.calls.load(Ordering::SeqCst)
    }

    pub fn vote_of(&self, identity: &str) -> Option<String> {
        self.lock().votes.get(identity).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, ContractState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self) -> Result<(), String> {
        self.controls.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.controls.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.controls.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err("ledger unreachable: connection refused".to_string())
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn cast_vote(&self, identity: &str, candidate_id: &str) -> GatewayOutcome<CastReceipt> {
        if let Err(reason) = self.enter().await {
            return GatewayOutcome::RecoverableFailure(reason);
        }
        if candidate_id.trim().is_empty() {
            return GatewayOutcome::DefinitiveFailure(Rejection::Rejected(
                "execution reverted: empty candidate".into(),
            ));
        }

        let receipt = {
            let mut state = self.lock();
            if state.votes.contains_key(identity) {
                return GatewayOutcome::DefinitiveFailure(Rejection::AlreadyVoted);
            }
            state.votes.insert(identity.to_string(), candidate_id.to_string());
            *state.tally.entry(candidate_id.to_string()).or_insert(0) += 1;
            state.block_number += 1;
            CastReceipt {
                tx_ref: format!("0x{:064x}", state.block_number),
                block_number: Some(state.block_number),
            }
        };

        if self.controls.lose_responses.load(Ordering::SeqCst) {
            return GatewayOutcome::RecoverableFailure("response lost after submission".into());
        }
        GatewayOutcome::Success(receipt)
    }

    async fn has_voted(&self, identity: &str) -> GatewayOutcome<bool> {
        match self.enter().await {
            Ok(()) => GatewayOutcome::Success(self.lock().votes.contains_key(identity)),
            Err(reason) => GatewayOutcome::RecoverableFailure(reason),
        }
    }

    async fn tally_results(&self) -> GatewayOutcome<RemoteTally> {
        match self.enter().await {
            Ok(()) => GatewayOutcome::Success(self.lock().tally.clone()),
            Err(reason) => GatewayOutcome::RecoverableFailure(reason),
        }
    }
}
