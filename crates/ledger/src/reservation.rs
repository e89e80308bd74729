use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::record::VoteRecord;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Reservation {
    pub token: u64,
    pub acquired_at: Instant,
}

impl Reservation {
    pub fn is_live(&self, ttl: Duration) -> bool {
        self.acquired_at.elapsed() < ttl
    }
}

/// Everything guarded by the ledger mutex.
#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    pub committed: BTreeMap<String, VoteRecord>,
    pub reservations: HashMap<String, Reservation>,
    pub next_token: u64,
}

impl LedgerState {
    /// Remove the reservation for `identity` if `token` still owns it.
    pub fn release(&mut self, identity: &str, token: u64) -> bool {
        match self.reservations.get(identity) {
            Some(reservation) if reservation.token == token => {
                self.reservations.remove(identity);
                true
            }
            _ => false,
        }
    }
}

pub(crate) fn lock_state(state: &Mutex<LedgerState>) -> MutexGuard<'_, LedgerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases a reservation when dropped, unless it was disarmed by a commit.
///
/// Dropping the vote future mid-flight (caller cancelled) therefore returns
/// the identity to `NotVoted` instead of leaving it reserved.
pub(crate) struct ReservationGuard<'a> {
    state: &'a Mutex<LedgerState>,
    identity: String,
    token: u64,
    armed: bool,
}

impl<'a> ReservationGuard<'a> {
    pub fn new(state: &'a Mutex<LedgerState>, identity: String, token: u64) -> Self {
        Self {
            state,
            identity,
            token,
            armed: true,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Release while the caller already holds the state lock.
    pub fn release_locked(&mut self, state: &mut LedgerState) {
        if self.armed {
            state.release(&self.identity, self.token);
            self.armed = false;
        }
    }
}

impl Drop for ReservationGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let released = lock_state(self.state).release(&self.identity, self.token);
            if released {
                tracing::debug!(identity = %self.identity, "vote reservation released");
            }
        }
    }
}
