//! # SecureVote Vote Ledger (`ledger`)
//!
//! Durable record of who voted and for whom, reconciled against an external
//! ledger reached through a [`gateway::LedgerGateway`].
//!
//! ## Lifecycle per identity
//!
//! `NotVoted -> Reserved -> Committed`
//!
//! - **Reserved** is in-process only. It is taken atomically under the ledger
//!   mutex, released when the vote future completes or is dropped, and may be
//!   taken over once older than [`LedgerConfig::reservation_ttl`]. A crash while
//!   reserved leaves the identity `NotVoted`.
//! - **Committed** means a [`VoteRecord`] was durably written. Records are never
//!   overwritten or deleted.
//!
//! ## Two sources of truth
//!
//! [`VoteLedger::has_voted`] is true when a local record exists *or* the
//! remote ledger says so. A remote failure counts as "not voted remotely" so an
//! outage never locks a voter out; the local record keeps the single-vote
//! guarantee on its own.
//!
//! ## Casting
//!
//! [`VoteLedger::cast_vote`] reserves, re-checks the remote, attempts the remote
//! write once, and commits locally whatever the remote said, except for an
//! explicit remote "already voted", which is reported as
//! [`LedgerError::AlreadyVoted`] without a local commit.

mod ledger;
mod record;
mod reservation;

pub use crate::ledger::{LedgerConfig, VoteLedger, LEDGER_SCHEMA_VERSION, VOTE_TABLE};
pub use crate::record::{RemoteStatus, TallyReport, VoteRecord};

use store::StoreError;
use thiserror::Error;

/// Errors produced by the vote ledger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid vote request: {0}")]
    InvalidInput(String),
    #[error("'{0}' has already voted")]
    AlreadyVoted(String),
    #[error("ledger configuration error: {0}")]
    Configuration(String),
    #[error("vote storage failed: {0}")]
    Storage(#[from] StoreError),
}
