use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gateway::RemoteTally;
use serde::{Deserialize, Serialize};

/// What happened to the remote write for a committed vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    NotAttempted,
    Succeeded,
    Failed,
}

impl RemoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStatus::NotAttempted => "not_attempted",
            RemoteStatus::Succeeded => "succeeded",
            RemoteStatus::Failed => "failed",
        }
    }
}

/// A committed vote. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub schema_version: u16,
    pub identity: String,
    pub candidate_id: String,
    pub remote_status: RemoteStatus,
    /// Remote transaction reference when the remote write succeeded.
    pub remote_tx_ref: Option<String>,
    /// Remote failure reason when it did not.
    pub remote_detail: Option<String>,
    pub cast_at: DateTime<Utc>,
}

/// Combined local and remote vote counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TallyReport {
    /// Per candidate, the larger of the local and remote counts.
    pub counts: BTreeMap<String, u64>,
    pub local: BTreeMap<String, u64>,
    /// `None` when the remote tally was unavailable.
    pub remote: Option<RemoteTally>,
    /// Candidates whose local and remote counts differ.
    pub mismatched: Vec<String>,
}

impl TallyReport {
    /// Both sources undercount the truth (lost local commits, failed remote
    /// writes), so the reconciled count is the per-candidate maximum.
    pub(crate) fn reconcile(local: BTreeMap<String, u64>, remote: Option<RemoteTally>) -> Self {
        let Some(remote_counts) = remote else {
            return Self {
                counts: local.clone(),
                local,
                remote: None,
                mismatched: Vec::new(),
            };
        };

        let mut counts = local.clone();
        let mut mismatched = Vec::new();
        for (candidate, &remote_count) in &remote_counts {
            let entry = counts.entry(candidate.clone()).or_insert(0);
            *entry = (*entry).max(remote_count);
        }
        for candidate in counts.keys() {
            let l = local.get(candidate).copied().unwrap_or(0);
            let r = remote_counts.get(candidate).copied().unwrap_or(0);
            if l != r {
                mismatched.push(candidate.clone());
            }
        }

        Self {
            counts,
            local,
            remote: Some(remote_counts),
            mismatched,
        }
    }
}
