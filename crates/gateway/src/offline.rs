use async_trait::async_trait;

use crate::types::{CastReceipt, GatewayOutcome, RemoteTally};
use crate::LedgerGateway;

const NOT_CONFIGURED: &str = "ledger not configured";

/// Gateway used when no external ledger is configured.
///
/// Every call is recoverable, so votes commit locally with a failed remote
/// status and `has_voted` falls back to local records.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGateway;

#[async_trait]
impl LedgerGateway for OfflineGateway {
    fn name(&self) -> &str {
        "offline"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn cast_vote(&self, _identity: &str, _candidate_id: &str) -> GatewayOutcome<CastReceipt> {
        GatewayOutcome::RecoverableFailure(NOT_CONFIGURED.into())
    }

    async fn has_voted(&self, _identity: &str) -> GatewayOutcome<bool> {
        GatewayOutcome::RecoverableFailure(NOT_CONFIGURED.into())
    }

    async fn tally_results(&self) -> GatewayOutcome<RemoteTally> {
        GatewayOutcome::RecoverableFailure(NOT_CONFIGURED.into())
    }
}
