use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::guarded::{GuardConfig, GuardedGateway};
use crate::memory::InMemoryLedger;
use crate::offline::OfflineGateway;
use crate::relay::{HttpRelayGateway, RelayConfig};
use crate::types::GatewayError;
use crate::LedgerGateway;

/// Which ledger sits behind the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayBackendConfig {
    #[default]
    Offline,
    InMemory,
    HttpRelay(RelayConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub backend: GatewayBackendConfig,
    #[serde(default)]
    pub guard: GuardConfig,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.guard.call_timeout_ms == 0 {
            return Err(GatewayError::InvalidConfig(
                "guard.call_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.guard.failure_threshold == 0 {
            return Err(GatewayError::InvalidConfig(
                "guard.failure_threshold must be greater than zero".into(),
            ));
        }
        if let GatewayBackendConfig::HttpRelay(relay) = &self.backend {
            if relay.base_url.trim().is_empty() {
                return Err(GatewayError::InvalidConfig("relay base_url is empty".into()));
            }
        }
        Ok(())
    }

    /// Build the configured gateway. Real ledgers are wrapped in a
    /// [`GuardedGateway`]; the offline gateway never touches the network and
    /// is returned bare.
    pub fn build(&self) -> Result<Arc<dyn LedgerGateway>, GatewayError> {
        self.validate()?;
        let inner: Arc<dyn LedgerGateway> = match &self.backend {
            GatewayBackendConfig::Offline => return Ok(Arc::new(OfflineGateway)),
            GatewayBackendConfig::InMemory => Arc::new(InMemoryLedger::new()),
            GatewayBackendConfig::HttpRelay(relay) => Arc::new(HttpRelayGateway::new(relay.clone())?),
        };
        tracing::info!(gateway = inner.name(), "ledger gateway configured");
        Ok(Arc::new(GuardedGateway::new(inner, self.guard.clone())))
    }
}
