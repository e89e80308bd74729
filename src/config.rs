//! YAML configuration for the SecureVote engine.
//!
//! One file describes the embedding dimension, storage, thresholds, and the
//! external ledger. [`SecureVoteConfig::build`] turns it into a ready
//! [`IntegrityCoordinator`].
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! embedding_dimension: 128
//!
//! storage:
//!   backend: "redb"
//!   path: "data/securevote.redb"
//!
//! registry:
//!   duplicate_threshold: 0.3
//!
//! matcher:
//!   auth_threshold: 0.4
//!   max_candidates: 5
//!
//! ledger:
//!   reservation_ttl_ms: 60000
//!
//! gateway:
//!   backend:
//!     kind: "http_relay"
//!     base_url: "http://127.0.0.1:8545/ledger"
//!   guard:
//!     call_timeout_ms: 10000
//!     failure_threshold: 5
//!     reset_timeout_secs: 30
//!     read_retries: 2
//! ```

use std::fs;
use std::path::Path;

use gateway::GatewayConfig;
use ledger::{LedgerConfig, VoteLedger, VOTE_TABLE};
use matcher::{MatchConfig, Matcher};
use registry::{EmbeddingRegistry, RegistryConfig, DEFAULT_DUPLICATE_THRESHOLD, REGISTRY_TABLE};
use serde::{Deserialize, Serialize};
use store::BackendConfig;
use thiserror::Error;

use crate::coordinator::IntegrityCoordinator;
use crate::error::CoordinatorError;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureVoteConfig {
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Length of every embedding the deployed embedder produces.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    #[serde(default)]
    pub storage: StorageYamlConfig,

    #[serde(default)]
    pub registry: RegistryYamlConfig,

    #[serde(default)]
    pub matcher: MatchConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl SecureVoteConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: SecureVoteConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if self.embedding_dimension == 0 {
            return Err(ConfigLoadError::Validation(
                "embedding_dimension must be greater than zero".to_string(),
            ));
        }
        self.storage.validate()?;
        self.registry_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.gateway
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new(self.embedding_dimension)
            .with_duplicate_threshold(self.registry.duplicate_threshold)
    }

    /// Open storage, load the registry and ledger, and wire the coordinator.
    pub fn build(&self) -> Result<IntegrityCoordinator, CoordinatorError> {
        let storage = self.storage.backend_config().open()?;
        let registry = EmbeddingRegistry::open(self.registry_config(), storage.table(REGISTRY_TABLE)?)?;
        let matcher = Matcher::new(self.matcher.clone())?;
        let gateway = self.gateway.build()?;
        let ledger = VoteLedger::open(self.ledger.clone(), storage.table(VOTE_TABLE)?, gateway)?;

        tracing::info!(
            durable = storage.is_durable(),
            registered = registry.len(),
            voted = ledger.voted_count(),
            "securevote engine ready"
        );
        Ok(IntegrityCoordinator::new(registry, matcher, ledger))
    }
}

impl Default for SecureVoteConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            embedding_dimension: default_embedding_dimension(),
            storage: StorageYamlConfig::default(),
            registry: RegistryYamlConfig::default(),
            matcher: MatchConfig::default(),
            ledger: LedgerConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Storage YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageYamlConfig {
    /// `"in_memory"` or `"redb"`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Database file, required for `redb`.
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.backend.as_str() {
            "in_memory" => Ok(()),
            "redb" => match self.path.as_deref() {
                Some(path) if !path.trim().is_empty() => Ok(()),
                _ => Err(ConfigLoadError::Validation(
                    "storage.path is required for the redb backend".to_string(),
                )),
            },
            other => Err(ConfigLoadError::Validation(format!(
                "unknown storage.backend '{other}', expected 'in_memory' or 'redb'"
            ))),
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        match (self.backend.as_str(), &self.path) {
            ("redb", Some(path)) => BackendConfig::redb(path.clone()),
            _ => BackendConfig::in_memory(),
        }
    }
}

impl Default for StorageYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

/// Registry YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryYamlConfig {
    /// Faces closer than this cosine distance are the same person.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
}

impl Default for RegistryYamlConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_duplicate_threshold(),
        }
    }
}

fn default_embedding_dimension() -> usize {
    128
}

fn default_storage_backend() -> String {
    "in_memory".to_string()
}

fn default_duplicate_threshold() -> f64 {
    DEFAULT_DUPLICATE_THRESHOLD
}
