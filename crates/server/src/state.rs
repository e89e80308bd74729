use crate::config::ServerConfig;
use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use securevote::{IntegrityCoordinator, SecureVoteConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Engine shared across requests
    pub coordinator: Arc<IntegrityCoordinator>,

    /// Set when a Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,

    pub started_at: Instant,
}

impl ServerState {
    pub fn new(config: ServerConfig, coordinator: IntegrityCoordinator) -> Self {
        Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            coordinator: Arc::new(coordinator),
            metrics: None,
            started_at: Instant::now(),
        }
    }

    /// Build the engine from `engine_config_path`, or an in-memory engine
    /// with an offline ledger when no path is configured.
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let engine = match config.engine_config_path.as_deref() {
            Some(path) => SecureVoteConfig::from_file(path)?,
            None => SecureVoteConfig::from_yaml("version: \"1.0\"")?,
        };
        let coordinator = engine.build()?;
        tracing::info!(
            engine = engine.name.as_deref().unwrap_or("securevote"),
            dimension = engine.embedding_dimension,
            storage = %engine.storage.backend,
            "engine ready"
        );
        Ok(Self::new(config, coordinator))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}
