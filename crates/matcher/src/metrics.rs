// Metrics hooks for the `matcher` crate.
//
// Callers install a global `MatchMetrics` implementation via [`set_match_metrics`];
// `Matcher::identify` then reports latency, scanned entries, and outcome for
// every call without depending on a specific metrics backend.
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

/// Metrics observer for identify scans.
pub trait MatchMetrics: Send + Sync {
    /// `scanned` is the number of registry entries compared against the probe.
    fn record_identify(&self, latency: Duration, scanned: usize, matched: bool);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global match metrics recorder.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
