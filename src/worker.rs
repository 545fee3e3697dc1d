// Background poller: one pass per registered collector on every tick.
// Passes are blocking, so each runs on the blocking pool; the next collector
// starts only after the previous one finished.

use crate::collector::{Collector, CollectorRegistry, PassReport, run_pass};
use crate::error::CollectError;
use crate::exposition::MetricStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{Duration, interval};
use tracing::instrument;

/// Collectors, sample store, and shutdown for the worker.
pub struct WorkerDeps {
    pub registry: CollectorRegistry,
    pub store: Arc<MetricStore>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing and logging config.
pub struct WorkerConfig {
    pub sample_interval_ms: u64,
    /// How often to log pass totals (real seconds).
    pub stats_log_interval_secs: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct PassTotals {
    succeeded: u64,
    failed: u64,
}

/// Runs one pass of `collector` off the async runtime. A pass that panics
/// yields a failed report with no samples.
pub async fn run_blocking_pass(collector: Arc<dyn Collector>) -> PassReport {
    let name = collector.name();
    let start = Instant::now();
    match tokio::task::spawn_blocking(move || run_pass(collector.as_ref())).await {
        Ok(report) => report,
        Err(e) => PassReport {
            collector: name,
            samples: Vec::new(),
            duration: start.elapsed(),
            error: Some(CollectError::Aborted(e.to_string())),
        },
    }
}

/// Runs every collector once and publishes each outcome. Returns how many
/// passes failed.
pub async fn collect_once(registry: &CollectorRegistry, store: &MetricStore) -> usize {
    let mut failed = 0;
    for collector in registry.iter() {
        let name = collector.name();
        let report = run_blocking_pass(collector.clone()).await;
        match &report.error {
            None => tracing::debug!(
                collector = name,
                samples = report.samples.len(),
                duration_ms = report.duration.as_millis() as u64,
                "collector pass succeeded"
            ),
            Some(e) => {
                failed += 1;
                tracing::warn!(
                    error = %e,
                    collector = name,
                    operation = "collect",
                    "collector pass failed"
                );
            }
        }
        store.publish(report).await;
    }
    failed
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(deps, config))
}

#[instrument(skip_all, fields(sample_interval_ms = config.sample_interval_ms))]
async fn run(deps: WorkerDeps, config: WorkerConfig) {
    let WorkerDeps {
        registry,
        store,
        mut shutdown_rx,
    } = deps;

    let mut tick = interval(Duration::from_millis(config.sample_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut stats_log_tick = interval(Duration::from_secs(config.stats_log_interval_secs));
    stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut totals = PassTotals::default();

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let failed = collect_once(&registry, &store).await as u64;
                totals.failed += failed;
                totals.succeeded += registry.len() as u64 - failed;
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("Worker shutting down");
                break;
            }
            _ = stats_log_tick.tick() => {
                tracing::info!(
                    collectors = registry.len(),
                    passes_succeeded_total = totals.succeeded,
                    passes_failed_total = totals.failed,
                    "app stats"
                );
            }
        }
    }
}
