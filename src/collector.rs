// Collector trait and the explicit registry of active collectors.

use crate::config::AppConfig;
use crate::error::CollectError;
use crate::gpu::{self, GpuCollector};
use crate::models::{MetricSink, Sample, SampleBuffer};
use crate::netdev::{self, NetDevCollector, SysinfoNetSource};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A device-type collector. One pass per call to `update`; passes of the same
/// collector must not overlap.
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs one blocking pass and emits its samples into `sink`.
    fn update(&self, sink: &mut dyn MetricSink) -> Result<(), CollectError>;
}

type Constructor = fn(&AppConfig) -> anyhow::Result<Arc<dyn Collector>>;

/// Every collector this build knows about, in registration order.
pub const AVAILABLE: &[(&str, Constructor)] = &[
    (netdev::COLLECTOR_NAME, build_netdev),
    (gpu::COLLECTOR_NAME, build_gpu),
];

fn build_netdev(config: &AppConfig) -> anyhow::Result<Arc<dyn Collector>> {
    let filter = config.collectors.netdev.filter()?;
    Ok(Arc::new(NetDevCollector::new(
        SysinfoNetSource::new(),
        filter,
        config.exporter.namespace.clone(),
    )))
}

fn build_gpu(config: &AppConfig) -> anyhow::Result<Arc<dyn Collector>> {
    let gpu = &config.collectors.gpu;
    Ok(Arc::new(GpuCollector::new(
        gpu::default_api(gpu.fan_index),
        Duration::from_secs(gpu.average_window_secs),
        config.exporter.namespace.clone(),
    )))
}

#[derive(Clone, Default)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every collector enabled in `config`.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        for (name, build) in AVAILABLE {
            if config.collectors.is_enabled(name) {
                registry.register(build(config)?);
            } else {
                tracing::debug!(collector = name, "collector disabled");
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, collector: Arc<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Collector>> {
        self.collectors.iter()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

/// Outcome of one pass. `samples` is empty whenever `error` is set.
#[derive(Debug)]
pub struct PassReport {
    pub collector: &'static str,
    pub samples: Vec<Sample>,
    pub duration: Duration,
    pub error: Option<CollectError>,
}

impl PassReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Duration and success gauges for this pass, labeled by collector.
    pub fn scrape_samples(&self, namespace: &str) -> [Sample; 2] {
        let duration = Sample::gauge(
            metric_name(&[namespace, "scrape", "collector_duration_seconds"]),
            "Duration of a collector scrape.",
            self.duration.as_secs_f64(),
        )
        .with_label("collector", self.collector);
        let success = Sample::gauge(
            metric_name(&[namespace, "scrape", "collector_success"]),
            "Whether a collector succeeded.",
            if self.succeeded() { 1.0 } else { 0.0 },
        )
        .with_label("collector", self.collector);
        [duration, success]
    }
}

/// Runs a single pass, discarding any samples emitted before a failure.
pub fn run_pass(collector: &dyn Collector) -> PassReport {
    let start = Instant::now();
    let mut buffer = SampleBuffer::new();
    let result = collector.update(&mut buffer);
    let duration = start.elapsed();
    let (samples, error) = match result {
        Ok(()) => (buffer.into_samples(), None),
        Err(e) => (Vec::new(), Some(e)),
    };
    PassReport {
        collector: collector.name(),
        samples,
        duration,
        error,
    }
}

/// Joins non-empty parts with `_` and replaces characters Prometheus does not
/// accept in metric names.
pub fn metric_name(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_");
    joined
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
