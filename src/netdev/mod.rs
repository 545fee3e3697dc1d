// Network device collector: enumerate interfaces, filter by name, normalize counters.

mod sysinfo_source;

pub use sysinfo_source::SysinfoNetSource;

use crate::collector::{Collector, metric_name};
use crate::error::CollectError;
use crate::filter::DeviceFilter;
use crate::models::{MetricSink, NetDevStats, Sample, StatRecord};
use crate::normalize::normalize;
use tracing::{debug, instrument};

pub const COLLECTOR_NAME: &str = "netdev";

/// Platform API returning the full, unfiltered interface list on every call.
pub trait NetStatsSource: Send + Sync {
    type Record: StatRecord;

    fn interface_stats(&self) -> Result<Vec<Self::Record>, CollectError>;
}

pub struct NetDevCollector<S> {
    source: S,
    filter: DeviceFilter,
    namespace: String,
}

impl<S: NetStatsSource> NetDevCollector<S> {
    pub fn new(source: S, filter: DeviceFilter, namespace: impl Into<String>) -> Self {
        Self {
            source,
            filter,
            namespace: namespace.into(),
        }
    }

    /// One pass: query, filter, normalize. Any failure discards the whole pass.
    #[instrument(skip(self), fields(collector = COLLECTOR_NAME))]
    pub fn collect(&self) -> Result<NetDevStats, CollectError> {
        let records = self.source.interface_stats()?;
        parse_net_dev_stats(&records, &self.filter)
    }
}

/// Applies `filter` before normalizing, so excluded devices cost nothing.
/// A duplicate device name overwrites the earlier entry.
pub fn parse_net_dev_stats<R: StatRecord>(
    records: &[R],
    filter: &DeviceFilter,
) -> Result<NetDevStats, CollectError> {
    let mut net_dev = NetDevStats::new();
    for record in records {
        let device = record.device_name();
        if filter.ignored(device) {
            debug!(device, "Ignoring device");
            continue;
        }
        let stats = normalize(record)?;
        net_dev.insert(device.to_string(), stats);
    }
    Ok(net_dev)
}

/// One counter per device field, labeled by device.
pub fn emit_net_dev_stats(stats: &NetDevStats, namespace: &str, sink: &mut dyn MetricSink) {
    for (device, fields) in stats {
        for (key, value) in fields {
            let name = metric_name(&[namespace, "network", &format!("{key}_total")]);
            let help = format!("Network device statistic {key}.");
            sink.emit(Sample::counter(name, help, *value as f64).with_label("device", device));
        }
    }
}

impl<S: NetStatsSource> Collector for NetDevCollector<S> {
    fn name(&self) -> &'static str {
        COLLECTOR_NAME
    }

    fn update(&self, sink: &mut dyn MetricSink) -> Result<(), CollectError> {
        let stats = self.collect()?;
        emit_net_dev_stats(&stats, &self.namespace, sink);
        Ok(())
    }
}
