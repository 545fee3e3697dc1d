// Latest samples per collector, rendered in the Prometheus text format.

use crate::collector::PassReport;
use crate::error::ExpositionError;
use crate::models::{MetricKind, Sample};
use crate::version::build_info_sample;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

struct StoredPass {
    samples: Vec<Sample>,
    scrape: [Sample; 2],
}

/// Holds the outcome of the most recent pass of each collector. A new pass
/// replaces the previous one wholesale; nothing older is kept.
pub struct MetricStore {
    namespace: String,
    passes: RwLock<BTreeMap<&'static str, StoredPass>>,
}

impl MetricStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            passes: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn publish(&self, report: PassReport) {
        let scrape = report.scrape_samples(&self.namespace);
        self.passes.write().await.insert(
            report.collector,
            StoredPass {
                samples: report.samples,
                scrape,
            },
        );
    }

    /// Collector samples, then scrape duration/success samples, then build info.
    pub async fn snapshot(&self) -> Vec<Sample> {
        let passes = self.passes.read().await;
        let mut samples: Vec<Sample> = passes
            .values()
            .flat_map(|p| p.samples.iter().cloned())
            .collect();
        samples.extend(passes.values().flat_map(|p| p.scrape.iter().cloned()));
        samples.push(build_info_sample(&self.namespace));
        samples
    }

    pub async fn render(&self) -> Result<String, ExpositionError> {
        render(&self.snapshot().await)
    }
}

/// Encodes samples as Prometheus text. Samples sharing a name form one family;
/// the first sample of a family fixes its kind, help and label names.
pub fn render(samples: &[Sample]) -> Result<String, ExpositionError> {
    let mut families: Vec<Vec<&Sample>> = Vec::new();
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    for sample in samples {
        let slot = *by_name.entry(sample.name.as_str()).or_insert_with(|| {
            families.push(Vec::new());
            families.len() - 1
        });
        families[slot].push(sample);
    }

    let registry = Registry::new();
    for family in &families {
        let first = family[0];
        let label_names: Vec<&str> = first.labels.iter().map(|(k, _)| k.as_str()).collect();
        let opts = Opts::new(first.name.clone(), first.help.clone());
        match first.kind {
            MetricKind::Gauge => {
                let vec = GaugeVec::new(opts, &label_names)?;
                for s in family {
                    vec.get_metric_with_label_values(&label_values(s))?
                        .set(s.value);
                }
                registry.register(Box::new(vec))?;
            }
            MetricKind::Counter => {
                let vec = CounterVec::new(opts, &label_names)?;
                for s in family {
                    vec.get_metric_with_label_values(&label_values(s))?
                        .inc_by(s.value.max(0.0));
                }
                registry.register(Box::new(vec))?;
            }
        }
    }

    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn label_values(sample: &Sample) -> Vec<&str> {
    sample.labels.iter().map(|(_, v)| v.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_gauges_and_counters_with_labels() {
        let help = "Network device statistic bytes_recv.";
        let samples = vec![
            Sample::counter("node_network_bytes_recv_total", help, 200.0)
                .with_label("device", "eth0"),
            Sample::counter("node_network_bytes_recv_total", help, 7.0)
                .with_label("device", "wlan0"),
            Sample::gauge("node_gpu_Temperature", "Temperature of GPU", 41.0)
                .with_label("uuid", "GPU-aaa"),
        ];
        let text = render(&samples).unwrap();
        assert!(text.contains("# TYPE node_network_bytes_recv_total counter"));
        assert!(text.contains("node_network_bytes_recv_total{device=\"eth0\"} 200"));
        assert!(text.contains("node_network_bytes_recv_total{device=\"wlan0\"} 7"));
        assert!(text.contains("# TYPE node_gpu_Temperature gauge"));
        assert!(text.contains("node_gpu_Temperature{uuid=\"GPU-aaa\"} 41"));
    }

    #[test]
    fn empty_input_renders_empty_text() {
        assert_eq!(render(&[]).unwrap(), "");
    }

    #[test]
    fn mismatched_label_count_is_an_error() {
        let samples = vec![
            Sample::gauge("x", "x", 1.0).with_label("a", "1"),
            Sample::gauge("x", "x", 2.0),
        ];
        assert!(render(&samples).is_err());
    }
}
