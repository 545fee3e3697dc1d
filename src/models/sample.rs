// Typed, labeled samples handed to the metric emitter

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Point-in-time value.
    Gauge,
    /// Monotonic cumulative value.
    Counter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub value: f64,
    pub labels: Vec<(String, String)>,
}

impl Sample {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
        value: f64,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            value,
            labels: Vec::new(),
        }
    }

    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self::new(name, help, MetricKind::Gauge, value)
    }

    pub fn counter(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self::new(name, help, MetricKind::Counter, value)
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((name.into(), value.into()));
        self
    }

    /// Value of label `name`, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Receives samples produced by a collection pass.
pub trait MetricSink {
    fn emit(&mut self, sample: Sample);
}

/// Collects one pass worth of samples in emission order.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

impl MetricSink for SampleBuffer {
    fn emit(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}
