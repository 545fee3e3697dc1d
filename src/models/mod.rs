// Domain models: device records, normalized stats, samples

mod gpu;
mod network;
mod sample;

pub use gpu::{GpuDevice, GpuMetrics};
pub use network::{NetDevStats, NetworkStatRecord, NormalizedStats, StatRecord};
pub use sample::{MetricKind, MetricSink, Sample, SampleBuffer};
