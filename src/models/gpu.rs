// GPU device telemetry models

use serde::Serialize;

/// One physical GPU as read during a single pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuDevice {
    pub index: u32,
    pub minor_number: u32,
    pub name: String,
    pub uuid: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Milliwatts, as reported by the driver.
    pub power_usage: f64,
    /// Percent of maximum fan speed.
    pub fan_speed: f64,
    pub memory_total: f64,
    pub memory_used: f64,
    pub utilization_memory: f64,
    pub utilization_gpu: f64,
    /// Mean GPU utilization over the trailing sample window, from the driver.
    pub utilization_gpu_average: f64,
}

/// Driver version plus every device, in index order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuMetrics {
    pub version: String,
    pub devices: Vec<GpuDevice>,
}
