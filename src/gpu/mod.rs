// GPU device collector over a vendor management API.
//
// A pass opens the API, reads the driver version and every device, then drops
// the session. Dropping the session is what shuts the library down, so release
// happens on every return path, including a `?` halfway through the device loop.

#[cfg(feature = "nvml")]
mod nvml;

#[cfg(feature = "nvml")]
pub use nvml::NvmlApi;

use crate::collector::{Collector, metric_name};
use crate::error::{BoxError, CollectError};
use crate::models::{GpuDevice, GpuMetrics, MetricKind, MetricSink, Sample};
use std::time::Duration;
use tracing::{debug, instrument};

pub const COLLECTOR_NAME: &str = "gpu";

/// Trailing window the driver averages GPU utilization over.
pub const DEFAULT_AVERAGE_WINDOW: Duration = Duration::from_secs(10);

/// Entry point of a vendor management library.
pub trait GpuApi: Send + Sync {
    /// Initializes the library. The returned session shuts it down on drop.
    /// Missing hardware or driver is reported as [`CollectError::VendorUnavailable`].
    fn open(&self) -> Result<Box<dyn GpuSession + '_>, CollectError>;
}

/// An initialized library handle, valid for one pass.
pub trait GpuSession {
    fn driver_version(&self) -> Result<String, BoxError>;
    fn device_count(&self) -> Result<u32, BoxError>;
    fn device(&self, index: u32) -> Result<Box<dyn GpuDeviceHandle + '_>, BoxError>;
}

/// Telemetry reads for one device. Every call may fail independently.
pub trait GpuDeviceHandle {
    fn uuid(&self) -> Result<String, BoxError>;
    fn name(&self) -> Result<String, BoxError>;
    fn minor_number(&self) -> Result<u32, BoxError>;
    fn temperature(&self) -> Result<u32, BoxError>;
    fn power_usage(&self) -> Result<u32, BoxError>;
    fn fan_speed(&self) -> Result<u32, BoxError>;
    /// `(total, used)` in bytes.
    fn memory_info(&self) -> Result<(u64, u64), BoxError>;
    /// `(gpu, memory)` in percent.
    fn utilization_rates(&self) -> Result<(u32, u32), BoxError>;
    fn average_gpu_utilization(&self, window: Duration) -> Result<f64, BoxError>;
}

/// Stand-in used when the binary is built without any GPU backend.
pub struct NoGpuApi;

impl GpuApi for NoGpuApi {
    fn open(&self) -> Result<Box<dyn GpuSession + '_>, CollectError> {
        Err(CollectError::VendorUnavailable(
            "built without a GPU management backend".into(),
        ))
    }
}

/// The backend compiled into this build.
pub fn default_api(fan_index: u32) -> Box<dyn GpuApi> {
    #[cfg(feature = "nvml")]
    {
        Box::new(NvmlApi::new(fan_index))
    }
    #[cfg(not(feature = "nvml"))]
    {
        let _ = fan_index;
        Box::new(NoGpuApi)
    }
}

pub struct GpuCollector {
    api: Box<dyn GpuApi>,
    average_window: Duration,
    namespace: String,
}

impl GpuCollector {
    pub fn new(
        api: Box<dyn GpuApi>,
        average_window: Duration,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            api,
            average_window,
            namespace: namespace.into(),
        }
    }

    /// `Ok(None)` when the management API cannot be opened (no GPU, no driver).
    /// Any read failure after that fails the pass without a partial device list.
    #[instrument(skip(self), fields(collector = COLLECTOR_NAME))]
    pub fn collect(&self) -> Result<Option<GpuMetrics>, CollectError> {
        let session = match self.api.open() {
            Ok(s) => s,
            Err(e) if e.is_unavailable() => {
                debug!(error = %e, "gpu information is unavailable to collect");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        read_metrics(session.as_ref(), self.average_window).map(Some)
    }
}

/// Reads the driver version and all devices in index order.
pub fn read_metrics(
    session: &dyn GpuSession,
    average_window: Duration,
) -> Result<GpuMetrics, CollectError> {
    let version = session
        .driver_version()
        .map_err(|source| CollectError::VendorQuery {
            field: "driver version",
            source,
        })?;
    let count = session
        .device_count()
        .map_err(|source| CollectError::VendorQuery {
            field: "device count",
            source,
        })?;

    let mut devices = Vec::with_capacity(count as usize);
    for index in 0..count {
        devices.push(read_device(session, index, average_window)?);
    }
    Ok(GpuMetrics { version, devices })
}

fn read_device(
    session: &dyn GpuSession,
    index: u32,
    average_window: Duration,
) -> Result<GpuDevice, CollectError> {
    let failed = |field| read_failed(index, field);

    let device = session.device(index).map_err(failed("handle"))?;
    let uuid = device.uuid().map_err(failed("uuid"))?;
    let name = device.name().map_err(failed("name"))?;
    let minor_number = device.minor_number().map_err(failed("minor number"))?;
    let temperature = device.temperature().map_err(failed("temperature"))?;
    let power_usage = device.power_usage().map_err(failed("power usage"))?;
    let fan_speed = device.fan_speed().map_err(failed("fan speed"))?;
    let (memory_total, memory_used) = device.memory_info().map_err(failed("memory info"))?;
    let (utilization_gpu, utilization_memory) = device
        .utilization_rates()
        .map_err(failed("utilization rates"))?;
    let utilization_gpu_average = device
        .average_gpu_utilization(average_window)
        .map_err(failed("average utilization"))?;

    Ok(GpuDevice {
        index,
        minor_number,
        name,
        uuid,
        temperature: f64::from(temperature),
        power_usage: f64::from(power_usage),
        fan_speed: f64::from(fan_speed),
        memory_total: memory_total as f64,
        memory_used: memory_used as f64,
        utilization_memory: f64::from(utilization_memory),
        utilization_gpu: f64::from(utilization_gpu),
        utilization_gpu_average,
    })
}

fn read_failed(index: u32, field: &'static str) -> impl FnOnce(BoxError) -> CollectError {
    move |source| CollectError::VendorRead {
        index,
        field,
        source,
    }
}

/// Eight samples per device. Memory total goes out as a counter, everything
/// else as a gauge.
pub fn emit_gpu_metrics(metrics: &GpuMetrics, namespace: &str, sink: &mut dyn MetricSink) {
    for device in &metrics.devices {
        use MetricKind::{Counter, Gauge};
        let readings = [
            ("Temperature", "Temperature", Gauge, device.temperature),
            ("PowerUsage", "Power Usage", Gauge, device.power_usage),
            ("FanSpeed", "Fan Speed", Gauge, device.fan_speed),
            ("MemoryTotal_Bytes", "Memory Total", Counter, device.memory_total),
            ("MemoryUsed_Bytes", "Memory Used", Gauge, device.memory_used),
            ("UtilizationMemory", "Utilization Memory", Gauge, device.utilization_memory),
            ("UtilizationGPU", "Utilization", Gauge, device.utilization_gpu),
            ("UtilizationGPUAverage", "Utilization Average", Gauge, device.utilization_gpu_average),
        ];
        let minor_number = device.minor_number.to_string();
        for (field, what, kind, value) in readings {
            let name = metric_name(&[namespace, "gpu", field]);
            let help = format!("{what} of GPU device in system");
            let sample = Sample::new(name, help, kind, value);
            sink.emit(
                sample
                    .with_label("minornumber", minor_number.as_str())
                    .with_label("name", device.name.as_str())
                    .with_label("uuid", device.uuid.as_str())
                    .with_label("system_driver_version", metrics.version.as_str()),
            );
        }
    }
}

impl Collector for GpuCollector {
    fn name(&self) -> &'static str {
        COLLECTOR_NAME
    }

    fn update(&self, sink: &mut dyn MetricSink) -> Result<(), CollectError> {
        if let Some(metrics) = self.collect()? {
            emit_gpu_metrics(&metrics, &self.namespace, sink);
        }
        Ok(())
    }
}
