// Shared test helpers: a scriptable GPU management API and simple collectors.
#![allow(dead_code)]

use devstat::collector::Collector;
use devstat::error::{BoxError, CollectError};
use devstat::gpu::{GpuApi, GpuDeviceHandle, GpuSession};
use devstat::models::{MetricSink, Sample};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub uuid: String,
    pub name: String,
    pub minor_number: u32,
    pub temperature: u32,
    pub power_usage: u32,
    pub fan_speed: u32,
    pub memory: (u64, u64),
    pub utilization: (u32, u32),
    pub average: f64,
}

pub fn tesla(index: u32) -> FakeDevice {
    FakeDevice {
        uuid: format!("GPU-{index:04}"),
        name: "Tesla T4".into(),
        minor_number: index,
        temperature: 40 + index,
        power_usage: 27_000,
        fan_speed: 30,
        memory: (16 * 1024 * 1024 * 1024, 1024 * 1024 * 1024),
        utilization: (12, 5),
        average: 9.5,
    }
}

/// Counts sessions opened and released; fails one read on demand.
#[derive(Default)]
pub struct FakeGpu {
    pub devices: Vec<FakeDevice>,
    pub unavailable: bool,
    pub failing_query: Option<&'static str>,
    /// `(device index, field)` whose read returns an error.
    pub failing_read: Option<(u32, &'static str)>,
    pub opened: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub last_window: Arc<Mutex<Option<Duration>>>,
}

impl FakeGpu {
    pub fn with_devices(count: u32) -> Self {
        Self {
            devices: (0..count).map(tesla).collect(),
            ..Default::default()
        }
    }
}

impl GpuApi for FakeGpu {
    fn open(&self) -> Result<Box<dyn GpuSession + '_>, CollectError> {
        if self.unavailable {
            return Err(CollectError::VendorUnavailable("libnvidia-ml.so not found".into()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession { gpu: self }))
    }
}

struct FakeSession<'a> {
    gpu: &'a FakeGpu,
}

impl Drop for FakeSession<'_> {
    fn drop(&mut self) {
        self.gpu.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl FakeSession<'_> {
    fn query<T>(&self, field: &'static str, value: T) -> Result<T, BoxError> {
        if self.gpu.failing_query == Some(field) {
            return Err(format!("{field} query failed").into());
        }
        Ok(value)
    }
}

impl GpuSession for FakeSession<'_> {
    fn driver_version(&self) -> Result<String, BoxError> {
        self.query("driver version", "535.104.05".to_string())
    }

    fn device_count(&self) -> Result<u32, BoxError> {
        self.query("device count", self.gpu.devices.len() as u32)
    }

    fn device(&self, index: u32) -> Result<Box<dyn GpuDeviceHandle + '_>, BoxError> {
        let device = self
            .gpu
            .devices
            .get(index as usize)
            .ok_or_else(|| format!("no device at index {index}"))?;
        let handle = FakeHandle {
            gpu: self.gpu,
            device,
            index,
        };
        handle.read("handle", ())?;
        Ok(Box::new(handle))
    }
}

struct FakeHandle<'a> {
    gpu: &'a FakeGpu,
    device: &'a FakeDevice,
    index: u32,
}

impl FakeHandle<'_> {
    fn read<T>(&self, field: &'static str, value: T) -> Result<T, BoxError> {
        if self.gpu.failing_read == Some((self.index, field)) {
            return Err(format!("{field} read failed").into());
        }
        Ok(value)
    }
}

impl GpuDeviceHandle for FakeHandle<'_> {
    fn uuid(&self) -> Result<String, BoxError> {
        self.read("uuid", self.device.uuid.clone())
    }

    fn name(&self) -> Result<String, BoxError> {
        self.read("name", self.device.name.clone())
    }

    fn minor_number(&self) -> Result<u32, BoxError> {
        self.read("minor number", self.device.minor_number)
    }

    fn temperature(&self) -> Result<u32, BoxError> {
        self.read("temperature", self.device.temperature)
    }

    fn power_usage(&self) -> Result<u32, BoxError> {
        self.read("power usage", self.device.power_usage)
    }

    fn fan_speed(&self) -> Result<u32, BoxError> {
        self.read("fan speed", self.device.fan_speed)
    }

    fn memory_info(&self) -> Result<(u64, u64), BoxError> {
        self.read("memory info", self.device.memory)
    }

    fn utilization_rates(&self) -> Result<(u32, u32), BoxError> {
        self.read("utilization rates", self.device.utilization)
    }

    fn average_gpu_utilization(&self, window: Duration) -> Result<f64, BoxError> {
        if let Ok(mut last) = self.gpu.last_window.lock() {
            *last = Some(window);
        }
        self.read("average utilization", self.device.average)
    }
}

/// Emits one gauge per pass and counts its passes.
pub struct CountingCollector {
    pub passes: Arc<AtomicUsize>,
}

impl Collector for CountingCollector {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn update(&self, sink: &mut dyn MetricSink) -> Result<(), CollectError> {
        let n = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        sink.emit(Sample::gauge("test_passes", "Passes so far.", n as f64).with_label("device", "fake0"));
        Ok(())
    }
}

/// Always fails after emitting a sample that must never be exported.
pub struct FailingCollector;

impl Collector for FailingCollector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn update(&self, sink: &mut dyn MetricSink) -> Result<(), CollectError> {
        sink.emit(Sample::gauge("test_partial", "Must not be exported.", 1.0));
        Err(CollectError::PlatformQuery("getifaddrs failed".into()))
    }
}

/// Succeeds on its first pass, then panics on every later one.
pub struct FlakyCollector {
    pub passes: AtomicUsize,
}

impl Collector for FlakyCollector {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn update(&self, sink: &mut dyn MetricSink) -> Result<(), CollectError> {
        if self.passes.fetch_add(1, Ordering::SeqCst) > 0 {
            panic!("driver handle went away");
        }
        sink.emit(Sample::gauge("test_flaky_value", "Value from the first pass.", 42.0));
        Ok(())
    }
}
