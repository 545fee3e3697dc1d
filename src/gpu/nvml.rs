// NVIDIA backend via nvml-wrapper. `Nvml` calls nvmlShutdown in its Drop impl,
// so the session lives exactly as long as the boxed `NvmlSession`.

use super::{GpuApi, GpuDeviceHandle, GpuSession};
use crate::error::{BoxError, CollectError};
use nvml_wrapper::enum_wrappers::device::{Sampling, TemperatureSensor};
use nvml_wrapper::enums::device::SampleValue;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::{Device, Nvml};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub struct NvmlApi {
    fan_index: u32,
}

impl NvmlApi {
    pub fn new(fan_index: u32) -> Self {
        Self { fan_index }
    }
}

impl GpuApi for NvmlApi {
    fn open(&self) -> Result<Box<dyn GpuSession + '_>, CollectError> {
        let nvml = Nvml::init().map_err(|e| CollectError::VendorUnavailable(e.to_string()))?;
        Ok(Box::new(NvmlSession {
            nvml,
            fan_index: self.fan_index,
        }))
    }
}

struct NvmlSession {
    nvml: Nvml,
    fan_index: u32,
}

impl GpuSession for NvmlSession {
    fn driver_version(&self) -> Result<String, BoxError> {
        Ok(self.nvml.sys_driver_version()?)
    }

    fn device_count(&self) -> Result<u32, BoxError> {
        Ok(self.nvml.device_count()?)
    }

    fn device(&self, index: u32) -> Result<Box<dyn GpuDeviceHandle + '_>, BoxError> {
        let device = self.nvml.device_by_index(index)?;
        Ok(Box::new(NvmlDevice {
            device,
            fan_index: self.fan_index,
        }))
    }
}

struct NvmlDevice<'nvml> {
    device: Device<'nvml>,
    fan_index: u32,
}

impl GpuDeviceHandle for NvmlDevice<'_> {
    fn uuid(&self) -> Result<String, BoxError> {
        Ok(self.device.uuid()?)
    }

    fn name(&self) -> Result<String, BoxError> {
        Ok(self.device.name()?)
    }

    fn minor_number(&self) -> Result<u32, BoxError> {
        #[cfg(target_os = "linux")]
        {
            Ok(self.device.minor_number()?)
        }
        #[cfg(not(target_os = "linux"))]
        {
            Err("minor number is only reported on Linux".into())
        }
    }

    fn temperature(&self) -> Result<u32, BoxError> {
        Ok(self.device.temperature(TemperatureSensor::Gpu)?)
    }

    fn power_usage(&self) -> Result<u32, BoxError> {
        Ok(self.device.power_usage()?)
    }

    fn fan_speed(&self) -> Result<u32, BoxError> {
        Ok(self.device.fan_speed(self.fan_index)?)
    }

    fn memory_info(&self) -> Result<(u64, u64), BoxError> {
        let info = self.device.memory_info()?;
        Ok((info.total, info.used))
    }

    fn utilization_rates(&self) -> Result<(u32, u32), BoxError> {
        let rates = self.device.utilization_rates()?;
        Ok((rates.gpu, rates.memory))
    }

    /// Mean of the driver's utilization samples newer than `now - window`.
    fn average_gpu_utilization(&self, window: Duration) -> Result<f64, BoxError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
        let since = now.saturating_sub(window).as_micros() as u64;
        let samples = match self.device.samples(Sampling::GpuUtilization, since) {
            Ok(s) => s,
            // No samples recorded inside the window yet.
            Err(NvmlError::NotFound) => return Ok(0.0),
            Err(e) => return Err(e.into()),
        };
        if samples.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = samples.iter().map(|s| sample_value(&s.value)).sum();
        Ok(total / samples.len() as f64)
    }
}

#[allow(unreachable_patterns)]
fn sample_value(value: &SampleValue) -> f64 {
    match *value {
        SampleValue::F64(v) => v,
        SampleValue::U32(v) => f64::from(v),
        SampleValue::U64(v) => v as f64,
        SampleValue::I64(v) => v as f64,
        _ => 0.0,
    }
}
