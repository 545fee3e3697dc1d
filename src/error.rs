// Error taxonomy for collection passes and metric exposition

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CollectError {
    /// The OS/platform statistics call itself failed.
    #[error("platform statistics query failed: {0}")]
    PlatformQuery(String),

    /// A retained record could not be flattened into numeric fields.
    #[error("cannot normalize statistics for device {device}: {reason}")]
    Normalization { device: String, reason: String },

    /// The GPU management library could not be initialized.
    #[error("GPU management API unavailable: {0}")]
    VendorUnavailable(String),

    /// A system-wide GPU read (driver version, device count) failed.
    #[error("GPU {field} query failed: {source}")]
    VendorQuery {
        field: &'static str,
        #[source]
        source: BoxError,
    },

    /// A per-device telemetry read failed mid-enumeration.
    #[error("GPU {index}: reading {field} failed: {source}")]
    VendorRead {
        index: u32,
        field: &'static str,
        #[source]
        source: BoxError,
    },

    /// The pass never returned (it panicked or its task was cancelled).
    #[error("collector pass aborted: {0}")]
    Aborted(String),
}

impl CollectError {
    pub fn normalization(device: impl Into<String>, reason: impl Into<String>) -> Self {
        CollectError::Normalization {
            device: device.into(),
            reason: reason.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CollectError::VendorUnavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error("metric registration failed: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("metric encoding produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
