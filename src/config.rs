use crate::filter::DeviceFilter;
use crate::{gpu, netdev};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub collectors: CollectorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub sample_interval_ms: u64,
    /// How often to log pass totals at INFO level.
    pub stats_log_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    /// Prefix of every exported metric name.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

fn default_namespace() -> String {
    "node".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectorsConfig {
    #[serde(default)]
    pub netdev: NetDevConfig,
    #[serde(default)]
    pub gpu: GpuConfig,
}

impl CollectorsConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        match name {
            netdev::COLLECTOR_NAME => self.netdev.enabled,
            gpu::COLLECTOR_NAME => self.gpu.enabled,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetDevConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interface names skipped verbatim.
    #[serde(default)]
    pub ignored_devices: Vec<String>,
    /// Regex of interfaces to skip. Exclusive with `device_include`.
    #[serde(default)]
    pub device_exclude: Option<String>,
    /// Regex of interfaces to keep; everything else is skipped.
    #[serde(default)]
    pub device_include: Option<String>,
}

impl Default for NetDevConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignored_devices: Vec::new(),
            device_exclude: None,
            device_include: None,
        }
    }
}

impl NetDevConfig {
    pub fn filter(&self) -> anyhow::Result<DeviceFilter> {
        Ok(DeviceFilter::new(
            self.ignored_devices.iter().cloned(),
            self.device_exclude.as_deref(),
            self.device_include.as_deref(),
        )?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpuConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_average_window_secs")]
    pub average_window_secs: u64,
    #[serde(default)]
    pub fan_index: u32,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            average_window_secs: default_average_window_secs(),
            fan_index: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_average_window_secs() -> u64 {
    10
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            is_valid_namespace(&self.exporter.namespace),
            "exporter.namespace must match [a-zA-Z_][a-zA-Z0-9_]*, got {:?}",
            self.exporter.namespace
        );

        let netdev = &self.collectors.netdev;
        anyhow::ensure!(
            netdev.device_exclude.is_none() || netdev.device_include.is_none(),
            "collectors.netdev.device_exclude and collectors.netdev.device_include are mutually exclusive"
        );
        if let Err(e) = netdev.filter() {
            anyhow::bail!("collectors.netdev has an invalid device pattern: {}", e);
        }

        anyhow::ensure!(
            self.collectors.gpu.average_window_secs > 0,
            "collectors.gpu.average_window_secs must be > 0, got {}",
            self.collectors.gpu.average_window_secs
        );
        Ok(())
    }
}

fn is_valid_namespace(ns: &str) -> bool {
    let mut chars = ns.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
