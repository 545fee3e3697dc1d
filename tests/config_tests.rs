// Config loading and validation tests

use devstat::collector::CollectorRegistry;
use devstat::config::AppConfig;
use devstat::{gpu, netdev};

const VALID_CONFIG: &str = r#"
[server]
port = 9100
host = "0.0.0.0"

[monitoring]
sample_interval_ms = 1000
stats_log_interval_secs = 60

[exporter]
namespace = "node"

[collectors.netdev]
enabled = true
ignored_devices = ["lo"]
device_exclude = "^veth"

[collectors.gpu]
enabled = true
average_window_secs = 10
fan_index = 0
"#;

const MINIMAL_CONFIG: &str = r#"
[server]
port = 9100
host = "127.0.0.1"

[monitoring]
sample_interval_ms = 500
stats_log_interval_secs = 30
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.monitoring.sample_interval_ms, 1000);
    assert_eq!(config.exporter.namespace, "node");
    assert_eq!(config.collectors.netdev.ignored_devices, vec!["lo"]);
    assert_eq!(config.collectors.netdev.device_exclude.as_deref(), Some("^veth"));
    assert_eq!(config.collectors.gpu.average_window_secs, 10);
}

#[test]
fn test_config_defaults_when_sections_omitted() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("minimal");
    assert_eq!(config.exporter.namespace, "node");
    assert!(config.collectors.netdev.enabled);
    assert!(config.collectors.netdev.ignored_devices.is_empty());
    assert!(config.collectors.netdev.device_exclude.is_none());
    assert!(config.collectors.netdev.device_include.is_none());
    assert!(config.collectors.gpu.enabled);
    assert_eq!(config.collectors.gpu.average_window_secs, 10);
    assert_eq!(config.collectors.gpu.fan_index, 0);
}

#[test]
fn test_config_netdev_filter_follows_config() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    let filter = config.collectors.netdev.filter().expect("filter");
    assert!(filter.ignored("lo"));
    assert!(filter.ignored("veth12ab"));
    assert!(!filter.ignored("eth0"));
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 9100", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_sample_interval_zero() {
    let bad = VALID_CONFIG.replace("sample_interval_ms = 1000", "sample_interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sample_interval_ms"));
}

#[test]
fn test_config_validation_rejects_stats_log_interval_zero() {
    let bad = VALID_CONFIG.replace(
        "stats_log_interval_secs = 60",
        "stats_log_interval_secs = 0",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("stats_log_interval_secs"));
}

#[test]
fn test_config_validation_rejects_bad_namespace() {
    let bad = VALID_CONFIG.replace("namespace = \"node\"", "namespace = \"9node-x\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("exporter.namespace"));
}

#[test]
fn test_config_validation_rejects_exclude_and_include_together() {
    let bad = VALID_CONFIG.replace(
        "device_exclude = \"^veth\"",
        "device_exclude = \"^veth\"\ndevice_include = \"^eth\"",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("mutually exclusive"));
}

#[test]
fn test_config_validation_rejects_invalid_device_pattern() {
    let bad = VALID_CONFIG.replace("device_exclude = \"^veth\"", "device_exclude = \"(eth\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("invalid device pattern"));
}

#[test]
fn test_config_validation_rejects_average_window_zero() {
    let bad = VALID_CONFIG.replace("average_window_secs = 10", "average_window_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("average_window_secs"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.collectors.netdev.ignored_devices, vec!["lo"]);
}

#[test]
fn test_registry_builds_enabled_collectors_in_order() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    let registry = CollectorRegistry::from_config(&config).expect("registry");
    assert_eq!(registry.names(), vec!["netdev", "gpu"]);
}

#[test]
fn test_registry_skips_disabled_collectors() {
    let only_netdev = VALID_CONFIG.replace(
        "[collectors.gpu]\nenabled = true",
        "[collectors.gpu]\nenabled = false",
    );
    let config = AppConfig::load_from_str(&only_netdev).expect("valid");
    let registry = CollectorRegistry::from_config(&config).expect("registry");
    assert_eq!(registry.names(), vec!["netdev"]);

    let none = only_netdev.replace(
        "[collectors.netdev]\nenabled = true",
        "[collectors.netdev]\nenabled = false",
    );
    let config = AppConfig::load_from_str(&none).expect("valid");
    let registry = CollectorRegistry::from_config(&config).expect("registry");
    assert!(registry.is_empty());
}

#[test]
fn test_enabled_flags_follow_collector_names() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    assert!(config.collectors.is_enabled(netdev::COLLECTOR_NAME));
    assert!(config.collectors.is_enabled(gpu::COLLECTOR_NAME));
    assert!(!config.collectors.is_enabled("diskstats"));

    let gpu_off = VALID_CONFIG.replace(
        "[collectors.gpu]\nenabled = true",
        "[collectors.gpu]\nenabled = false",
    );
    let config = AppConfig::load_from_str(&gpu_off).expect("valid");
    assert!(config.collectors.is_enabled(netdev::COLLECTOR_NAME));
    assert!(!config.collectors.is_enabled(gpu::COLLECTOR_NAME));
}
