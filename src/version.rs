// Build-time identity from Cargo.toml

use crate::collector::metric_name;
use crate::models::Sample;

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Constant 1 gauge carrying the exporter version as a label.
pub fn build_info_sample(namespace: &str) -> Sample {
    Sample::gauge(
        metric_name(&[namespace, "exporter", "build_info"]),
        "Exporter build information.",
        1.0,
    )
    .with_label("version", VERSION)
}
