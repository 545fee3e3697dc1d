// Network interface statistic records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A per-device statistics record as returned by a platform API.
///
/// Normalization serializes the whole record, so any numeric field added to an
/// implementor shows up in [`NormalizedStats`] without further changes.
pub trait StatRecord: Serialize {
    /// Serialized key carrying the device identity; dropped after flattening.
    const NAME_FIELD: &'static str = "name";

    fn device_name(&self) -> &str;
}

/// Interface counters read from the OS at query time. Totals since boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatRecord {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
}

impl StatRecord for NetworkStatRecord {
    fn device_name(&self) -> &str {
        &self.name
    }
}

/// Field name -> value for one device, without the identity field.
pub type NormalizedStats = BTreeMap<String, u64>;

/// Interface name -> normalized counters, one entry per retained interface.
pub type NetDevStats = BTreeMap<String, NormalizedStats>;
