// Interface counters via sysinfo

use super::NetStatsSource;
use crate::error::CollectError;
use crate::models::NetworkStatRecord;
use std::sync::Mutex;
use sysinfo::Networks;

pub struct SysinfoNetSource {
    networks: Mutex<Networks>,
}

impl Default for SysinfoNetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoNetSource {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl NetStatsSource for SysinfoNetSource {
    type Record = NetworkStatRecord;

    fn interface_stats(&self) -> Result<Vec<NetworkStatRecord>, CollectError> {
        let mut networks = self.networks.lock().map_err(|e| {
            CollectError::PlatformQuery(format!("sysinfo networks lock poisoned: {e}"))
        })?;
        // Drops interfaces that disappeared since the previous pass.
        networks.refresh(true);
        Ok(networks
            .list()
            .iter()
            .map(|(name, data)| NetworkStatRecord {
                name: name.clone(),
                bytes_sent: data.total_transmitted(),
                bytes_recv: data.total_received(),
                packets_sent: data.total_packets_transmitted(),
                packets_recv: data.total_packets_received(),
                errin: data.total_errors_on_received(),
                errout: data.total_errors_on_transmitted(),
            })
            .collect())
    }
}
