//! mDNS/DNS-SD discovery: a background-threaded listener accumulates
//! resolved services into a host table, and `update()` flushes it into the
//! store once per tick, mirroring `MDNSScraper._update()`'s
//! lock-drain-clear cadence.

mod listener;
mod mac;

use std::collections::HashMap;

use lanpets_runtime::{CollectorError, Worker};
use lanpets_store::Store;
use lanpets_types::{ExtraNetworkInfoType, NetworkInterfaceInfo};
use listener::MdnsListener;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MdnsSettings {
    pub time_between_updates_sec: u64,
}

impl Default for MdnsSettings {
    fn default() -> Self {
        Self { time_between_updates_sec: 600 }
    }
}

pub struct MdnsBrowser {
    store: Store,
    listener: MdnsListener,
}

impl MdnsBrowser {
    /// Spawns the background daemon thread immediately; `update()` only
    /// ever drains what it has already collected, it never blocks on
    /// discovery.
    pub fn new(store: Store, _settings: MdnsSettings) -> Self {
        Self { store, listener: MdnsListener::spawn() }
    }
}

#[async_trait::async_trait]
impl Worker for MdnsBrowser {
    fn name(&self) -> &str {
        "mdns"
    }

    async fn update(&self) -> Result<(), CollectorError> {
        let entries = self.listener.drain();
        let count = entries.len();
        let timestamp = now_unix();

        for entry in entries {
            let record = NetworkInterfaceInfo {
                timestamp,
                ip: Some(entry.ip),
                mac: entry.mac,
                dns_hostname: None,
                mdns_hostname: Some(entry.host),
            };
            let mut extra: HashMap<ExtraNetworkInfoType, String> = HashMap::new();
            extra.insert(ExtraNetworkInfoType::MdnsName, entry.name);
            if !entry.services.is_empty() {
                let mut services: Vec<String> = entry.services.into_iter().collect();
                services.sort();
                extra.insert(ExtraNetworkInfoType::MdnsServices, services.join(","));
            }
            if let Err(error) = self.store.add_network_info(record, extra).await {
                tracing::warn!(error = %error, "failed to upsert mdns-discovered host");
            }
        }

        tracing::debug!(count, "mdns found clients");
        Ok(())
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_the_ten_minute_cadence_other_collectors_use() {
        let settings = MdnsSettings::default();
        assert_eq!(settings.time_between_updates_sec, 600);
    }
}
