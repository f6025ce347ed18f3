//! The nmap bridge: `update()` kicks off a background scan if none is in
//! flight, `check()` ingests whatever the last scan found.

mod runner;
mod xml;

use std::collections::HashMap;

use lanpets_runtime::{CollectorError, Worker};
use lanpets_store::Store;
use lanpets_types::{ExtraNetworkInfoType, NetworkInterfaceInfo};
use runner::NmapRunner;
use serde::{Deserialize, Serialize};

pub use xml::ScanHost;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NmapSettings {
    /// nmap target syntax, e.g. `192.168.1.0/24` or `192.168.1.100-255`.
    pub ip_ranges: String,
    pub time_between_scans_sec: u64,
    /// Run `nmap` under `sudo` (some flags, e.g. OS detection, need root);
    /// `nmap_interface.py`'s `sudo=self.settings.use_sudo` passthrough.
    pub use_sudo: bool,
    /// Overrides the default `-sn` discovery sweep, e.g. `"-sV --open -T4"`
    /// for service/version detection. Absent means the bare ping sweep.
    pub nmap_flags: Option<String>,
}

impl Default for NmapSettings {
    fn default() -> Self {
        Self { ip_ranges: "192.168.1.0/24".into(), time_between_scans_sec: 600, use_sudo: false, nmap_flags: None }
    }
}

pub struct NmapBridge {
    store: Store,
    settings: NmapSettings,
    runner: NmapRunner,
}

impl NmapBridge {
    pub fn new(store: Store, settings: NmapSettings) -> Self {
        Self { store, settings, runner: NmapRunner::new() }
    }
}

#[async_trait::async_trait]
impl Worker for NmapBridge {
    fn name(&self) -> &str {
        "nmap"
    }

    async fn update(&self) -> Result<(), CollectorError> {
        if self.runner.in_progress() {
            tracing::warn!("attempting new nmap scan while previous run has not completed");
            return Ok(());
        }
        self.runner.scan_ranges(&self.settings.ip_ranges, self.settings.nmap_flags.as_deref(), self.settings.use_sudo);
        Ok(())
    }

    async fn check(&self) -> Result<(), CollectorError> {
        let Some(result) = self.runner.take_result() else { return Ok(()) };
        let hosts = match result {
            Ok(hosts) => hosts,
            Err(error) => {
                tracing::warn!(error = %error, "nmap scan failed");
                return Ok(());
            }
        };

        let timestamp = now_unix();
        for (ip, host) in hosts {
            let record = NetworkInterfaceInfo {
                timestamp,
                ip: Some(ip),
                mac: host.mac.clone(),
                dns_hostname: host.hostname.clone(),
                mdns_hostname: None,
            };
            let mut extra: HashMap<ExtraNetworkInfoType, String> = HashMap::new();
            if let Some(services) = xml::render_services(&host) {
                extra.insert(ExtraNetworkInfoType::NmapServices, services);
            }
            if let Err(error) = self.store.add_network_info(record, extra).await {
                tracing::warn!(error = %error, "failed to upsert nmap-discovered host");
            }
        }
        Ok(())
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_use_discovery_sweep_without_sudo() {
        let settings = NmapSettings::default();
        assert!(settings.nmap_flags.is_none());
        assert!(!settings.use_sudo);
    }
}
