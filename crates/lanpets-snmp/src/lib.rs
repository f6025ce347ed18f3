//! SNMPv1 poller: walks the router's ARP cache for `(ip, mac)` pairs, then
//! queries each resolved pet directly for CPU/memory (and, if enabled,
//! interface byte counters) over raw UDP/161.

mod ber;
mod oids;
mod packet;

use std::collections::HashMap;

use lanpets_runtime::{CollectorError, Worker};
use lanpets_store::Store;
use lanpets_types::NetworkInterfaceInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpSettings {
    pub router_ip: String,
    pub community: String,
    pub time_between_scans_sec: u64,
    pub collect_traffic_data: bool,
}

impl Default for SnmpSettings {
    fn default() -> Self {
        Self { router_ip: String::new(), community: "public".into(), time_between_scans_sec: 600, collect_traffic_data: false }
    }
}

pub struct SnmpPoller {
    store: Store,
    hard_coded: HashMap<String, NetworkInterfaceInfo>,
    settings: SnmpSettings,
}

impl SnmpPoller {
    pub fn new(store: Store, hard_coded: HashMap<String, NetworkInterfaceInfo>, settings: SnmpSettings) -> Self {
        Self { store, hard_coded, settings }
    }
}

#[async_trait::async_trait]
impl Worker for SnmpPoller {
    fn name(&self) -> &str {
        "snmp"
    }

    async fn update(&self) -> Result<(), CollectorError> {
        let now = now_unix();

        match oids::get_attached_ips(&self.settings.router_ip, &self.settings.community).await {
            Ok(pairs) => {
                for (ip, mac) in pairs {
                    let record = NetworkInterfaceInfo { timestamp: now, ip: Some(ip), mac: Some(mac), dns_hostname: None, mdns_hostname: None };
                    if let Err(error) = self.store.add_network_info(record, HashMap::new()).await {
                        tracing::error!(error = %error, "invariant violation merging snmp arp entry");
                    }
                }
            }
            Err(error) => {
                tracing::error!(router = %self.settings.router_ip, error = %error, "snmp arp walk against router failed");
                return Err(CollectorError::Transient(error));
            }
        }

        let pets = self.store.list_pets().await.map_err(CollectorError::Fatal)?;
        let interfaces = self
            .store
            .resolve_pets_to_interfaces(pets.clone(), self.hard_coded.clone())
            .await
            .map_err(CollectorError::Fatal)?;

        for pet in &pets {
            let Some(iface) = interfaces.get(&pet.name) else { continue };
            let Some(host) = iface.ip.clone().or_else(|| iface.dns_hostname.clone()) else { continue };

            match poll_pet(&host, &self.settings.community).await {
                Ok(Some((cpu, mem))) => {
                    if let Err(error) = self.store.append_cpu(pet.name.clone(), cpu, mem, now).await {
                        tracing::warn!(pet = %pet.name, error = %error, "failed to record cpu sample");
                    }
                }
                Ok(None) => tracing::debug!(pet = %pet.name, "snmp host reported no cpu/memory stats"),
                Err(error) => tracing::debug!(pet = %pet.name, %host, error = %error, "snmp poll of pet failed"),
            }

            if self.settings.collect_traffic_data {
                match oids::get_interface_bytes(&host, &self.settings.community).await {
                    Ok(Some((rx, tx))) => {
                        if let Err(error) = self.store.append_traffic(pet.name.clone(), rx, tx, now).await {
                            tracing::warn!(pet = %pet.name, error = %error, "failed to record snmp traffic sample");
                        }
                    }
                    Ok(None) => {}
                    Err(error) => tracing::debug!(pet = %pet.name, %host, error = %error, "snmp interface counter poll failed"),
                }
            }
        }
        Ok(())
    }
}

async fn poll_pet(host: &str, community: &str) -> Result<Option<(f64, f64)>, String> {
    let cpu = oids::get_cpu_used_percent(host, community).await?;
    let mem = oids::get_memory_used_percent(host, community).await?;
    Ok(match (cpu, mem) {
        (Some(cpu), Some(mem)) => Some((cpu, mem)),
        _ => None,
    })
}

fn now_unix() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_disable_traffic_and_use_public_community() {
        let settings = SnmpSettings::default();
        assert_eq!(settings.community, "public");
        assert!(!settings.collect_traffic_data);
    }
}
