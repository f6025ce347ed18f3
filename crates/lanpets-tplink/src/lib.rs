//! TP-Link router scraper: RSA-authenticated admin-UI session, DHCP table
//! ingestion via the Identity Merger, and per-IP traffic matching.

mod http;
mod rsa;

use std::collections::HashMap;

use lanpets_runtime::{CollectorError, Worker};
use lanpets_store::Store;
use lanpets_types::{ExtraNetworkInfoType, NetworkInterfaceInfo};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TpLinkSettings {
    pub router_ip: String,
    pub username: String,
    pub password: String,
    pub update_period_sec: i64,
    pub collect_traffic_data: bool,
}

impl Default for TpLinkSettings {
    fn default() -> Self {
        Self {
            router_ip: String::new(),
            username: "admin".into(),
            password: String::new(),
            update_period_sec: 600,
            collect_traffic_data: true,
        }
    }
}

pub struct TpLinkScraper {
    store: Store,
    hard_coded: HashMap<String, NetworkInterfaceInfo>,
    settings: TpLinkSettings,
}

impl TpLinkScraper {
    pub fn new(store: Store, hard_coded: HashMap<String, NetworkInterfaceInfo>, settings: TpLinkSettings) -> Self {
        Self { store, hard_coded, settings }
    }
}

#[async_trait::async_trait]
impl Worker for TpLinkScraper {
    fn name(&self) -> &str {
        "tplink"
    }

    async fn update(&self) -> Result<(), CollectorError> {
        let now = now_unix();
        self.store
            .delete_entries_older_than(lanpets_store::RetentionTable::Traffic, now - self.settings.update_period_sec)
            .await
            .map_err(CollectorError::Fatal)?;

        let settings = self.settings.clone();
        let scrape = tokio::task::spawn_blocking(move || scrape_router(&settings))
            .await
            .map_err(|error| CollectorError::Transient(format!("join blocking scrape task: {error}")))?;

        let scraped = match scrape {
            Ok(scraped) => scraped,
            Err(error) => {
                tracing::error!(error = %error, "tp-link scrape failed");
                return Err(CollectorError::Transient(error));
            }
        };

        for (_mac, (device, extra)) in scraped.devices {
            if let Err(error) = self.store.add_network_info(device, extra).await {
                tracing::warn!(error = %error, "failed to upsert tp-link device");
            }
        }

        if !self.settings.collect_traffic_data {
            return Ok(());
        }

        let pets = self.store.list_pets().await.map_err(CollectorError::Fatal)?;
        let interfaces = self
            .store
            .resolve_pets_to_interfaces(pets, self.hard_coded.clone())
            .await
            .map_err(CollectorError::Fatal)?;

        for traffic_entry in &scraped.traffic {
            for (name, iface) in &interfaces {
                if iface.ip.as_deref() == Some(traffic_entry.addr.as_str()) {
                    if let Err(error) = self
                        .store
                        .append_traffic(name.clone(), traffic_entry.rx_bytes, traffic_entry.tx_bytes, now)
                        .await
                    {
                        tracing::warn!(pet = %name, error = %error, "failed to record tp-link traffic sample");
                    }
                }
            }
        }
        Ok(())
    }
}

struct ScrapeResult {
    devices: HashMap<String, (NetworkInterfaceInfo, HashMap<ExtraNetworkInfoType, String>)>,
    traffic: Vec<http::TrafficEntry>,
}

fn scrape_router(settings: &TpLinkSettings) -> Result<ScrapeResult, String> {
    let mut session = http::TpLinkSession::new(settings.router_ip.clone(), settings.username.clone(), settings.password.clone());
    let clients = session.get_dhcp_clients()?;
    let reservations = session.get_dhcp_static_reservations()?;
    let traffic = session.get_traffic_stats()?;

    let now = now_unix();
    let mut devices: HashMap<String, (NetworkInterfaceInfo, HashMap<ExtraNetworkInfoType, String>)> = HashMap::new();

    for entry in reservations {
        let mut extra = HashMap::new();
        let decoded_note = percent_decode_str(&entry.note).decode_utf8_lossy().into_owned();
        extra.insert(ExtraNetworkInfoType::RouterDescription, decoded_note);
        let info = NetworkInterfaceInfo {
            timestamp: now,
            mac: Some(entry.mac.clone()),
            ip: Some(entry.ip),
            dns_hostname: None,
            mdns_hostname: None,
        };
        devices.insert(entry.mac, (info, extra));
    }

    for entry in clients {
        let (_info, extra) = devices.entry(entry.macaddr.clone()).or_insert_with(|| {
            (
                NetworkInterfaceInfo {
                    timestamp: now,
                    mac: Some(entry.macaddr.clone()),
                    ip: Some(entry.ipaddr.clone()),
                    dns_hostname: None,
                    mdns_hostname: None,
                },
                HashMap::new(),
            )
        });
        if entry.name != "--" {
            extra.insert(ExtraNetworkInfoType::DhcpName, entry.name);
        }
    }

    Ok(ScrapeResult { devices, traffic })
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
