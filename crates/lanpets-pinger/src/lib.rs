//! ICMP availability collector: one ping per resolved pet per tick, fanned
//! out across a bounded pool of concurrent echoes.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use lanpets_runtime::{CollectorError, Worker};
use lanpets_store::Store;
use lanpets_types::NetworkInterfaceInfo;
use rand::Rng;
use serde::{Deserialize, Serialize};
use surge_ping::{Client, Config as PingConfig, PingIdentifier, PingSequence};
use tokio::task::JoinSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PingerSettings {
    pub update_period_sec: u64,
    /// How far back availability rows are kept; evicted on every tick
    /// entry, matching `DBInterface.delete_old_availablity` in the
    /// original collector.
    pub history_len_sec: i64,
}

impl Default for PingerSettings {
    fn default() -> Self {
        Self { update_period_sec: 60, history_len_sec: 7 * 24 * 3600 }
    }
}

const PING_TIMEOUT: Duration = Duration::from_secs(1);
/// Bounds the number of in-flight echoes; a LAN with a few dozen pets
/// never needs more, and it keeps a misbehaving resolver from spawning an
/// unbounded number of concurrent lookups.
const MAX_IN_FLIGHT: usize = 32;

pub struct Pinger {
    store: Store,
    hard_coded: HashMap<String, NetworkInterfaceInfo>,
    settings: PingerSettings,
    client: Client,
}

impl Pinger {
    pub fn new(
        store: Store,
        hard_coded: HashMap<String, NetworkInterfaceInfo>,
        settings: PingerSettings,
    ) -> Result<Self, String> {
        let client = Client::new(&PingConfig::default()).map_err(|error| format!("create icmp client: {error}"))?;
        Ok(Self { store, hard_coded, settings, client })
    }
}

#[async_trait::async_trait]
impl Worker for Pinger {
    fn name(&self) -> &str {
        "pinger"
    }

    async fn update(&self) -> Result<(), CollectorError> {
        let now = now_unix();
        self.store
            .delete_entries_older_than(lanpets_store::RetentionTable::Availability, now - self.settings.history_len_sec)
            .await
            .map_err(CollectorError::Fatal)?;

        let pets = self.store.list_pets().await.map_err(CollectorError::Fatal)?;
        let interfaces = self
            .store
            .resolve_pets_to_interfaces(pets.clone(), self.hard_coded.clone())
            .await
            .map_err(CollectorError::Fatal)?;

        let mut hosts = Vec::new();
        for pet in &pets {
            let Some(iface) = interfaces.get(&pet.name) else { continue };
            let host = iface.ip.clone().or_else(|| iface.dns_hostname.clone());
            if let Some(host) = host {
                hosts.push((pet.name.clone(), host));
            }
        }

        let mut tasks = JoinSet::new();
        let mut pending = hosts.into_iter();
        let mut in_flight = 0usize;
        let mut results = Vec::new();

        loop {
            while in_flight < MAX_IN_FLIGHT {
                let Some((name, host)) = pending.next() else { break };
                let client = self.client.clone();
                tasks.spawn(async move {
                    let online = check_host(&client, &host).await;
                    (name, online)
                });
                in_flight += 1;
            }
            let Some(joined) = tasks.join_next().await else { break };
            in_flight -= 1;
            match joined {
                Ok(result) => results.push(result),
                Err(error) => tracing::warn!(error = %error, "ping task panicked"),
            }
        }

        for (name, online) in results {
            if let Err(error) = self.store.append_availability(name.clone(), online, now).await {
                tracing::warn!(pet = %name, error = %error, "failed to record availability sample");
            }
        }
        Ok(())
    }
}

async fn check_host(client: &Client, host: &str) -> bool {
    let Some(addr) = resolve_host(host).await else { return false };
    let identifier = PingIdentifier(rand::thread_rng().gen());
    let mut pinger = client.pinger(addr, identifier).await;
    pinger.timeout(PING_TIMEOUT);
    match pinger.ping(PingSequence(0), &[]).await {
        Ok(_) => true,
        Err(error) => {
            tracing::debug!(%host, error = %error, "ping failed");
            false
        }
    }
}

async fn resolve_host(host: &str) -> Option<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(ip);
    }
    tokio::net::lookup_host((host, 0))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_week_long_history() {
        let settings = PingerSettings::default();
        assert_eq!(settings.update_period_sec, 60);
        assert_eq!(settings.history_len_sec, 604_800);
    }

    #[tokio::test]
    async fn resolve_host_parses_literal_ip_without_dns() {
        let resolved = resolve_host("127.0.0.1").await;
        assert_eq!(resolved, Some(IpAddr::from([127, 0, 0, 1])));
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// `Arc` is used by `Supervisor::run`'s worker list; re-exported so the
// `monitor` binary doesn't need to depend on `lanpets-runtime` just for
// the type alias it wires workers through.
pub type SharedWorker = Arc<dyn lanpets_runtime::Worker>;
