//! Runs the `mdns-sd` service daemon on a dedicated OS thread (the daemon's
//! event channel is a plain `std::sync::mpsc`-style receiver, not an async
//! one, so it doesn't belong on a tokio worker) and maintains the
//! `mdns_host -> MdnsEntry` table the original's `MyListener.entries` dict
//! played the same role for.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use mdns_sd::{ServiceDaemon, ServiceEvent};

use crate::mac::{get_mac_for_ip_address, standardize_mac_address};

const META_SERVICE: &str = "_services._dns-sd._udp.local.";

#[derive(Debug, Clone)]
pub struct MdnsEntry {
    pub host: String,
    pub name: String,
    pub ip: String,
    pub services: HashSet<String>,
    pub mac: Option<String>,
}

#[derive(Default)]
struct Table {
    entries: HashMap<String, MdnsEntry>,
}

#[derive(Clone)]
pub struct MdnsListener {
    table: Arc<Mutex<Table>>,
}

impl MdnsListener {
    /// Spawns the daemon thread. Failure to start the daemon at all (no
    /// multicast-capable interface, permissions) is reported once and the
    /// listener simply never populates its table afterward.
    pub fn spawn() -> Self {
        let table = Arc::new(Mutex::new(Table::default()));
        let worker_table = table.clone();
        std::thread::Builder::new()
            .name("mdns-listener".into())
            .spawn(move || run_daemon(worker_table))
            .expect("spawn mdns listener thread");
        Self { table }
    }

    /// Drains every entry collected since the last call, clearing the
    /// table, matching the original's "upsert everything, then reset
    /// `entries = {}`" per-tick cadence.
    pub fn drain(&self) -> Vec<MdnsEntry> {
        let mut guard = self.table.lock().expect("mdns table mutex poisoned");
        guard.entries.drain().map(|(_, entry)| entry).collect()
    }
}

fn run_daemon(table: Arc<Mutex<Table>>) {
    let daemon = match ServiceDaemon::new() {
        Ok(daemon) => daemon,
        Err(error) => {
            tracing::error!(%error, "failed to start mdns service daemon");
            return;
        }
    };

    let meta_receiver = match daemon.browse(META_SERVICE) {
        Ok(receiver) => receiver,
        Err(error) => {
            tracing::error!(%error, "failed to browse mdns service-type meta-query");
            return;
        }
    };

    let mut browsed_types: HashSet<String> = HashSet::new();
    while let Ok(event) = meta_receiver.recv() {
        let ServiceEvent::ServiceFound(_, fullname) = event else { continue };
        if !browsed_types.insert(fullname.clone()) {
            continue;
        }
        match daemon.browse(&fullname) {
            Ok(receiver) => {
                let table = table.clone();
                let service_type = fullname.clone();
                std::thread::Builder::new()
                    .name("mdns-browser".into())
                    .spawn(move || pump_service_events(receiver, &service_type, table))
                    .expect("spawn mdns per-type browser thread");
            }
            Err(error) => tracing::warn!(%error, service_type = %fullname, "failed to browse mdns service type"),
        }
    }
}

fn pump_service_events(receiver: mdns_sd::Receiver<ServiceEvent>, service_type: &str, table: Arc<Mutex<Table>>) {
    while let Ok(event) = receiver.recv() {
        if let ServiceEvent::ServiceResolved(info) = event {
            handle_resolved(info, service_type, &table);
        }
    }
}

fn handle_resolved(info: mdns_sd::ServiceInfo, service_type: &str, table: &Arc<Mutex<Table>>) {
    let Some(ip) = info.get_addresses().iter().find(|addr| addr.is_ipv4()).map(|addr| addr.to_string()) else {
        return;
    };
    let host = info.get_hostname().to_string();
    if host.is_empty() {
        return;
    }

    let mut display_service = service_type.split('.').next().unwrap_or(service_type).to_string();
    if display_service.starts_with('_') {
        display_service.remove(0);
    }

    let existing_mac = {
        let guard = table.lock().expect("mdns table mutex poisoned");
        guard.entries.get(&host).and_then(|entry| entry.mac.clone())
    };
    let mac = existing_mac.or_else(|| resolve_mac(&info, &ip));

    let display_name_candidate = info.get_fullname().split('.').next().unwrap_or(info.get_fullname()).to_string();

    let mut guard = table.lock().expect("mdns table mutex poisoned");
    let entry = guard.entries.entry(host.clone()).or_insert_with(|| MdnsEntry {
        host: host.clone(),
        name: display_name_candidate.clone(),
        ip: ip.clone(),
        services: HashSet::new(),
        mac: None,
    });
    entry.ip = ip;
    entry.mac = mac;
    entry.services.insert(display_service);
    if entry.name != display_name_candidate {
        // Some devices use a different instance name per service; fall
        // back to the host's own leaf label so the pet resolves to one
        // stable display name regardless of which service answered last.
        entry.name = host.split('.').next().unwrap_or(&host).to_string();
    }
}

fn resolve_mac(info: &mdns_sd::ServiceInfo, ip: &str) -> Option<String> {
    if let Some(property) = info.get_properties().get("mac") {
        let value = property.val_str();
        if !value.is_empty() {
            return standardize_mac_address(value);
        }
    }
    get_mac_for_ip_address(ip).and_then(|mac| standardize_mac_address(&mac))
}
