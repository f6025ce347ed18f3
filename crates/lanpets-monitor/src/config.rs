//! The `monitor` process's TOML configuration: one typed settings struct
//! per collector, each defaulted so an absent `[section]` still produces a
//! usable (if inert) worker — `tplink`/`nmap`/`snmp` are the exception,
//! gated behind `Option` since each needs a real device address to be
//! worth running at all (`pet_monitor/settings.py`'s optional-module
//! pattern, see SPEC_FULL.md §3).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lanpets_mdns::MdnsSettings;
use lanpets_nmap::NmapSettings;
use lanpets_petai::PetAiSettings;
use lanpets_pinger::PingerSettings;
use lanpets_snmp::SnmpSettings;
use lanpets_tplink::TpLinkSettings;
use lanpets_types::NetworkInterfaceInfo;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default)]
    pub pinger: PingerSettings,
    #[serde(default)]
    pub mdns: MdnsSettings,
    #[serde(default)]
    pub pet_ai: PetAiSettings,
    pub tplink: Option<TpLinkSettings>,
    pub nmap: Option<NmapSettings>,
    pub snmp: Option<SnmpSettings>,
    #[serde(default)]
    pub hard_coded_pet_interfaces: HashMap<String, HardCodedInterface>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/lanpets.sqlite3")
}

/// The config-file shape of a hard-coded interface override: unlike a
/// collector-observed [`NetworkInterfaceInfo`], it carries no
/// `timestamp` — it isn't an observation, it's a standing fallback for a
/// device the identity merger hasn't resolved yet (spec.md §4.1).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HardCodedInterface {
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub dns_hostname: Option<String>,
    pub mdns_hostname: Option<String>,
}

impl From<HardCodedInterface> for NetworkInterfaceInfo {
    fn from(value: HardCodedInterface) -> Self {
        NetworkInterfaceInfo {
            timestamp: 0,
            mac: value.mac,
            ip: value.ip,
            dns_hostname: value.dns_hostname,
            mdns_hostname: value.mdns_hostname,
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path).map_err(|error| format!("read config {}: {error}", path.display()))?;
        toml::from_str(&text).map_err(|error| format!("parse config {}: {error}", path.display()))
    }

    pub fn hard_coded_interfaces(&self) -> HashMap<String, NetworkInterfaceInfo> {
        self.hard_coded_pet_interfaces.iter().map(|(name, iface)| (name.clone(), iface.clone().into())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_enables_only_always_on_collectors() {
        let config: MonitorConfig = toml::from_str("").unwrap();
        assert!(config.tplink.is_none());
        assert!(config.nmap.is_none());
        assert!(config.snmp.is_none());
        assert_eq!(config.db_path, PathBuf::from("data/lanpets.sqlite3"));
        assert_eq!(config.pinger.update_period_sec, 60);
    }

    #[test]
    fn hard_coded_interface_has_no_timestamp_observation() {
        let toml_src = r#"
            [hard_coded_pet_interfaces.router]
            ip = "192.168.1.1"
        "#;
        let config: MonitorConfig = toml::from_str(toml_src).unwrap();
        let interfaces = config.hard_coded_interfaces();
        assert_eq!(interfaces["router"].ip.as_deref(), Some("192.168.1.1"));
        assert_eq!(interfaces["router"].timestamp, 0);
    }

    #[test]
    fn enabling_tplink_requires_a_full_section() {
        let toml_src = r#"
            [tplink]
            router_ip = "192.168.1.1"
            username = "admin"
            password = "hunter2"
        "#;
        let config: MonitorConfig = toml::from_str(toml_src).unwrap();
        assert!(config.tplink.is_some());
    }
}
