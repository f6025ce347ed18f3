//! Shared vocabulary for the LAN pets monitor: the network-identity model,
//! the pet model, and the time-series sample types every collector and the
//! store agree on.

use serde::{Deserialize, Serialize};

/// An observed network identity. `mac`, `ip` and `dns_hostname` are partial
/// keys: each one, when present, is unique across the whole store. A record
/// with all three absent cannot be admitted (see `is_admissible`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkInterfaceInfo {
    pub timestamp: i64,
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub dns_hostname: Option<String>,
    pub mdns_hostname: Option<String>,
}

impl NetworkInterfaceInfo {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    /// A record with all three identifying fields null carries no identity
    /// and must never be inserted into the store.
    pub fn is_admissible(&self) -> bool {
        self.mac.is_some() || self.ip.is_some() || self.dns_hostname.is_some()
    }
}

/// Bag of typed strings attached to a `NetworkInterfaceInfo` row. At most one
/// value per type per row; deleted along with the interface (cascade).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExtraNetworkInfoType {
    DhcpName,
    RouterDescription,
    MdnsName,
    MdnsServices,
    NmapServices,
}

impl ExtraNetworkInfoType {
    pub fn as_column(&self) -> &'static str {
        match self {
            ExtraNetworkInfoType::DhcpName => "dhcp_name",
            ExtraNetworkInfoType::RouterDescription => "router_description",
            ExtraNetworkInfoType::MdnsName => "mdns_name",
            ExtraNetworkInfoType::MdnsServices => "mdns_services",
            ExtraNetworkInfoType::NmapServices => "nmap_services",
        }
    }

    pub fn from_column(s: &str) -> Option<Self> {
        Some(match s {
            "dhcp_name" => ExtraNetworkInfoType::DhcpName,
            "router_description" => ExtraNetworkInfoType::RouterDescription,
            "mdns_name" => ExtraNetworkInfoType::MdnsName,
            "mdns_services" => ExtraNetworkInfoType::MdnsServices,
            "nmap_services" => ExtraNetworkInfoType::NmapServices,
            _ => return None,
        })
    }
}

/// How a `PetInfo` is resolved to a `NetworkInterfaceInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierType {
    Mac,
    /// Matches either `dns_hostname` or `mdns_hostname`.
    Host,
    Ip,
}

impl IdentifierType {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentifierType::Mac => "MAC",
            IdentifierType::Host => "HOST",
            IdentifierType::Ip => "IP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "MAC" => IdentifierType::Mac,
            "HOST" => IdentifierType::Host,
            "IP" => IdentifierType::Ip,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Pc,
    Laptop,
    Phone,
    Iot,
    Server,
    Router,
    Media,
    Games,
    Other,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Pc => "PC",
            DeviceType::Laptop => "LAPTOP",
            DeviceType::Phone => "PHONE",
            DeviceType::Iot => "IOT",
            DeviceType::Server => "SERVER",
            DeviceType::Router => "ROUTER",
            DeviceType::Media => "MEDIA",
            DeviceType::Games => "GAMES",
            DeviceType::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "PC" => DeviceType::Pc,
            "LAPTOP" => DeviceType::Laptop,
            "PHONE" => DeviceType::Phone,
            "IOT" => DeviceType::Iot,
            "SERVER" => DeviceType::Server,
            "ROUTER" => DeviceType::Router,
            "MEDIA" => DeviceType::Media,
            "GAMES" => DeviceType::Games,
            "OTHER" => DeviceType::Other,
            _ => return None,
        })
    }
}

/// The eight affective states a pet can be in. Order matters: `best_friend`
/// wraps around this exact sequence (`(mood as i64 + {-1,0,1}).rem_euclid(8)`),
/// so it must not be reordered without changing observable behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Jolly = 0,
    Sassy = 1,
    Calm = 2,
    Modest = 3,
    Dreamy = 4,
    Impish = 5,
    Sneaky = 6,
    Shy = 7,
}

pub const MOOD_COUNT: i64 = 8;

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::Jolly,
        Mood::Sassy,
        Mood::Calm,
        Mood::Modest,
        Mood::Dreamy,
        Mood::Impish,
        Mood::Sneaky,
        Mood::Shy,
    ];

    pub fn from_index(i: i64) -> Mood {
        Mood::ALL[i.rem_euclid(MOOD_COUNT) as usize]
    }

    pub fn index(self) -> i64 {
        self as i64
    }

    /// The moods considered affinity-compatible with `self`: itself and its
    /// immediate neighbors, wrapping around the mood sequence.
    pub fn best_friends(self) -> [Mood; 3] {
        let base = self.index();
        [
            Mood::from_index(base - 1),
            Mood::from_index(base),
            Mood::from_index(base + 1),
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Jolly => "JOLLY",
            Mood::Sassy => "SASSY",
            Mood::Calm => "CALM",
            Mood::Modest => "MODEST",
            Mood::Dreamy => "DREAMY",
            Mood::Impish => "IMPISH",
            Mood::Sneaky => "SNEAKY",
            Mood::Shy => "SHY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "JOLLY" => Mood::Jolly,
            "SASSY" => Mood::Sassy,
            "CALM" => Mood::Calm,
            "MODEST" => Mood::Modest,
            "DREAMY" => Mood::Dreamy,
            "IMPISH" => Mood::Impish,
            "SNEAKY" => Mood::Sneaky,
            "SHY" => Mood::Shy,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    Friends,
    Enemy,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::Friends => "FRIENDS",
            Relationship::Enemy => "ENEMY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "FRIENDS" => Relationship::Friends,
            "ENEMY" => Relationship::Enemy,
            _ => return None,
        })
    }
}

/// A user-curated alias for a network interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetInfo {
    pub name: String,
    pub identifier_type: IdentifierType,
    pub identifier_value: String,
    pub device_type: DeviceType,
    pub description: String,
    pub mood: Mood,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficSample {
    pub rx_bytes: i64,
    pub tx_bytes: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvailabilitySample {
    pub is_available: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    pub cpu_used_percent: f64,
    pub mem_used_percent: f64,
    pub timestamp: i64,
}

/// Per-pet mean bytes-per-second derived from a traffic series, plus the raw
/// totals the series covered (used for "Traffic aggregation" style checks).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeanTraffic {
    pub rx_bytes_bps: f64,
    pub tx_bytes_bps: f64,
    pub rx_bytes: i64,
    pub tx_bytes: i64,
}

/// Order two pet names into the canonical `(name1, name2)` pair used by
/// `pet_relationships`: lexicographically smaller first.
pub fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_friends_wraps_around_jolly() {
        // Jolly is index 0; its neighbors wrap to Shy (7) and Sassy (1).
        assert_eq!(Mood::Jolly.best_friends(), [Mood::Shy, Mood::Jolly, Mood::Sassy]);
    }

    #[test]
    fn best_friends_wraps_around_shy() {
        assert_eq!(Mood::Shy.best_friends(), [Mood::Sneaky, Mood::Shy, Mood::Jolly]);
    }

    #[test]
    fn canonical_pair_orders_lexicographically() {
        assert_eq!(canonical_pair("bob", "alice"), ("alice".into(), "bob".into()));
        assert_eq!(canonical_pair("alice", "bob"), ("alice".into(), "bob".into()));
    }

    #[test]
    fn inadmissible_record_has_no_keys() {
        let rec = NetworkInterfaceInfo::new(0);
        assert!(!rec.is_admissible());
    }
}
