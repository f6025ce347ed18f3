//! MAC address normalization and the ARP-cache fallback lookup used when a
//! service advertisement doesn't carry a `mac` TXT property.
//!
//! The Python original's `get_mac_for_ip_address`/`standardize_mac_address`
//! helpers are referenced from `mdns_service.py` but their bodies are not
//! present in the retrieved source tree, so this is authored fresh: the ARP
//! fallback reads the kernel's neighbor table from `/proc/net/arp` (the
//! standard place a Linux host keeps it, and the cheapest way to ask "what's
//! this IP's hardware address" without shelling out to `arp` or raising
//! raw sockets), and normalization matches the dash-joined-hex-pair
//! convention the rest of the store already uses (see `lanpets-nmap`'s MAC
//! handling).

use std::fs;

/// Renders any common MAC spelling (colon-, dash-, or dot-separated, mixed
/// case) as upper-case hex pairs joined by dashes, e.g. `a4:77:33:75:bc:c0`
/// -> `A4-77-33-75-BC-C0`.
pub fn standardize_mac_address(raw: &str) -> Option<String> {
    let hex_only: String = raw.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if hex_only.len() != 12 {
        return None;
    }
    let mut groups = Vec::with_capacity(6);
    for chunk in hex_only.as_bytes().chunks(2) {
        groups.push(std::str::from_utf8(chunk).ok()?.to_ascii_uppercase());
    }
    Some(groups.join("-"))
}

/// Looks up `ip`'s hardware address in the kernel ARP table. Returns `None`
/// if the table is unreadable (non-Linux, permissions, container without
/// `/proc`) or the address isn't a resident entry yet — this is a
/// best-effort fallback, not a guarantee.
pub fn get_mac_for_ip_address(ip: &str) -> Option<String> {
    let contents = fs::read_to_string("/proc/net/arp").ok()?;
    for line in contents.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let entry_ip = fields.next()?;
        if entry_ip != ip {
            continue;
        }
        let hw_address = fields.nth(2)?;
        if hw_address == "00:00:00:00:00:00" {
            return None;
        }
        return Some(hw_address.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_colon_separated_lowercase_mac() {
        assert_eq!(standardize_mac_address("a4:77:33:75:bc:c0"), Some("A4-77-33-75-BC-C0".to_string()));
    }

    #[test]
    fn standardizes_already_dashed_uppercase_mac() {
        assert_eq!(standardize_mac_address("A4-77-33-75-BC-C0"), Some("A4-77-33-75-BC-C0".to_string()));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(standardize_mac_address("not-a-mac"), None);
        assert_eq!(standardize_mac_address(""), None);
    }

    #[test]
    fn arp_lookup_returns_none_when_proc_net_arp_is_unreadable_or_missing_entry() {
        assert_eq!(get_mac_for_ip_address("203.0.113.42"), None);
    }
}
