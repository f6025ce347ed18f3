//! The handful of MIB-II / UCD-SNMP / HOST-RESOURCES-MIB OIDs this poller
//! cares about, each turned into a typed query over `packet::walk_tree`/
//! `packet::send_request`.

use crate::ber::{SnmpValue, TAG_GET_REQUEST, oid_to_string};
use crate::packet::{send_request, walk_tree};

const OID_ARP_TABLE: &str = "1.3.6.1.2.1.4.22.1.2"; // ipNetToMediaPhysAddress
const OID_CPU_IDLE: &str = "1.3.6.1.4.1.2021.11.11.0"; // UCD-SNMP ssCpuIdle
const OID_PROCESSOR_LOAD: &str = "1.3.6.1.2.1.25.3.3.1.2"; // HOST-RESOURCES-MIB hrProcessorLoad
const OID_STORAGE_TYPE: &str = "1.3.6.1.2.1.25.2.3.1.2"; // hrStorageType
const OID_STORAGE_UNITS: &str = "1.3.6.1.2.1.25.2.3.1.4"; // hrStorageAllocationUnits
const OID_STORAGE_SIZE: &str = "1.3.6.1.2.1.25.2.3.1.5"; // hrStorageSize
const OID_STORAGE_USED: &str = "1.3.6.1.2.1.25.2.3.1.6"; // hrStorageUsed
const OID_STORAGE_TYPE_RAM: &str = "1.3.6.1.2.1.25.2.1.2"; // hrStorageRam
const OID_IF_IN_OCTETS: &str = "1.3.6.1.2.1.2.2.1.10";
const OID_IF_OUT_OCTETS: &str = "1.3.6.1.2.1.2.2.1.16";

/// `(ip, mac)` pairs read off the router's ARP cache. `mac` is rendered as
/// hex-pair-joined-by-dash, matching the rest of the store's convention.
pub async fn get_attached_ips(host: &str, community: &str) -> Result<Vec<(String, String)>, String> {
    let root_arcs = OID_ARP_TABLE.split('.').count();
    let rows = walk_tree(host, community, OID_ARP_TABLE).await?;
    let mut out = Vec::new();
    for (oid, value) in rows {
        let SnmpValue::OctetString(mac_bytes) = value else { continue };
        // OID shape is <root>.<ifIndex>.<ip1>.<ip2>.<ip3>.<ip4>; skip root
        // arcs plus the ifIndex arc to recover the dotted IP suffix.
        let parts: Vec<&str> = oid.split('.').collect();
        if parts.len() <= root_arcs + 1 {
            continue;
        }
        let ip = parts[root_arcs + 1..].join(".");
        let mac = mac_bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join("-");
        out.push((ip, mac));
    }
    Ok(out)
}

/// CPU utilization percent, preferring the per-core `hrProcessorLoad` mean
/// (already expressed as "percent used") and falling back to `ssCpuIdle`
/// (inverted to percent used) on hosts that only implement the UCD-SNMP
/// MIB. Returns `None` if neither OID answers.
pub async fn get_cpu_used_percent(host: &str, community: &str) -> Result<Option<f64>, String> {
    let per_core = walk_tree(host, community, OID_PROCESSOR_LOAD).await?;
    let loads: Vec<f64> = per_core.iter().filter_map(|(_, v)| v.as_u32()).map(|v| v as f64).collect();
    if !loads.is_empty() {
        return Ok(Some(loads.iter().sum::<f64>() / loads.len() as f64));
    }

    let response = send_request(host, community, TAG_GET_REQUEST, &[OID_CPU_IDLE]).await?;
    if response.error_status != 0 {
        return Ok(None);
    }
    let Some((_, value)) = response.varbinds.into_iter().next() else { return Ok(None) };
    Ok(value.as_u32().map(|idle| 100.0 - idle as f64))
}

/// `used * unit / (total * unit) * 100` over the `hrStorageTable` row whose
/// type is `hrStorageRam`. The `unit` factor cancels algebraically; it is
/// kept anyway so the arithmetic reads the same as the `hrStorageUsed`/
/// `hrStorageSize` ratio a human would compute by hand from raw MIB output.
pub async fn get_memory_used_percent(host: &str, community: &str) -> Result<Option<f64>, String> {
    let types = walk_tree(host, community, OID_STORAGE_TYPE).await?;
    let units = walk_tree(host, community, OID_STORAGE_UNITS).await?;
    let sizes = walk_tree(host, community, OID_STORAGE_SIZE).await?;
    let useds = walk_tree(host, community, OID_STORAGE_USED).await?;

    for (oid, value) in &types {
        let SnmpValue::Oid(type_arcs) = value else { continue };
        if oid_to_string(type_arcs) != OID_STORAGE_TYPE_RAM {
            continue;
        }
        let Some(index) = oid.rsplit('.').next() else { continue };
        let (Some(unit), Some(size), Some(used)) =
            (find_by_index(&units, index), find_by_index(&sizes, index), find_by_index(&useds, index))
        else {
            continue;
        };
        if size == 0 {
            continue;
        }
        return Ok(Some((used as f64 * unit as f64) / (size as f64 * unit as f64) * 100.0));
    }
    Ok(None)
}

fn find_by_index(rows: &[(String, SnmpValue)], index: &str) -> Option<u32> {
    rows.iter().find(|(oid, _)| oid.rsplit('.').next() == Some(index)).and_then(|(_, v)| v.as_u32())
}

/// Max in/out interface octet counters across every interface, as a
/// single-number stand-in for "this host's traffic" when no particular
/// interface is known to be the one worth watching.
pub async fn get_interface_bytes(host: &str, community: &str) -> Result<Option<(i64, i64)>, String> {
    let in_octets = walk_tree(host, community, OID_IF_IN_OCTETS).await?;
    let out_octets = walk_tree(host, community, OID_IF_OUT_OCTETS).await?;
    let max_of = |rows: &[(String, SnmpValue)]| rows.iter().filter_map(|(_, v)| v.as_u32()).max();
    match (max_of(&in_octets), max_of(&out_octets)) {
        (Some(rx), Some(tx)) => Ok(Some((rx as i64, tx as i64))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arp_oid_suffix_extraction_recovers_dotted_ip() {
        let root_arcs = OID_ARP_TABLE.split('.').count();
        let oid = format!("{OID_ARP_TABLE}.3.192.168.1.42");
        let parts: Vec<&str> = oid.split('.').collect();
        let ip = parts[root_arcs + 1..].join(".");
        assert_eq!(ip, "192.168.1.42");
    }

    #[test]
    fn find_by_index_matches_on_trailing_oid_segment() {
        let rows = vec![("1.3.6.1.2.1.25.2.3.1.4.1".to_string(), SnmpValue::Integer(1024))];
        assert_eq!(find_by_index(&rows, "1"), Some(1024));
        assert_eq!(find_by_index(&rows, "2"), None);
    }
}
