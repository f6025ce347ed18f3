use std::collections::HashMap;

use lanpets_merge::{PartialKey, plan_merge};
use lanpets_types::{ExtraNetworkInfoType, IdentifierType, NetworkInterfaceInfo, PetInfo};
use rusqlite::{Connection, Row, ToSql, params};

fn row_to_interface(row: &Row) -> rusqlite::Result<(i64, NetworkInterfaceInfo)> {
    Ok((
        row.get("row_id")?,
        NetworkInterfaceInfo {
            timestamp: row.get("timestamp")?,
            mac: row.get("mac")?,
            ip: row.get("ip")?,
            dns_hostname: row.get("dns_hostname")?,
            mdns_hostname: row.get("mdns_hostname")?,
        },
    ))
}

/// Rows ordered ascending by `row_id` — `lanpets_merge::plan_merge` depends
/// on this order to reproduce the reference tie-break behavior.
pub fn list_network_info_rows(conn: &Connection) -> rusqlite::Result<Vec<(i64, NetworkInterfaceInfo)>> {
    let mut stmt = conn.prepare(
        "SELECT row_id, mac, ip, dns_hostname, mdns_hostname, timestamp
         FROM network_info ORDER BY row_id",
    )?;
    let rows = stmt.query_map([], row_to_interface)?;
    rows.collect()
}

pub fn list_network_info(conn: &Connection) -> rusqlite::Result<Vec<NetworkInterfaceInfo>> {
    Ok(list_network_info_rows(conn)?.into_iter().map(|(_, info)| info).collect())
}

/// Merge `new_record` into the store per the identity-merger rules, then
/// upsert `extra_info` onto the winning row.
pub fn add_network_info(
    conn: &Connection,
    new_record: &NetworkInterfaceInfo,
    extra_info: &HashMap<ExtraNetworkInfoType, String>,
) -> Result<(), String> {
    if !new_record.is_admissible() {
        return Err("network_info record has no identifying field (ip/mac/dns_hostname all null)".into());
    }
    let existing = list_network_info_rows(conn).map_err(|error| format!("load network_info: {error}"))?;
    let plan = plan_merge(&existing, new_record)
        .ok_or_else(|| "invariant violation: merge rejected an admissible record".to_string())?;

    let target_row_id = if let Some(rec) = &plan.insert {
        conn.execute(
            "INSERT INTO network_info (mac, ip, dns_hostname, mdns_hostname, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![rec.mac, rec.ip, rec.dns_hostname, rec.mdns_hostname, rec.timestamp],
        )
        .map_err(|error| format!("insert network_info: {error}"))?;
        conn.last_insert_rowid()
    } else if let Some((id, merged)) = &plan.update {
        conn.execute(
            "UPDATE network_info SET mac=?1, ip=?2, dns_hostname=?3, mdns_hostname=?4, timestamp=?5
             WHERE row_id=?6",
            params![merged.mac, merged.ip, merged.dns_hostname, merged.mdns_hostname, merged.timestamp, id],
        )
        .map_err(|error| format!("update network_info row {id}: {error}"))?;
        *id
    } else {
        unreachable!("plan_merge always yields an insert or an update for an admissible record")
    };

    for (id, keys) in &plan.null_fields {
        for key in keys {
            let column = partial_key_column(*key);
            conn.execute(&format!("UPDATE network_info SET {column} = NULL WHERE row_id = ?1"), params![id])
                .map_err(|error| format!("null {column} on row {id}: {error}"))?;
        }
    }
    for id in &plan.delete {
        conn.execute("DELETE FROM network_info WHERE row_id = ?1", params![id])
            .map_err(|error| format!("delete subsumed row {id}: {error}"))?;
    }

    if !extra_info.is_empty() {
        set_extra_network_info(conn, target_row_id, extra_info)
            .map_err(|error| format!("set extra_network_info: {error}"))?;
    }
    Ok(())
}

fn partial_key_column(key: PartialKey) -> &'static str {
    match key {
        PartialKey::Ip => "ip",
        PartialKey::Mac => "mac",
        PartialKey::DnsHostname => "dns_hostname",
    }
}

fn set_extra_network_info(
    conn: &Connection,
    network_id: i64,
    extra_info: &HashMap<ExtraNetworkInfoType, String>,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO extra_network_info (network_id, type, info) VALUES (?1, ?2, ?3)
         ON CONFLICT(network_id, type) DO UPDATE SET info = excluded.info",
    )?;
    for (kind, value) in extra_info {
        stmt.execute(params![network_id, kind.as_column(), value])?;
    }
    Ok(())
}

pub fn get_extra_network_info(
    conn: &Connection,
    iface: &NetworkInterfaceInfo,
) -> rusqlite::Result<HashMap<ExtraNetworkInfoType, String>> {
    let mut clauses = Vec::new();
    let mut values: Vec<String> = Vec::new();
    if let Some(ip) = &iface.ip {
        clauses.push("ni.ip = ?");
        values.push(ip.clone());
    }
    if let Some(mac) = &iface.mac {
        clauses.push("ni.mac = ?");
        values.push(mac.clone());
    }
    if let Some(dns) = &iface.dns_hostname {
        clauses.push("ni.dns_hostname = ?");
        values.push(dns.clone());
    }
    if clauses.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT extra.type, extra.info
         FROM network_info ni
         JOIN extra_network_info extra ON extra.network_id = ni.row_id
         WHERE {}",
        clauses.join(" OR ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
    let rows = stmt.query_map(bound.as_slice(), |row| {
        let t: String = row.get(0)?;
        let v: String = row.get(1)?;
        Ok((t, v))
    })?;
    let mut out = HashMap::new();
    for row in rows {
        let (type_name, value) = row?;
        if let Some(kind) = ExtraNetworkInfoType::from_column(&type_name) {
            out.insert(kind, value);
        }
    }
    Ok(out)
}

/// For each non-deleted pet, return either the `NetworkInterfaceInfo` row
/// matching its identifier, or — if none exists — a minimal synthetic record
/// carrying only `identifier_value` under the field `identifier_type` names.
/// `hard_coded` overrides are layered on first; a match found in the store
/// takes precedence over a hard-coded entry for the same pet name.
pub fn resolve_pets_to_interfaces(
    conn: &Connection,
    pets: &[PetInfo],
    hard_coded: &HashMap<String, NetworkInterfaceInfo>,
) -> rusqlite::Result<HashMap<String, NetworkInterfaceInfo>> {
    let interfaces = list_network_info(conn)?;
    let mut out = hard_coded.clone();
    for pet in pets {
        if pet.is_deleted {
            continue;
        }
        let resolved = interfaces
            .iter()
            .find(|iface| identifier_matches(iface, pet.identifier_type, &pet.identifier_value))
            .cloned()
            .unwrap_or_else(|| synthetic_interface(pet.identifier_type, &pet.identifier_value));
        out.insert(pet.name.clone(), resolved);
    }
    Ok(out)
}

fn identifier_matches(iface: &NetworkInterfaceInfo, kind: IdentifierType, value: &str) -> bool {
    match kind {
        IdentifierType::Mac => iface.mac.as_deref() == Some(value),
        IdentifierType::Ip => iface.ip.as_deref() == Some(value),
        IdentifierType::Host => {
            iface.dns_hostname.as_deref() == Some(value) || iface.mdns_hostname.as_deref() == Some(value)
        }
    }
}

fn synthetic_interface(kind: IdentifierType, value: &str) -> NetworkInterfaceInfo {
    let mut rec = NetworkInterfaceInfo::new(0);
    match kind {
        IdentifierType::Mac => rec.mac = Some(value.to_string()),
        IdentifierType::Ip => rec.ip = Some(value.to_string()),
        IdentifierType::Host => rec.dns_hostname = Some(value.to_string()),
    }
    rec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use lanpets_types::{DeviceType, Mood};
    use tempfile::tempdir;

    fn rec(ts: i64, ip: Option<&str>, mac: Option<&str>, dns: Option<&str>) -> NetworkInterfaceInfo {
        NetworkInterfaceInfo {
            timestamp: ts,
            ip: ip.map(String::from),
            mac: mac.map(String::from),
            dns_hostname: dns.map(String::from),
            mdns_hostname: None,
        }
    }

    /// Scenario 1: three disjoint interfaces stay three distinct rows.
    #[test]
    fn insert_three_disjoint_interfaces() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("t.sqlite3"));
        let conn = db.open().unwrap();

        let r0 = rec(0, Some("ip0"), Some("mac0"), Some("dns0"));
        let r1 = rec(0, Some("ip1"), Some("mac1"), Some("dns1"));
        let r2 = rec(0, Some("ip2"), Some("mac2"), Some("dns2"));
        for r in [&r0, &r1, &r2] {
            add_network_info(&conn, r, &HashMap::new()).unwrap();
        }

        let mut got = list_network_info(&conn).unwrap();
        got.sort_by(|a, b| a.ip.cmp(&b.ip));
        assert_eq!(got, vec![r0, r1, r2]);
    }

    /// Scenario 2: overlapping insert collapses to 3 rows, with the losers'
    /// matched fields nulled and the winner holding the union of fields.
    #[test]
    fn overlapping_insert_collapses_to_three_rows() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("t.sqlite3"));
        let conn = db.open().unwrap();

        add_network_info(&conn, &rec(0, Some("ip0"), Some("mac0"), Some("dns0")), &HashMap::new()).unwrap();
        add_network_info(&conn, &rec(0, Some("ip1"), Some("mac1"), Some("dns1")), &HashMap::new()).unwrap();
        add_network_info(&conn, &rec(0, Some("ip2"), Some("mac2"), Some("dns2")), &HashMap::new()).unwrap();

        let mut extra = HashMap::new();
        extra.insert(ExtraNetworkInfoType::RouterDescription, "b".to_string());
        add_network_info(&conn, &rec(1, Some("ip1"), Some("mac0"), Some("dns2")), &extra).unwrap();

        let rows = list_network_info(&conn).unwrap();
        assert_eq!(rows.len(), 3);
        // r1 (ip1, mac1, dns1) absorbed dns2's overlap... actually dns2 came
        // from r2, so the winner must carry ip1+mac0+dns2.
        let winner = rows.iter().find(|r| r.ip.as_deref() == Some("ip1")).unwrap();
        assert_eq!(winner.mac.as_deref(), Some("mac0"));
        assert_eq!(winner.dns_hostname.as_deref(), Some("dns2"));
    }

    #[test]
    fn get_extra_network_info_matches_on_any_identifying_field() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("t.sqlite3"));
        let conn = db.open().unwrap();

        let mut extra = HashMap::new();
        extra.insert(ExtraNetworkInfoType::DhcpName, "garden-cam".to_string());
        add_network_info(&conn, &rec(0, Some("ip0"), Some("mac0"), None), &extra).unwrap();

        let got = get_extra_network_info(&conn, &rec(0, Some("ip0"), None, None)).unwrap();
        assert_eq!(got.get(&ExtraNetworkInfoType::DhcpName).unwrap(), "garden-cam");
    }

    /// P4: resolution is total — every non-deleted pet gets a record, real
    /// or synthetic, whose identifying field equals its identifier value.
    #[test]
    fn resolution_is_total() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("t.sqlite3"));
        let conn = db.open().unwrap();

        let pet = PetInfo {
            name: "fido".into(),
            identifier_type: IdentifierType::Ip,
            identifier_value: "10.0.0.5".into(),
            device_type: DeviceType::Pc,
            description: String::new(),
            mood: Mood::Jolly,
            is_deleted: false,
        };
        let resolved = resolve_pets_to_interfaces(&conn, &[pet], &HashMap::new()).unwrap();
        assert_eq!(resolved["fido"].ip.as_deref(), Some("10.0.0.5"));

        add_network_info(&conn, &rec(5, Some("10.0.0.5"), Some("mac9"), None), &HashMap::new()).unwrap();
        let pet2 = PetInfo {
            name: "fido".into(),
            identifier_type: IdentifierType::Ip,
            identifier_value: "10.0.0.5".into(),
            device_type: DeviceType::Pc,
            description: String::new(),
            mood: Mood::Jolly,
            is_deleted: false,
        };
        let resolved2 = resolve_pets_to_interfaces(&conn, &[pet2], &HashMap::new()).unwrap();
        assert_eq!(resolved2["fido"].mac.as_deref(), Some("mac9"));
    }
}
