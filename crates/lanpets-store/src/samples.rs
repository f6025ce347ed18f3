use std::collections::HashMap;

use lanpets_types::{MeanTraffic, TrafficSample};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionTable {
    Traffic,
    Availability,
    Cpu,
}

impl RetentionTable {
    fn table_name(self) -> &'static str {
        match self {
            RetentionTable::Traffic => "traffic_stats",
            RetentionTable::Availability => "device_availability",
            RetentionTable::Cpu => "device_cpu_stats",
        }
    }
}

/// P5: after this call, no row in `table` has `timestamp < cutoff`.
pub fn delete_entries_older_than(conn: &Connection, table: RetentionTable, cutoff: i64) -> rusqlite::Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE timestamp < ?1", table.table_name()),
        params![cutoff],
    )?;
    Ok(())
}

/// No-op if `name` does not resolve to a live pet row (pet deleted mid-cycle).
pub fn append_availability(conn: &Connection, name: &str, is_available: bool, timestamp: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO device_availability (name_id, is_availabile, timestamp)
         SELECT row_id, ?1, ?2 FROM pet_info WHERE name = ?3 AND is_deleted = 0",
        params![is_available, timestamp, name],
    )?;
    Ok(())
}

pub fn append_traffic(conn: &Connection, name: &str, rx_bytes: i64, tx_bytes: i64, timestamp: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO traffic_stats (name_id, rx_bytes, tx_bytes, timestamp)
         SELECT row_id, ?1, ?2, ?3 FROM pet_info WHERE name = ?4 AND is_deleted = 0",
        params![rx_bytes, tx_bytes, timestamp, name],
    )?;
    Ok(())
}

pub fn append_cpu(conn: &Connection, name: &str, cpu_used_percent: f64, mem_used_percent: f64, timestamp: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO device_cpu_stats (name_id, cpu_used_percent, mem_used_percent, timestamp)
         SELECT row_id, ?1, ?2, ?3 FROM pet_info WHERE name = ?4 AND is_deleted = 0",
        params![cpu_used_percent, mem_used_percent, timestamp, name],
    )?;
    Ok(())
}

/// `100 * count(available) / count(*)` over the window; `0.0` if the pet has
/// no samples in the window at all (not an error).
pub fn mean_availability(conn: &Connection, names: &[String], since: i64) -> rusqlite::Result<HashMap<String, f64>> {
    let mut out: HashMap<String, f64> = names.iter().map(|n| (n.clone(), 0.0)).collect();
    let mut stmt = conn.prepare(
        "SELECT CAST(SUM(a.is_availabile) AS REAL) / COUNT(*) * 100.0
         FROM device_availability a
         JOIN pet_info p ON p.row_id = a.name_id
         WHERE a.timestamp > ?1 AND p.name = ?2",
    )?;
    for name in names {
        let pct: Option<f64> = stmt.query_row(params![since, name], |row| row.get(0))?;
        if let Some(pct) = pct {
            out.insert(name.clone(), pct);
        }
    }
    Ok(out)
}

/// Last sample per pet (order by rowid, not timestamp, to match
/// insertion order when timestamps tie).
pub fn current_availability(conn: &Connection, names: &[String]) -> rusqlite::Result<HashMap<String, bool>> {
    let mut out: HashMap<String, bool> = names.iter().map(|n| (n.clone(), false)).collect();
    let mut stmt = conn.prepare(
        "SELECT a.is_availabile
         FROM device_availability a
         JOIN pet_info p ON p.row_id = a.name_id
         WHERE p.name = ?1
         ORDER BY a.rowid DESC LIMIT 1",
    )?;
    for name in names {
        let val: Option<i64> = stmt.query_row(params![name], |row| row.get(0)).optional()?;
        if let Some(val) = val {
            out.insert(name.clone(), val != 0);
        }
    }
    Ok(out)
}

/// Max timestamp among `is_available=true` samples, else 0.
pub fn last_seen(conn: &Connection, names: &[String]) -> rusqlite::Result<HashMap<String, i64>> {
    let mut out: HashMap<String, i64> = names.iter().map(|n| (n.clone(), 0)).collect();
    let mut stmt = conn.prepare(
        "SELECT MAX(a.timestamp)
         FROM device_availability a
         JOIN pet_info p ON p.row_id = a.name_id
         WHERE a.is_availabile AND p.name = ?1",
    )?;
    for name in names {
        let ts: Option<i64> = stmt.query_row(params![name], |row| row.get(0))?;
        if let Some(ts) = ts {
            out.insert(name.clone(), ts);
        }
    }
    Ok(out)
}

pub fn load_traffic(conn: &Connection, name: &str, since: i64) -> rusqlite::Result<Vec<TrafficSample>> {
    let mut stmt = conn.prepare(
        "SELECT t.rx_bytes, t.tx_bytes, t.timestamp
         FROM traffic_stats t
         JOIN pet_info p ON p.row_id = t.name_id
         WHERE p.name = ?1 AND t.timestamp >= ?2
         ORDER BY t.timestamp ASC",
    )?;
    let rows = stmt.query_map(params![name, since], |row| {
        Ok(TrafficSample {
            rx_bytes: row.get(0)?,
            tx_bytes: row.get(1)?,
            timestamp: row.get(2)?,
        })
    })?;
    rows.collect()
}

/// P6: per-interval `Δbytes/Δt`, first sample's delta defined as zero,
/// negative deltas (counter resets) clamped to zero. When `ignore_zero` is
/// set, zero-bps intervals are excluded from the mean so idle periods don't
/// drag it down — they still count toward the raw byte totals.
pub fn mean_bps(series: &[TrafficSample], ignore_zero: bool) -> MeanTraffic {
    if series.len() < 2 {
        return MeanTraffic::default();
    }
    let mut rx_bps_samples = Vec::with_capacity(series.len());
    let mut tx_bps_samples = Vec::with_capacity(series.len());
    for window in series.windows(2) {
        let (prev, cur) = (&window[0], &window[1]);
        let dt = (cur.timestamp - prev.timestamp).max(1) as f64;
        let rx_delta = (cur.rx_bytes - prev.rx_bytes).max(0);
        let tx_delta = (cur.tx_bytes - prev.tx_bytes).max(0);
        rx_bps_samples.push((rx_delta, rx_delta as f64 / dt));
        tx_bps_samples.push((tx_delta, tx_delta as f64 / dt));
    }

    let reduce = |samples: &[(i64, f64)]| -> (f64, i64) {
        let contributing: Vec<&(i64, f64)> =
            samples.iter().filter(|(_, bps)| !ignore_zero || *bps > 0.0).collect();
        let bps_mean = if contributing.is_empty() {
            0.0
        } else {
            contributing.iter().map(|(_, bps)| bps).sum::<f64>() / contributing.len() as f64
        };
        let total: i64 = contributing.iter().map(|(delta, _)| delta).sum();
        (bps_mean, total)
    };

    let (rx_bps, rx_bytes) = reduce(&rx_bps_samples);
    let (tx_bps, tx_bytes) = reduce(&tx_bps_samples);
    MeanTraffic {
        rx_bytes_bps: rx_bps,
        tx_bytes_bps: tx_bps,
        rx_bytes,
        tx_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::pets::upsert_pet;
    use lanpets_types::{DeviceType, IdentifierType, Mood, PetInfo};
    use tempfile::tempdir;

    fn test_pet(name: &str) -> PetInfo {
        PetInfo {
            name: name.into(),
            identifier_type: IdentifierType::Host,
            identifier_value: format!("{name}.lan"),
            device_type: DeviceType::Pc,
            description: String::new(),
            mood: Mood::Jolly,
            is_deleted: false,
        }
    }

    /// Scenario 3: traffic aggregation.
    #[test]
    fn mean_bps_matches_two_point_series() {
        let series = vec![
            TrafficSample { rx_bytes: 0, tx_bytes: 0, timestamp: 0 },
            TrafficSample { rx_bytes: 100, tx_bytes: 200, timestamp: 1 },
        ];
        let result = mean_bps(&series, true);
        assert_eq!(result.rx_bytes_bps, 100.0);
        assert_eq!(result.tx_bytes_bps, 200.0);
        assert_eq!(result.rx_bytes, 100);
        assert_eq!(result.tx_bytes, 200);
    }

    /// P6: counter resets never produce a negative bps.
    #[test]
    fn mean_bps_clamps_counter_resets_to_zero() {
        let series = vec![
            TrafficSample { rx_bytes: 1000, tx_bytes: 0, timestamp: 0 },
            TrafficSample { rx_bytes: 10, tx_bytes: 0, timestamp: 1 },
            TrafficSample { rx_bytes: 210, tx_bytes: 0, timestamp: 2 },
        ];
        let result = mean_bps(&series, false);
        assert!(result.rx_bytes_bps >= 0.0);
        // first interval clamps to 0, second is 200 bps: mean is 100.
        assert_eq!(result.rx_bytes_bps, 100.0);
    }

    /// Scenario 4: availability mean/current/last_seen.
    #[test]
    fn availability_queries() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("t.sqlite3"));
        let conn = db.open().unwrap();
        upsert_pet(&conn, &test_pet("p")).unwrap();

        append_availability(&conn, "p", false, 1).unwrap();
        append_availability(&conn, "p", true, 2).unwrap();

        let names = vec!["p".to_string()];
        let mean = mean_availability(&conn, &names, 0).unwrap();
        assert_eq!(mean["p"], 50.0);

        let current = current_availability(&conn, &names).unwrap();
        assert_eq!(current["p"], true);

        let seen = last_seen(&conn, &names).unwrap();
        assert_eq!(seen["p"], 2);
    }

    #[test]
    fn append_is_silent_for_absent_pet() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("t.sqlite3"));
        let conn = db.open().unwrap();
        append_availability(&conn, "ghost", true, 1).unwrap();
        let names = vec!["ghost".to_string()];
        assert_eq!(current_availability(&conn, &names).unwrap()["ghost"], false);
    }

    /// P5: retention bound.
    #[test]
    fn retention_deletes_rows_before_cutoff() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("t.sqlite3"));
        let conn = db.open().unwrap();
        upsert_pet(&conn, &test_pet("p")).unwrap();
        append_traffic(&conn, "p", 1, 1, 1).unwrap();
        append_traffic(&conn, "p", 2, 2, 100).unwrap();

        delete_entries_older_than(&conn, RetentionTable::Traffic, 50).unwrap();

        let series = load_traffic(&conn, "p", 0).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].timestamp, 100);
    }
}
