//! The identity/merge layer: reconciles a new `NetworkInterfaceInfo`
//! observation against the current set of stored rows.
//!
//! This is a pure function over in-memory records; it has no notion of a
//! database. The store calls `plan_merge` with its current rows (ordered by
//! ascending row id, the order they'd come back from `SELECT * FROM
//! network_info`) and applies the returned `MergePlan`.

use lanpets_types::NetworkInterfaceInfo;

/// One of the three partial keys, ordered by increasing specificity. This
/// order is load-bearing: it decides which existing row is preferred as the
/// merge target when a new observation matches more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PartialKey {
    Ip,
    Mac,
    DnsHostname,
}

impl PartialKey {
    const ALL: [PartialKey; 3] = [PartialKey::Ip, PartialKey::Mac, PartialKey::DnsHostname];

    fn get(self, rec: &NetworkInterfaceInfo) -> &Option<String> {
        match self {
            PartialKey::Ip => &rec.ip,
            PartialKey::Mac => &rec.mac,
            PartialKey::DnsHostname => &rec.dns_hostname,
        }
    }

    fn clear(self, rec: &mut NetworkInterfaceInfo) {
        match self {
            PartialKey::Ip => rec.ip = None,
            PartialKey::Mac => rec.mac = None,
            PartialKey::DnsHostname => rec.dns_hostname = None,
        }
    }
}

/// What the store must do to apply one `add_network_info` call. At most one
/// of `insert`/`update` is populated; `null_fields` and `delete` apply to
/// rows other than the merge target.
#[derive(Debug, Default)]
pub struct MergePlan<Id> {
    pub insert: Option<NetworkInterfaceInfo>,
    pub update: Option<(Id, NetworkInterfaceInfo)>,
    pub null_fields: Vec<(Id, Vec<PartialKey>)>,
    pub delete: Vec<Id>,
}

/// Compute the merge plan for inserting `new_record` given `existing` rows.
///
/// `existing` must be ordered ascending by row id (ties in matching
/// specificity are broken by "first row encountered", matching the
/// reference implementation's dict-iteration-order tie-break).
///
/// Returns `None` if `new_record` carries no identifying field at all — it
/// is inadmissible and the caller must reject it rather than invoke this.
pub fn plan_merge<Id: Clone>(
    existing: &[(Id, NetworkInterfaceInfo)],
    new_record: &NetworkInterfaceInfo,
) -> Option<MergePlan<Id>> {
    if !new_record.is_admissible() {
        return None;
    }

    // For every existing row, the set of partial keys it shares with the new
    // record (non-null on both sides and equal).
    let mut dup_keys: Vec<(usize, Vec<PartialKey>)> = Vec::new();
    let mut best: Option<(usize, PartialKey)> = None;

    for (idx, (_, row)) in existing.iter().enumerate() {
        let mut matched = Vec::new();
        for key in PartialKey::ALL {
            let row_val = key.get(row);
            let new_val = key.get(new_record);
            if let (Some(a), Some(b)) = (row_val, new_val) {
                if a == b {
                    matched.push(key);
                    let better = match best {
                        None => true,
                        Some((_, best_key)) => key > best_key,
                    };
                    if better {
                        best = Some((idx, key));
                    }
                }
            }
        }
        if !matched.is_empty() {
            dup_keys.push((idx, matched));
        }
    }

    let Some((best_idx, _)) = best else {
        return Some(MergePlan {
            insert: Some(new_record.clone()),
            ..Default::default()
        });
    };

    let mut plan = MergePlan::default();
    for (idx, matched) in &dup_keys {
        if *idx == best_idx {
            continue;
        }
        let (id, row) = &existing[*idx];
        let has_other_identity = PartialKey::ALL
            .iter()
            .any(|k| k.get(row).is_some() && !matched.contains(k));
        if has_other_identity {
            plan.null_fields.push((id.clone(), matched.clone()));
        } else {
            plan.delete.push(id.clone());
        }
    }

    let (best_id, best_row) = &existing[best_idx];
    plan.update = Some((best_id.clone(), merge_fields(best_row, new_record)));
    Some(plan)
}

/// Field-wise union of `old` and `new`: the newer record's value wins where
/// non-null, falling back to the older's. "Newer" is decided by timestamp,
/// with ties favoring `new` (the incoming observation).
fn merge_fields(old: &NetworkInterfaceInfo, new: &NetworkInterfaceInfo) -> NetworkInterfaceInfo {
    let new_is_newer = new.timestamp >= old.timestamp;
    let pick = |old_f: &Option<String>, new_f: &Option<String>| -> Option<String> {
        let (newer, older) = if new_is_newer { (new_f, old_f) } else { (old_f, new_f) };
        newer.clone().or_else(|| older.clone())
    };
    NetworkInterfaceInfo {
        timestamp: old.timestamp.max(new.timestamp),
        mac: pick(&old.mac, &new.mac),
        ip: pick(&old.ip, &new.ip),
        dns_hostname: pick(&old.dns_hostname, &new.dns_hostname),
        mdns_hostname: pick(&old.mdns_hostname, &new.mdns_hostname),
    }
}

/// Apply `clear`-listed keys to `row` in place; used by callers that keep an
/// in-memory mirror alongside the store (tests, mostly).
pub fn apply_null_fields(row: &mut NetworkInterfaceInfo, keys: &[PartialKey]) {
    for key in keys {
        key.clear(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ts: i64, ip: Option<&str>, mac: Option<&str>, dns: Option<&str>) -> NetworkInterfaceInfo {
        NetworkInterfaceInfo {
            timestamp: ts,
            ip: ip.map(String::from),
            mac: mac.map(String::from),
            dns_hostname: dns.map(String::from),
            mdns_hostname: None,
        }
    }

    /// P1: merging a record against itself is a no-op update, not a new row.
    #[test]
    fn merge_idempotence() {
        let r = rec(1, Some("10.0.0.1"), Some("aa-bb"), Some("host"));
        let existing = vec![(1u64, r.clone())];
        let plan = plan_merge(&existing, &r).unwrap();
        assert!(plan.insert.is_none());
        let (id, merged) = plan.update.unwrap();
        assert_eq!(id, 1);
        assert_eq!(merged, r);
        assert!(plan.delete.is_empty());
        assert!(plan.null_fields.is_empty());
    }

    /// P2: disjoint records never collide.
    #[test]
    fn merge_commutativity_over_disjoint_keys() {
        let r1 = rec(1, Some("10.0.0.1"), None, None);
        let r2 = rec(1, Some("10.0.0.2"), None, None);
        let existing = vec![(1u64, r1.clone())];
        let plan = plan_merge(&existing, &r2).unwrap();
        assert_eq!(plan.insert, Some(r2));
    }

    /// Scenario 2 from spec: overlapping insert nulls out the non-winning
    /// rows' matched fields instead of deleting them outright, when they
    /// still carry a distinct identity.
    #[test]
    fn overlapping_insert_nulls_non_winning_rows() {
        let r0 = rec(0, Some("ip0"), Some("mac0"), Some("dns0"));
        let r1 = rec(0, Some("ip1"), Some("mac1"), Some("dns1"));
        let existing = vec![(0u64, r0.clone()), (1u64, r1.clone())];
        let rx = rec(1, Some("ip1"), Some("mac0"), Some("dns1"));

        let plan = plan_merge(&existing, &rx).unwrap();
        // dns_hostname is the most specific match; both r0 (mac match) and r1
        // (ip+dns match) are duplicates, r1 wins because dns > mac > ip.
        let (winner, merged) = plan.update.unwrap();
        assert_eq!(winner, 1);
        assert_eq!(merged.ip, Some("ip1".into()));
        assert_eq!(merged.mac, Some("mac0".into()));
        assert_eq!(merged.dns_hostname, Some("dns1".into()));

        // r0 matched only on mac, but still has ip0/dns0 as a distinct
        // identity, so it is nulled rather than deleted.
        assert_eq!(plan.null_fields, vec![(0u64, vec![PartialKey::Mac])]);
        assert!(plan.delete.is_empty());
    }

    /// When a non-winning row's every matched field was its only identity,
    /// it is deleted rather than left as an empty husk.
    #[test]
    fn fully_subsumed_row_is_deleted() {
        let r0 = rec(0, Some("ip0"), None, None);
        let r1 = rec(0, None, Some("mac0"), Some("dns0"));
        let existing = vec![(0u64, r0), (1u64, r1)];
        let rx = rec(1, Some("ip0"), Some("mac0"), None);
        let plan = plan_merge(&existing, &rx).unwrap();
        // r1 wins (mac is more specific than ip); r0's only identity (ip0)
        // was the matched field, so it's deleted rather than nulled.
        let (winner, _) = plan.update.unwrap();
        assert_eq!(winner, 1);
        assert_eq!(plan.delete, vec![0u64]);
        assert!(plan.null_fields.is_empty());
    }

    #[test]
    fn inadmissible_record_is_rejected() {
        let blank = NetworkInterfaceInfo::new(0);
        assert!(plan_merge::<u64>(&[], &blank).is_none());
    }

    #[test]
    fn older_new_record_does_not_clobber_newer_fields() {
        let old = rec(10, Some("ip0"), Some("mac0"), None);
        let existing = vec![(0u64, old)];
        let stale = rec(1, Some("ip0"), None, Some("dns-late"));
        let plan = plan_merge(&existing, &stale).unwrap();
        let (_, merged) = plan.update.unwrap();
        // mac0 survives because the incoming record is older and null there.
        assert_eq!(merged.mac, Some("mac0".into()));
        assert_eq!(merged.dns_hostname, Some("dns-late".into()));
        assert_eq!(merged.timestamp, 10);
    }
}
