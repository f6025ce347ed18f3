use std::collections::HashMap;

use lanpets_types::{Relationship, canonical_pair};
use rusqlite::{Connection, params};

/// An in-memory mirror of the `pet_relationships` table, keyed by canonical
/// pair. Collectors mutate it alongside their store calls within a single
/// tick to avoid a second round-trip to re-read what they just wrote.
#[derive(Debug, Default, Clone)]
pub struct RelMap {
    pairs: HashMap<(String, String), Relationship>,
}

impl RelMap {
    pub fn add(&mut self, a: &str, b: &str, kind: Relationship) {
        self.pairs.insert(canonical_pair(a, b), kind);
    }

    pub fn remove(&mut self, a: &str, b: &str) {
        self.pairs.remove(&canonical_pair(a, b));
    }

    pub fn get_relationship(&self, a: &str, b: &str) -> Option<Relationship> {
        self.pairs.get(&canonical_pair(a, b)).copied()
    }

    /// Every other pet `name` has a relationship with, keyed by that pet's
    /// name.
    pub fn get_relationships(&self, name: &str) -> HashMap<String, Relationship> {
        let mut out = HashMap::new();
        for ((a, b), kind) in &self.pairs {
            if a == name {
                out.insert(b.clone(), *kind);
            } else if b == name {
                out.insert(a.clone(), *kind);
            }
        }
        out
    }
}

/// P7: canonicalizes `(name1, name2)` to lexicographic order before storing.
/// At most one row per pair — a second call for the same pair overwrites the
/// kind.
pub fn add_relationship(conn: &Connection, a: &str, b: &str, kind: Relationship) -> rusqlite::Result<()> {
    let (name1, name2) = canonical_pair(a, b);
    conn.execute(
        "INSERT INTO pet_relationships (name1_id, name2_id, relationship)
         SELECT n1.row_id, n2.row_id, ?1
         FROM (SELECT row_id FROM pet_info WHERE name = ?2) n1,
              (SELECT row_id FROM pet_info WHERE name = ?3) n2
         ON CONFLICT(name1_id, name2_id) DO UPDATE SET relationship = excluded.relationship",
        params![kind.as_str(), name1, name2],
    )?;
    Ok(())
}

pub fn remove_relationship(conn: &Connection, a: &str, b: &str) -> rusqlite::Result<()> {
    let (name1, name2) = canonical_pair(a, b);
    conn.execute(
        "DELETE FROM pet_relationships
         WHERE rowid IN (
             SELECT r.rowid FROM pet_relationships r
             JOIN pet_info n1 ON n1.row_id = r.name1_id
             JOIN pet_info n2 ON n2.row_id = r.name2_id
             WHERE n1.name = ?1 AND n2.name = ?2
         )",
        params![name1, name2],
    )?;
    Ok(())
}

pub fn get_all_relationships(conn: &Connection) -> rusqlite::Result<Vec<(String, String, Relationship)>> {
    let mut stmt = conn.prepare(
        "SELECT n1.name, n2.name, r.relationship
         FROM pet_relationships r
         JOIN pet_info n1 ON n1.row_id = r.name1_id
         JOIN pet_info n2 ON n2.row_id = r.name2_id",
    )?;
    let rows = stmt.query_map([], |row| {
        let kind: String = row.get(2)?;
        Ok((row.get(0)?, row.get(1)?, Relationship::parse(&kind).unwrap_or(Relationship::Friends)))
    })?;
    rows.collect()
}

/// Every relationship touching at least one pet in `names`.
pub fn get_relationship_map(conn: &Connection, names: &[String]) -> rusqlite::Result<RelMap> {
    let mut map = RelMap::default();
    if names.is_empty() {
        return Ok(map);
    }
    let placeholders = names.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT n1.name, n2.name, r.relationship
         FROM pet_relationships r
         JOIN pet_info n1 ON n1.row_id = r.name1_id
         JOIN pet_info n2 ON n2.row_id = r.name2_id
         WHERE n1.name IN ({placeholders}) OR n2.name IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> =
        names.iter().chain(names.iter()).map(|n| n as &dyn rusqlite::ToSql).collect();
    let rows = stmt.query_map(bound.as_slice(), |row| {
        let kind: String = row.get(2)?;
        let a: String = row.get(0)?;
        let b: String = row.get(1)?;
        Ok((a, b, Relationship::parse(&kind).unwrap_or(Relationship::Friends)))
    })?;
    for row in rows {
        let (a, b, kind) = row?;
        map.add(&a, &b, kind);
    }
    Ok(map)
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

    /// Scenario 5: relationship canonical order.
    #[test]
    fn relationship_canonical_order() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("t.sqlite3"));
        let conn = db.open().unwrap();
        upsert_pet(&conn, &test_pet("alice")).unwrap();
        upsert_pet(&conn, &test_pet("bob")).unwrap();

        add_relationship(&conn, "bob", "alice", Relationship::Friends).unwrap();

        let all = get_all_relationships(&conn).unwrap();
        assert_eq!(all, vec![("alice".to_string(), "bob".to_string(), Relationship::Friends)]);
    }

    #[test]
    fn rel_map_mirrors_store_semantics() {
        let mut map = RelMap::default();
        map.add("bob", "alice", Relationship::Friends);
        assert_eq!(map.get_relationship("alice", "bob"), Some(Relationship::Friends));
        assert_eq!(map.get_relationships("alice").get("bob"), Some(&Relationship::Friends));
        map.remove("alice", "bob");
        assert_eq!(map.get_relationship("bob", "alice"), None);
    }
}
