use lanpets_types::{DeviceType, IdentifierType, Mood, PetInfo};
use rusqlite::{Connection, OptionalExtension, Row, params};

pub fn row_to_pet(row: &Row) -> rusqlite::Result<PetInfo> {
    let identifier_type: String = row.get("identifier_type")?;
    let device_type: String = row.get("device_type")?;
    let mood: String = row.get("mood")?;
    Ok(PetInfo {
        name: row.get("name")?,
        identifier_type: IdentifierType::parse(&identifier_type).unwrap_or(IdentifierType::Host),
        identifier_value: row.get("identifier_value")?,
        device_type: DeviceType::parse(&device_type).unwrap_or(DeviceType::Other),
        description: row.get("description")?,
        mood: Mood::parse(&mood).unwrap_or(Mood::Jolly),
        is_deleted: row.get::<_, i64>("is_deleted")? != 0,
    })
}

/// Insert a pet, or on name collision overwrite every field and clear
/// `is_deleted` — re-adding a logically-deleted pet revives it.
pub fn upsert_pet(conn: &Connection, pet: &PetInfo) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO pet_info (name, identifier_type, identifier_value, device_type, description, mood, is_deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
         ON CONFLICT(name) DO UPDATE SET
           identifier_type = excluded.identifier_type,
           identifier_value = excluded.identifier_value,
           device_type = excluded.device_type,
           description = excluded.description,
           mood = excluded.mood,
           is_deleted = 0",
        params![
            pet.name,
            pet.identifier_type.as_str(),
            pet.identifier_value,
            pet.device_type.as_str(),
            pet.description,
            pet.mood.as_str(),
        ],
    )?;
    Ok(())
}

/// Idempotent: a pet that is already deleted, or does not exist, is left
/// untouched either way.
pub fn soft_delete_pet(conn: &Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute("UPDATE pet_info SET is_deleted = 1 WHERE name = ?1", params![name])?;
    Ok(())
}

pub fn update_pet_mood(conn: &Connection, name: &str, mood: Mood) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE pet_info SET mood = ?1 WHERE name = ?2 AND is_deleted = 0",
        params![mood.as_str(), name],
    )?;
    Ok(())
}

pub fn get_pet(conn: &Connection, name: &str) -> rusqlite::Result<Option<PetInfo>> {
    conn.query_row(
        "SELECT name, identifier_type, identifier_value, device_type, description, mood, is_deleted
         FROM pet_info WHERE name = ?1 AND is_deleted = 0",
        params![name],
        row_to_pet,
    )
    .optional()
}

pub fn list_pets(conn: &Connection) -> rusqlite::Result<Vec<PetInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, identifier_type, identifier_value, device_type, description, mood, is_deleted
         FROM pet_info WHERE is_deleted = 0",
    )?;
    let rows = stmt.query_map([], row_to_pet)?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use tempfile::tempdir;

    fn pet(name: &str) -> PetInfo {
        PetInfo {
            name: name.into(),
            identifier_type: IdentifierType::Host,
            identifier_value: format!("{name}.lan"),
            device_type: DeviceType::Pc,
            description: "test pet".into(),
            mood: Mood::Jolly,
            is_deleted: false,
        }
    }

    /// P8: soft-delete then re-add revives the pet with the new fields.
    #[test]
    fn soft_delete_then_upsert_revives() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("test.sqlite3"));
        let conn = db.open().unwrap();

        upsert_pet(&conn, &pet("fido")).unwrap();
        soft_delete_pet(&conn, "fido").unwrap();
        assert!(get_pet(&conn, "fido").unwrap().is_none());

        let mut revived = pet("fido");
        revived.description = "revived".into();
        upsert_pet(&conn, &revived).unwrap();

        let got = get_pet(&conn, "fido").unwrap().unwrap();
        assert_eq!(got.description, "revived");
        assert!(!got.is_deleted);
    }

    #[test]
    fn update_mood_is_noop_for_absent_pet() {
        let dir = tempdir().unwrap();
        let db = Db::new(dir.path().join("test.sqlite3"));
        let conn = db.open().unwrap();
        update_pet_mood(&conn, "nobody", Mood::Shy).unwrap();
        assert!(list_pets(&conn).unwrap().is_empty());
    }
}
