//! The durable embedded store: schema, upsert/resolution, retention, and
//! time-series aggregation. Every public method on [`Store`] opens its own
//! short-lived connection via [`tokio::task::spawn_blocking`] — there is no
//! shared connection pool, matching the concurrency model in which each
//! collector tick is independent and the store alone serializes writes.

mod db;
mod network;
mod pets;
mod relationships;
mod samples;

use std::collections::HashMap;
use std::sync::Arc;

pub use db::Db;
pub use network::{get_extra_network_info, list_network_info, resolve_pets_to_interfaces};
pub use relationships::RelMap;
pub use samples::{RetentionTable, mean_bps};

use lanpets_types::{ExtraNetworkInfoType, MeanTraffic, Mood, NetworkInterfaceInfo, PetInfo, Relationship};

#[derive(Debug, Clone)]
pub struct Store {
    db: Arc<Db>,
}

impl Store {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { db: Arc::new(Db::new(path)) }
    }

    /// Eagerly create the schema. Every method does this implicitly on
    /// first connection too; this exists so a caller (the `monitor` binary)
    /// can fail fast on a broken data directory before starting workers.
    pub fn ensure_schema(&self) -> Result<(), String> {
        self.db.open().map(|_| ())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, String> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.open()?;
            f(&conn)
        })
        .await
        .map_err(|error| format!("join sqlite task: {error}"))?
    }

    pub async fn upsert_pet(&self, pet: PetInfo) -> Result<(), String> {
        self.with_conn(move |conn| pets::upsert_pet(conn, &pet).map_err(|e| format!("upsert_pet: {e}"))).await
    }

    pub async fn soft_delete_pet(&self, name: String) -> Result<(), String> {
        self.with_conn(move |conn| pets::soft_delete_pet(conn, &name).map_err(|e| format!("soft_delete_pet: {e}"))).await
    }

    pub async fn get_pet(&self, name: String) -> Result<Option<PetInfo>, String> {
        self.with_conn(move |conn| pets::get_pet(conn, &name).map_err(|e| format!("get_pet: {e}"))).await
    }

    pub async fn list_pets(&self) -> Result<Vec<PetInfo>, String> {
        self.with_conn(|conn| pets::list_pets(conn).map_err(|e| format!("list_pets: {e}"))).await
    }

    pub async fn update_pet_mood(&self, name: String, mood: Mood) -> Result<(), String> {
        self.with_conn(move |conn| pets::update_pet_mood(conn, &name, mood).map_err(|e| format!("update_pet_mood: {e}")))
            .await
    }

    pub async fn add_network_info(
        &self,
        rec: NetworkInterfaceInfo,
        extra: HashMap<ExtraNetworkInfoType, String>,
    ) -> Result<(), String> {
        self.with_conn(move |conn| network::add_network_info(conn, &rec, &extra)).await
    }

    pub async fn list_network_info(&self) -> Result<Vec<NetworkInterfaceInfo>, String> {
        self.with_conn(|conn| network::list_network_info(conn).map_err(|e| format!("list_network_info: {e}"))).await
    }

    pub async fn get_extra_network_info(
        &self,
        iface: NetworkInterfaceInfo,
    ) -> Result<HashMap<ExtraNetworkInfoType, String>, String> {
        self.with_conn(move |conn| {
            network::get_extra_network_info(conn, &iface).map_err(|e| format!("get_extra_network_info: {e}"))
        })
        .await
    }

    pub async fn resolve_pets_to_interfaces(
        &self,
        pets: Vec<PetInfo>,
        hard_coded: HashMap<String, NetworkInterfaceInfo>,
    ) -> Result<HashMap<String, NetworkInterfaceInfo>, String> {
        self.with_conn(move |conn| {
            network::resolve_pets_to_interfaces(conn, &pets, &hard_coded)
                .map_err(|e| format!("resolve_pets_to_interfaces: {e}"))
        })
        .await
    }

    pub async fn append_availability(&self, name: String, is_available: bool, timestamp: i64) -> Result<(), String> {
        self.with_conn(move |conn| {
            samples::append_availability(conn, &name, is_available, timestamp).map_err(|e| format!("append_availability: {e}"))
        })
        .await
    }

    pub async fn append_traffic(&self, name: String, rx_bytes: i64, tx_bytes: i64, timestamp: i64) -> Result<(), String> {
        self.with_conn(move |conn| {
            samples::append_traffic(conn, &name, rx_bytes, tx_bytes, timestamp).map_err(|e| format!("append_traffic: {e}"))
        })
        .await
    }

    pub async fn append_cpu(&self, name: String, cpu_used_percent: f64, mem_used_percent: f64, timestamp: i64) -> Result<(), String> {
        self.with_conn(move |conn| {
            samples::append_cpu(conn, &name, cpu_used_percent, mem_used_percent, timestamp)
                .map_err(|e| format!("append_cpu: {e}"))
        })
        .await
    }

    pub async fn mean_availability(&self, names: Vec<String>, since: i64) -> Result<HashMap<String, f64>, String> {
        self.with_conn(move |conn| samples::mean_availability(conn, &names, since).map_err(|e| format!("mean_availability: {e}")))
            .await
    }

    pub async fn current_availability(&self, names: Vec<String>) -> Result<HashMap<String, bool>, String> {
        self.with_conn(move |conn| {
            samples::current_availability(conn, &names).map_err(|e| format!("current_availability: {e}"))
        })
        .await
    }

    pub async fn last_seen(&self, names: Vec<String>) -> Result<HashMap<String, i64>, String> {
        self.with_conn(move |conn| samples::last_seen(conn, &names).map_err(|e| format!("last_seen: {e}"))).await
    }

    pub async fn load_mean_traffic(
        &self,
        names: Vec<String>,
        since: i64,
        ignore_zero: bool,
    ) -> Result<HashMap<String, MeanTraffic>, String> {
        self.with_conn(move |conn| {
            let mut out = HashMap::new();
            for name in &names {
                let series = samples::load_traffic(conn, name, since).map_err(|e| format!("load_traffic({name}): {e}"))?;
                out.insert(name.clone(), mean_bps(&series, ignore_zero));
            }
            Ok(out)
        })
        .await
    }

    pub async fn delete_entries_older_than(&self, table: RetentionTable, cutoff: i64) -> Result<(), String> {
        self.with_conn(move |conn| {
            samples::delete_entries_older_than(conn, table, cutoff).map_err(|e| format!("delete_entries_older_than: {e}"))
        })
        .await
    }

    pub async fn add_relationship(&self, a: String, b: String, kind: Relationship) -> Result<(), String> {
        self.with_conn(move |conn| {
            relationships::add_relationship(conn, &a, &b, kind).map_err(|e| format!("add_relationship: {e}"))
        })
        .await
    }

    pub async fn remove_relationship(&self, a: String, b: String) -> Result<(), String> {
        self.with_conn(move |conn| {
            relationships::remove_relationship(conn, &a, &b).map_err(|e| format!("remove_relationship: {e}"))
        })
        .await
    }

    pub async fn get_all_relationships(&self) -> Result<Vec<(String, String, Relationship)>, String> {
        self.with_conn(|conn| relationships::get_all_relationships(conn).map_err(|e| format!("get_all_relationships: {e}")))
            .await
    }

    pub async fn get_relationship_map(&self, names: Vec<String>) -> Result<RelMap, String> {
        self.with_conn(move |conn| {
            relationships::get_relationship_map(conn, &names).map_err(|e| format!("get_relationship_map: {e}"))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanpets_types::{DeviceType, IdentifierType};
    use tempfile::tempdir;

    #[tokio::test]
    async fn end_to_end_pet_lifecycle() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("lanpets.sqlite3"));
        store.ensure_schema().unwrap();

        let pet = PetInfo {
            name: "rex".into(),
            identifier_type: IdentifierType::Ip,
            identifier_value: "10.0.0.9".into(),
            device_type: DeviceType::Iot,
            description: "smart feeder".into(),
            mood: Mood::Jolly,
            is_deleted: false,
        };
        store.upsert_pet(pet.clone()).await.unwrap();
        store.append_availability("rex".into(), true, 10).await.unwrap();
        store.append_traffic("rex".into(), 0, 0, 0).await.unwrap();
        store.append_traffic("rex".into(), 500, 10, 5).await.unwrap();

        let traffic = store.load_mean_traffic(vec!["rex".into()], 0, true).await.unwrap();
        assert_eq!(traffic["rex"].rx_bytes_bps, 100.0);

        let avail = store.current_availability(vec!["rex".into()]).await.unwrap();
        assert!(avail["rex"]);

        store.soft_delete_pet("rex".into()).await.unwrap();
        assert!(store.get_pet("rex".into()).await.unwrap().is_none());
    }
}
