//! Pet AI: once per `update_period_sec`, reduces each pet's windowed
//! traffic/availability/service counts into a [`Mood`], persists it, then
//! runs the stochastic friendship/enmity evolution over online pets.
//! Transliterated from `pet_ai.py::PetAi`.

mod evolve;
mod mood;
mod settings;

use std::collections::HashMap;

use lanpets_runtime::{CollectorError, Worker};
use lanpets_store::Store;
use lanpets_types::{ExtraNetworkInfoType, Mood, NetworkInterfaceInfo};

pub use evolve::evolve_pet_relationships;
pub use mood::{MoodAlgorithm, MoodAttributes, MoodThresholds, median_attributes, mood_for};
pub use settings::PetAiSettings;

pub struct PetAi {
    store: Store,
    hard_coded: HashMap<String, NetworkInterfaceInfo>,
    settings: PetAiSettings,
}

impl PetAi {
    pub fn new(store: Store, hard_coded: HashMap<String, NetworkInterfaceInfo>, settings: PetAiSettings) -> Self {
        Self { store, hard_coded, settings }
    }
}

#[async_trait::async_trait]
impl Worker for PetAi {
    fn name(&self) -> &str {
        "pet_ai"
    }

    async fn update(&self) -> Result<(), CollectorError> {
        let now = now_unix();
        let cutoff = now - self.settings.history_window_sec;

        let pets = self.store.list_pets().await.map_err(CollectorError::Fatal)?;
        let pet_names: Vec<String> = pets.iter().map(|p| p.name.clone()).collect();
        if pet_names.is_empty() {
            return Ok(());
        }

        let interfaces = self
            .store
            .resolve_pets_to_interfaces(pets.clone(), self.hard_coded.clone())
            .await
            .map_err(CollectorError::Fatal)?;
        let traffic = self.store.load_mean_traffic(pet_names.clone(), cutoff, true).await.map_err(CollectorError::Fatal)?;
        let availability_mean =
            self.store.mean_availability(pet_names.clone(), cutoff).await.map_err(CollectorError::Fatal)?;
        let current_availability =
            self.store.current_availability(pet_names.clone()).await.map_err(CollectorError::Fatal)?;

        let mut attributes: HashMap<String, MoodAttributes> = HashMap::new();
        for pet in &pets {
            let num_services = match interfaces.get(&pet.name) {
                Some(iface) => {
                    let extra =
                        self.store.get_extra_network_info(iface.clone()).await.map_err(CollectorError::Fatal)?;
                    service_count(&extra)
                }
                None => 0,
            };
            attributes.insert(
                pet.name.clone(),
                MoodAttributes {
                    rx_bps: traffic.get(&pet.name).map(|t| t.rx_bytes_bps).unwrap_or(0.0),
                    tx_bps: traffic.get(&pet.name).map(|t| t.tx_bytes_bps).unwrap_or(0.0),
                    num_services,
                    on_line: *current_availability.get(&pet.name).unwrap_or(&false),
                    availability_pct: *availability_mean.get(&pet.name).unwrap_or(&0.0),
                },
            );
        }

        let median = median_attributes(&attributes.values().copied().collect::<Vec<_>>());
        let online_pets: Vec<String> =
            pets.iter().filter(|p| attributes.get(&p.name).is_some_and(|a| a.on_line)).map(|p| p.name.clone()).collect();

        let mut rel_map =
            self.store.get_relationship_map(online_pets.clone()).await.map_err(CollectorError::Fatal)?;
        let previous_moods: HashMap<String, Mood> = pets.iter().map(|p| (p.name.clone(), p.mood)).collect();
        let mut rng = rand::thread_rng();

        for pet in &pets {
            let Some(stats) = attributes.get(&pet.name).copied() else { continue };
            let new_mood = mood_for(stats, median, self.settings.mood_algorithm, self.settings.thresholds);
            let previous_mood = previous_moods[&pet.name];
            if new_mood != previous_mood {
                tracing::info!(pet = %pet.name, from = previous_mood.as_str(), to = new_mood.as_str(), "mood changed");
            }
            if let Err(error) = self.store.update_pet_mood(pet.name.clone(), new_mood).await {
                tracing::error!(pet = %pet.name, error = %error, "failed to persist mood");
            }

            if !stats.on_line {
                continue;
            }
            if let Err(error) = evolve_pet_relationships(
                &self.store,
                &mut rel_map,
                &mut rng,
                &pet.name,
                new_mood,
                &online_pets,
                &previous_moods,
                &self.settings,
            )
            .await
            {
                tracing::error!(pet = %pet.name, error = %error, "relationship evolution write failed");
            }
        }

        Ok(())
    }
}

/// Number of advertised services for a pet: the larger of its mDNS and
/// NMAP service lists, each a comma-joined string (`pet_ai.py` takes the
/// max across the same two `ExtraNetworkInfoType`s).
fn service_count(extra: &HashMap<ExtraNetworkInfoType, String>) -> usize {
    [ExtraNetworkInfoType::MdnsServices, ExtraNetworkInfoType::NmapServices]
        .iter()
        .map(|kind| extra.get(kind).map(|s| s.split(',').filter(|part| !part.is_empty()).count()).unwrap_or(0))
        .max()
        .unwrap_or(0)
}

fn now_unix() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_count_ignores_missing_entries() {
        let extra = HashMap::new();
        assert_eq!(service_count(&extra), 0);
    }

    #[test]
    fn service_count_is_the_max_of_mdns_and_nmap() {
        let mut extra = HashMap::new();
        extra.insert(ExtraNetworkInfoType::MdnsServices, "_http,_ssh".to_string());
        extra.insert(ExtraNetworkInfoType::NmapServices, "22(ssh)".to_string());
        assert_eq!(service_count(&extra), 2);
    }
}
