//! The stochastic friend/enemy evolution step, transliterated from the
//! back half of `pet_ai.py::PetAi._update` (everything after the mood is
//! assigned).

use std::collections::HashMap;

use lanpets_store::{RelMap, Store};
use lanpets_types::{Mood, Relationship};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::mood::roll;
use crate::settings::PetAiSettings;

/// Runs one pet's friend/enemy evolution for this tick. `rel_map` is
/// mutated in lockstep with every store write so a later pet in the same
/// tick sees relationships this pet just formed or broke, without a
/// second round-trip to re-read them (P10: at most one new friend and one
/// new enemy per pet per tick — enforced structurally below, not by a
/// counter).
pub async fn evolve_pet_relationships(
    store: &Store,
    rel_map: &mut RelMap,
    rng: &mut impl Rng,
    name: &str,
    mood: Mood,
    online_pets: &[String],
    previous_moods: &HashMap<String, Mood>,
    settings: &PetAiSettings,
) -> Result<(), String> {
    let relationships = rel_map.get_relationships(name);
    let friends: Vec<String> =
        relationships.iter().filter(|(_, kind)| **kind == Relationship::Friends).map(|(n, _)| n.clone()).collect();
    let enemies: Vec<String> =
        relationships.iter().filter(|(_, kind)| **kind == Relationship::Enemy).map(|(n, _)| n.clone()).collect();

    let mut potentials: Vec<String> =
        online_pets.iter().filter(|n| n.as_str() != name && !relationships.contains_key(*n)).cloned().collect();

    let best_friend_moods = mood.best_friends();
    let potential_best_friends: Vec<String> = potentials
        .iter()
        .filter(|n| previous_moods.get(*n).is_some_and(|m| best_friend_moods.contains(m)))
        .cloned()
        .collect();

    if !friends.is_empty() && roll(rng, settings.prob_lose_friend) {
        let breakup = friends.choose(rng).expect("checked non-empty").clone();
        tracing::info!(pet = %name, friend = %breakup, "friendship ended");
        rel_map.remove(name, &breakup);
        store.remove_relationship(name.to_string(), breakup).await?;
    }

    if !enemies.is_empty() && roll(rng, settings.prob_lose_enemy) {
        let breakup = enemies.choose(rng).expect("checked non-empty").clone();
        tracing::info!(pet = %name, enemy = %breakup, "truce declared");
        rel_map.remove(name, &breakup);
        store.remove_relationship(name.to_string(), breakup).await?;
    }

    if potentials.is_empty() {
        return Ok(());
    }

    let prob_new_friend =
        (settings.prob_make_friend - settings.prob_make_friend_per_friend_drop * friends.len() as f64).max(0.0);
    let prob_new_best_friend = prob_new_friend * settings.friend_mood_multiplier;
    let friend_roll = rng.gen_range(0.0..1.0);
    if friend_roll < prob_new_best_friend {
        let friend_name = if friend_roll < prob_new_friend {
            potentials.choose(rng).cloned()
        } else {
            potential_best_friends.choose(rng).cloned()
        };
        if let Some(friend_name) = friend_name {
            tracing::info!(pet = %name, friend = %friend_name, "new friendship");
            store.add_relationship(name.to_string(), friend_name.clone(), Relationship::Friends).await?;
            rel_map.add(name, &friend_name, Relationship::Friends);
            potentials.retain(|n| n != &friend_name);
        }
    }

    let prob_new_enemy =
        (settings.prob_make_enemy - settings.prob_make_enemy_per_enemy_drop * enemies.len() as f64).max(0.0);
    let enemy_roll = rng.gen_range(0.0..1.0);
    if !potentials.is_empty() && enemy_roll < prob_new_enemy {
        let enemy_name = potentials.choose(rng).expect("checked non-empty").clone();
        tracing::info!(pet = %name, enemy = %enemy_name, "new enmity");
        store.add_relationship(name.to_string(), enemy_name.clone(), Relationship::Enemy).await?;
        rel_map.add(name, &enemy_name, Relationship::Enemy);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanpets_types::{DeviceType, IdentifierType, PetInfo};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    fn pet(name: &str) -> PetInfo {
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

    /// P10: a single tick never grants a pet more than one new friend and
    /// one new enemy, even with probabilities cranked to guarantee both
    /// rolls succeed.
    #[tokio::test]
    async fn at_most_one_new_friend_and_one_new_enemy_per_tick() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("t.sqlite3"));
        store.ensure_schema().unwrap();
        for name in ["alice", "bob", "carol", "dave"] {
            store.upsert_pet(pet(name)).await.unwrap();
        }

        let online = vec!["alice".to_string(), "bob".to_string(), "carol".to_string(), "dave".to_string()];
        let mut rel_map = store.get_relationship_map(online.clone()).await.unwrap();
        let previous_moods: HashMap<String, Mood> = online.iter().map(|n| (n.clone(), Mood::Jolly)).collect();

        let settings = PetAiSettings {
            prob_make_friend: 1.0,
            prob_make_friend_per_friend_drop: 0.0,
            friend_mood_multiplier: 1.0,
            prob_make_enemy: 1.0,
            prob_make_enemy_per_enemy_drop: 0.0,
            prob_lose_friend: 0.0,
            prob_lose_enemy: 0.0,
            ..PetAiSettings::default()
        };

        let mut rng = StdRng::seed_from_u64(7);
        evolve_pet_relationships(&store, &mut rel_map, &mut rng, "alice", Mood::Jolly, &online, &previous_moods, &settings)
            .await
            .unwrap();

        let relationships = rel_map.get_relationships("alice");
        let new_friends = relationships.values().filter(|k| **k == Relationship::Friends).count();
        let new_enemies = relationships.values().filter(|k| **k == Relationship::Enemy).count();
        assert!(new_friends <= 1);
        assert!(new_enemies <= 1);
    }

    #[tokio::test]
    async fn zero_probabilities_never_change_relationships() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("t.sqlite3"));
        store.ensure_schema().unwrap();
        for name in ["alice", "bob"] {
            store.upsert_pet(pet(name)).await.unwrap();
        }
        let online = vec!["alice".to_string(), "bob".to_string()];
        let mut rel_map = store.get_relationship_map(online.clone()).await.unwrap();
        let previous_moods: HashMap<String, Mood> = online.iter().map(|n| (n.clone(), Mood::Jolly)).collect();

        let settings = PetAiSettings {
            prob_make_friend: 0.0,
            prob_make_enemy: 0.0,
            prob_lose_friend: 0.0,
            prob_lose_enemy: 0.0,
            ..PetAiSettings::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        evolve_pet_relationships(&store, &mut rel_map, &mut rng, "alice", Mood::Jolly, &online, &previous_moods, &settings)
            .await
            .unwrap();
        assert!(rel_map.get_relationships("alice").is_empty());
    }
}
