use serde::{Deserialize, Serialize};

use crate::mood::{MoodAlgorithm, MoodThresholds};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PetAiSettings {
    pub update_period_sec: u64,
    pub mood_algorithm: MoodAlgorithm,
    pub history_window_sec: i64,
    #[serde(flatten)]
    pub thresholds: MoodThresholds,
    pub prob_lose_friend: f64,
    pub prob_lose_enemy: f64,
    pub prob_make_friend: f64,
    pub prob_make_friend_per_friend_drop: f64,
    pub prob_make_enemy: f64,
    pub prob_make_enemy_per_enemy_drop: f64,
    pub friend_mood_multiplier: f64,
}

impl Default for PetAiSettings {
    fn default() -> Self {
        Self {
            update_period_sec: 3600,
            mood_algorithm: MoodAlgorithm::default(),
            history_window_sec: 3600,
            thresholds: MoodThresholds::default(),
            prob_lose_friend: 0.05,
            prob_lose_enemy: 0.05,
            prob_make_friend: 0.10,
            prob_make_friend_per_friend_drop: 0.02,
            prob_make_enemy: 0.05,
            prob_make_enemy_per_enemy_drop: 0.01,
            friend_mood_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_md_section_6() {
        let settings = PetAiSettings::default();
        assert_eq!(settings.update_period_sec, 3600);
        assert_eq!(settings.history_window_sec, 3600);
    }
}
