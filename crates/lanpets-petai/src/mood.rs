//! `MoodAttributes` — the windowed per-pet stats the mood algorithms read —
//! and the three algorithms themselves, transliterated field-for-field from
//! `pet_ai.py::_get_mood`.

use lanpets_types::Mood;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodAttributes {
    pub rx_bps: f64,
    pub tx_bps: f64,
    pub num_services: usize,
    pub on_line: bool,
    pub availability_pct: f64,
}

/// The population-median of each numeric field in [`MoodAttributes`],
/// computed once per tick for the `ActivityServices` algorithm so moods
/// split roughly evenly across whatever pets happen to be configured.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MedianAttributes {
    pub rx_bps: f64,
    pub tx_bps: f64,
    pub num_services: f64,
    pub availability_pct: f64,
}

pub fn median_attributes(attributes: &[MoodAttributes]) -> MedianAttributes {
    MedianAttributes {
        rx_bps: median(attributes.iter().map(|a| a.rx_bps).collect()),
        tx_bps: median(attributes.iter().map(|a| a.tx_bps).collect()),
        num_services: median(attributes.iter().map(|a| a.num_services as f64).collect()),
        availability_pct: median(attributes.iter().map(|a| a.availability_pct).collect()),
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).expect("mood attribute is never NaN"));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 { (values[mid - 1] + values[mid]) / 2.0 } else { values[mid] }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoodAlgorithm {
    Random,
    Activity1,
    ActivityServices,
}

impl Default for MoodAlgorithm {
    fn default() -> Self {
        MoodAlgorithm::ActivityServices
    }
}

/// Thresholds the `Activity1` algorithm compares raw attributes against
/// (`ActivityServices` compares against the tick's own median instead).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodThresholds {
    pub uptime_percent_for_available: f64,
    pub average_bytes_per_sec_for_loud: f64,
}

impl Default for MoodThresholds {
    fn default() -> Self {
        Self { uptime_percent_for_available: 90.0, average_bytes_per_sec_for_loud: 51_200.0 }
    }
}

pub fn mood_for(
    stats: MoodAttributes,
    median: MedianAttributes,
    algorithm: MoodAlgorithm,
    thresholds: MoodThresholds,
) -> Mood {
    match algorithm {
        MoodAlgorithm::Random => *Mood::ALL.choose(&mut rand::thread_rng()).expect("Mood::ALL is non-empty"),
        MoodAlgorithm::Activity1 => {
            let present = stats.availability_pct > thresholds.uptime_percent_for_available;
            let high_rx = stats.rx_bps > thresholds.average_bytes_per_sec_for_loud;
            let high_tx = stats.tx_bps > thresholds.average_bytes_per_sec_for_loud;
            activity1_table(high_tx, high_rx, present)
        }
        MoodAlgorithm::ActivityServices => {
            let present = stats.availability_pct > median.availability_pct;
            let high_rx = stats.rx_bps > median.rx_bps;
            let high_services = stats.num_services as f64 > median.num_services;
            activity_services_table(high_services, high_rx, present)
        }
    }
}

fn activity1_table(high_tx: bool, high_rx: bool, present: bool) -> Mood {
    match (high_tx, high_rx, present) {
        (true, true, true) => Mood::Jolly,
        (true, false, true) => Mood::Sassy,
        (false, true, true) => Mood::Calm,
        (false, false, true) => Mood::Modest,
        (true, true, false) => Mood::Dreamy,
        (true, false, false) => Mood::Impish,
        (false, true, false) => Mood::Sneaky,
        (false, false, false) => Mood::Shy,
    }
}

fn activity_services_table(high_services: bool, high_rx: bool, present: bool) -> Mood {
    match (high_services, high_rx, present) {
        (true, true, true) => Mood::Jolly,
        (true, false, true) => Mood::Calm,
        (false, true, true) => Mood::Sassy,
        (false, false, true) => Mood::Modest,
        (true, true, false) => Mood::Dreamy,
        (true, false, false) => Mood::Impish,
        (false, true, false) => Mood::Sneaky,
        (false, false, false) => Mood::Shy,
    }
}

/// `random.uniform(0, 1) < p` — used throughout the relationship evolution
/// step; pulled out so tests can exercise the boundary.
pub fn roll(rng: &mut impl Rng, probability: f64) -> bool {
    rng.gen_range(0.0..1.0) < probability
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        assert_eq!(median(vec![1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn median_of_odd_count_returns_middle_value() {
        assert_eq!(median(vec![5.0, 1.0, 3.0]), 3.0);
    }

    #[test]
    fn activity1_all_true_is_jolly() {
        assert_eq!(activity1_table(true, true, true), Mood::Jolly);
    }

    #[test]
    fn activity1_all_false_is_shy() {
        assert_eq!(activity1_table(false, false, false), Mood::Shy);
    }

    #[test]
    fn activity_services_swaps_sassy_and_calm_relative_to_activity1() {
        // The two algorithms share the all-true/all-false corners but
        // disagree on the middle rows, per `pet_ai.py::_get_mood`.
        assert_eq!(activity_services_table(true, false, true), Mood::Calm);
        assert_eq!(activity1_table(true, false, true), Mood::Sassy);
    }
}
