//! The Outcome Engine - finish times and rankings.
//!
//! The speed model is a stylized heuristic:
//! ```text
//! finish_time = (distance / 100) × (2 − score / 100) × U[0.9, 1.1)
//! ```
//! so a score-100 horse runs at the base time and a score-1 horse takes
//! almost twice as long, each with ±10% noise.

use crate::horse::{Horse, HorseId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One horse's placing in a finished race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub horse_id: HorseId,
    pub horse_name: String,

    /// Seconds, rounded to hundredths
    pub finish_time: f64,

    /// 1-based rank
    pub position: u32,
}

/// Rounds to two decimal places.
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes a randomized finish time (seconds) for `horse` over `distance` meters.
pub fn calculate_finish_time<R: Rng + ?Sized>(horse: &Horse, distance: u32, rng: &mut R) -> f64 {
    let base_time = f64::from(distance) / 100.0;
    let random_factor = 0.9 + rng.gen::<f64>() * 0.2;
    let condition_factor = 2.0 - horse.condition_ratio();

    round_hundredths(base_time * condition_factor * random_factor)
}

/// Ranks horses by finish time.
///
/// Sorting is stable: equal times keep the roster order of `horses`.
/// Horses missing from `finish_times` are left out.
pub fn rank_results(horses: &[Horse], finish_times: &HashMap<HorseId, f64>) -> Vec<RaceResult> {
    let mut results: Vec<RaceResult> = horses
        .iter()
        .filter_map(|horse| {
            finish_times.get(&horse.id).map(|&finish_time| RaceResult {
                horse_id: horse.id,
                horse_name: horse.name.clone(),
                finish_time,
                position: 0,
            })
        })
        .collect();

    results.sort_by(|a, b| a.finish_time.total_cmp(&b.finish_time));
    for (index, result) in results.iter_mut().enumerate() {
        result.position = (index + 1) as u32;
    }

    results
}

/// Resolves a whole race at once: one finish time per horse, ranked.
pub fn resolve_instant<R: Rng + ?Sized>(horses: &[Horse], distance: u32, rng: &mut R) -> Vec<RaceResult> {
    let finish_times: HashMap<HorseId, f64> = horses
        .iter()
        .map(|horse| (horse.id, calculate_finish_time(horse, distance, rng)))
        .collect();

    rank_results(horses, &finish_times)
}
