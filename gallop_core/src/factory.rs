//! Race/session factory.

use crate::error::RaceError;
use crate::horse::Horse;
use crate::session::{Race, Session, SessionId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::SystemTime;

/// Distances (meters) of one program, in running order.
pub const RACE_DISTANCES: [u32; 6] = [1200, 1400, 1600, 1800, 2000, 2200];

/// Display name of a session.
pub fn session_name(id: SessionId, distance: u32) -> String {
    format!("Race {} - {}m", id, distance)
}

/// Builds a pending session with no results.
pub fn create_session(id: SessionId, distance: u32, horses: Vec<Horse>, created_at: SystemTime) -> Session {
    Session {
        id,
        name: session_name(id, distance),
        distance,
        horses,
        results: Vec::new(),
        lifecycle: Default::default(),
        created_at,
    }
}

/// Samples `count` distinct horses uniformly from `pool`.
///
/// A pool smaller than `count` is an error rather than a short roster.
pub fn select_random_horses<R: Rng + ?Sized>(
    pool: &[Horse],
    count: usize,
    rng: &mut R,
) -> Result<Vec<Horse>, RaceError> {
    if pool.len() < count {
        return Err(RaceError::InsufficientHorses {
            requested: count,
            available: pool.len(),
        });
    }

    Ok(pool.choose_multiple(rng, count).cloned().collect())
}

/// Builds round-indexed races `1..=distances.len()`.
pub fn initialize_races<R: Rng + ?Sized>(
    pool: &[Horse],
    distances: &[u32],
    horses_per_race: usize,
    rng: &mut R,
) -> Result<Vec<Race>, RaceError> {
    distances
        .iter()
        .enumerate()
        .map(|(index, &distance)| {
            let horses = select_random_horses(pool, horses_per_race, rng)?;
            Ok(Race::new(index as u32 + 1, distance, horses))
        })
        .collect()
}
