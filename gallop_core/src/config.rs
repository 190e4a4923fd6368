//! Program configuration.

use crate::error::RaceError;
use crate::factory::RACE_DISTANCES;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a race program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Distances (meters) of the sessions in one generated program, in order
    pub distances: Vec<u32>,

    /// Horses sampled into every session
    pub horses_per_session: usize,

    /// Horses in the registry at startup
    pub initial_pool_size: usize,

    /// Animation finish line position (normalized track units)
    pub track_length: f64,

    /// Animation base speed in track units per second
    pub base_speed: f64,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            distances: RACE_DISTANCES.to_vec(),
            horses_per_session: 10,
            initial_pool_size: 20,
            track_length: 100.0,
            base_speed: 10.0,
        }
    }
}

impl ProgramConfig {
    /// Parses and validates a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, RaceError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RaceError::config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RaceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RaceError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Checks the values the engine depends on.
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.distances.is_empty() {
            return Err(RaceError::config("distances must not be empty"));
        }
        if self.distances.contains(&0) {
            return Err(RaceError::config("distances must be positive"));
        }
        if self.horses_per_session == 0 {
            return Err(RaceError::config("horses_per_session must be at least 1"));
        }
        if !(self.track_length.is_finite() && self.track_length > 0.0) {
            return Err(RaceError::config("track_length must be positive"));
        }
        if !(self.base_speed.is_finite() && self.base_speed > 0.0) {
            return Err(RaceError::config("base_speed must be positive"));
        }
        Ok(())
    }
}
