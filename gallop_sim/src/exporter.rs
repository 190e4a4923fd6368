//! JSON exporter for race playback.
//!
//! Dumps sampled frames of horse positions so a run can be replayed or
//! plotted outside the harness.

use crate::error::SimError;
use gallop_core::{RaceEvent, RaceProgram};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Virtual time in seconds
    pub time_sec: f64,

    /// Session being animated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_session: Option<u64>,

    /// Horse positions, sorted by horse id
    pub horses: Vec<HorsePosition>,

    /// Engine events since the previous frame
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

impl SimFrame {
    /// Captures the animated state of `program`.
    pub fn capture(time_sec: f64, program: &RaceProgram, events: &[RaceEvent]) -> Self {
        let finished = program.finished_horses();
        let mut horses: Vec<HorsePosition> = program
            .horse_positions()
            .iter()
            .map(|(&id, &position)| HorsePosition {
                id,
                position,
                finished: finished.contains(&id),
            })
            .collect();
        horses.sort_by_key(|h| h.id);

        Self {
            time_sec,
            active_session: program.active_race_session_id().map(|id| id.as_u64()),
            horses,
            events: events.iter().map(SimEvent::from).collect(),
        }
    }
}

/// Position of one horse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorsePosition {
    pub id: u32,
    pub position: f64,
    pub finished: bool,
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl From<&RaceEvent> for SimEvent {
    fn from(event: &RaceEvent) -> Self {
        let level = match event {
            RaceEvent::SessionCompleted { .. } | RaceEvent::AnimationIdle => Some("info".to_string()),
            _ => None,
        };
        Self {
            message: format!("{:?}", event),
            level,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    /// Sessions completed by the end of the run
    pub sessions_completed: usize,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            sessions_completed: 0,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = self.duration_sec.max(frame.time_sec);
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, sessions_completed: usize) {
        self.passed = passed;
        self.sessions_completed = sessions_completed;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallop_core::ProgramConfig;
    use gallop_env::FrameDriven;
    use std::time::Duration;

    #[test]
    fn test_capture_sorts_horses() {
        let mut program = RaceProgram::with_seed(ProgramConfig::default(), 3).unwrap();
        program.generate_program().unwrap();
        program.start_all_races();
        program.on_frame(Duration::from_millis(16));
        program.on_frame(Duration::from_millis(1_000));

        let frame = SimFrame::capture(1.0, &program, &[RaceEvent::AnimationIdle]);

        assert_eq!(frame.horses.len(), 10);
        assert!(frame.horses.windows(2).all(|w| w[0].id < w[1].id));
        assert!(frame.horses.iter().any(|h| h.position > 0.0));
        assert_eq!(frame.active_session, Some(1));
        assert_eq!(frame.events.len(), 1);
        assert_eq!(frame.events[0].level.as_deref(), Some("info"));
    }

    #[test]
    fn test_export_serializes() {
        let mut export = SimExport::new("full_program", 42);
        export.add_frame(SimFrame {
            time_sec: 0.5,
            active_session: None,
            horses: vec![HorsePosition {
                id: 1,
                position: 5.0,
                finished: false,
            }],
            events: Vec::new(),
        });
        export.finalize(true, 6);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["scenario"], "full_program");
        assert_eq!(json["duration_sec"], 0.5);
        assert_eq!(json["sessions_completed"], 6);
        assert!(json["frames"][0].get("events").is_none());
        assert!(json["frames"][0].get("active_session").is_none());
    }
}
