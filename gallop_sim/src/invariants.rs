//! Data-model invariants, checked after every simulated frame.
//!
//! - Every session has a full roster of distinct horses
//! - `is_paused ⇒ is_running`, `is_running ⇒ !is_completed`
//! - Results exist only on completed sessions, ranked 1..=n by finish time
//! - Session ids strictly increase
//! - Only the animated session may be running; it is never completed
//! - Positions stay on the track; finished horses sit on the line
//! - Horse ids are unique and condition scores lie in [1, 100]

use crate::error::SimError;
use gallop_core::{Lifecycle, RaceProgram, RaceResult};
use std::collections::HashSet;

/// Checks every invariant, returning the first violation.
pub fn check_program(program: &RaceProgram) -> Result<(), SimError> {
    check_registry(program)?;
    check_sessions(program)?;
    check_animation(program)?;
    Ok(())
}

fn check_registry(program: &RaceProgram) -> Result<(), SimError> {
    let mut ids = HashSet::new();
    for horse in program.registry().horses() {
        if !ids.insert(horse.id) {
            return Err(SimError::invariant(format!("duplicate horse id {}", horse.id)));
        }
        if !(1..=100).contains(&horse.condition_score) {
            return Err(SimError::invariant(format!(
                "horse {} has condition score {}",
                horse.id, horse.condition_score
            )));
        }
    }
    Ok(())
}

fn check_lifecycle(label: &str, lifecycle: &Lifecycle) -> Result<(), SimError> {
    if lifecycle.is_paused() && !lifecycle.is_running() {
        return Err(SimError::invariant(format!("{} is paused but not running", label)));
    }
    if lifecycle.is_running() && lifecycle.is_completed() {
        return Err(SimError::invariant(format!("{} is running and completed", label)));
    }
    Ok(())
}

/// Positions 1..=n in order, finish times non-decreasing.
pub fn check_ranking(label: &str, results: &[RaceResult]) -> Result<(), SimError> {
    for (index, result) in results.iter().enumerate() {
        if result.position as usize != index + 1 {
            return Err(SimError::invariant(format!(
                "{}: result {} has position {}",
                label, index, result.position
            )));
        }
    }
    if results.windows(2).any(|w| w[0].finish_time > w[1].finish_time) {
        return Err(SimError::invariant(format!("{}: results not sorted by finish time", label)));
    }
    Ok(())
}

fn check_sessions(program: &RaceProgram) -> Result<(), SimError> {
    let roster_size = program.config().horses_per_session;
    let active = program.active_race_session_id();
    let mut last_id = None;

    for session in program.sessions() {
        let label = format!("session {}", session.id);

        if last_id.map_or(false, |last| session.id <= last) {
            return Err(SimError::invariant(format!("{} is out of order", label)));
        }
        last_id = Some(session.id);

        let distinct: HashSet<_> = session.horses.iter().map(|h| h.id).collect();
        if session.horses.len() != roster_size || distinct.len() != roster_size {
            return Err(SimError::invariant(format!(
                "{} has {} horses ({} distinct), expected {}",
                label,
                session.horses.len(),
                distinct.len(),
                roster_size
            )));
        }

        check_lifecycle(&label, &session.lifecycle)?;

        if !session.results.is_empty() {
            if !session.is_completed() {
                return Err(SimError::invariant(format!("{} has results but is not completed", label)));
            }
            check_ranking(&label, &session.results)?;
        }

        if session.is_running() && Some(session.id) != active {
            return Err(SimError::invariant(format!("{} is running but not animated", label)));
        }
    }

    if let Some(id) = active {
        match program.session(id) {
            None => return Err(SimError::invariant(format!("active session {} does not exist", id))),
            Some(session) if session.is_completed() => {
                return Err(SimError::invariant(format!("active session {} is completed", id)))
            }
            Some(_) => {}
        }
    }

    for race in program.races() {
        let label = format!("race round {}", race.round);
        check_lifecycle(&label, &race.lifecycle)?;
        if !race.results.is_empty() {
            check_ranking(&label, &race.results)?;
        }
    }

    Ok(())
}

fn check_animation(program: &RaceProgram) -> Result<(), SimError> {
    let track_length = program.config().track_length;

    for (&id, &position) in program.horse_positions() {
        if !(0.0..=track_length).contains(&position) {
            return Err(SimError::invariant(format!(
                "horse {} at {} is off the track (0..={})",
                id, position, track_length
            )));
        }
    }

    for id in program.finished_horses() {
        let position = program.horse_positions().get(id).copied();
        if position != Some(track_length) {
            return Err(SimError::invariant(format!(
                "horse {} finished at {:?}",
                id, position
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallop_core::ProgramConfig;
    use gallop_env::FrameDriven;

    fn result(position: u32, finish_time: f64) -> RaceResult {
        RaceResult {
            horse_id: position,
            horse_name: format!("Horse {}", position),
            finish_time,
            position,
        }
    }

    #[test]
    fn test_fresh_program_passes() {
        let mut program = RaceProgram::with_seed(ProgramConfig::default(), 42).unwrap();
        assert!(check_program(&program).is_ok());

        program.generate_program().unwrap();
        program.reset_races().unwrap();
        program.start_all_races();
        assert!(check_program(&program).is_ok());
    }

    #[test]
    fn test_ranking_checks() {
        assert!(check_ranking("ok", &[result(1, 10.0), result(2, 10.0), result(3, 11.5)]).is_ok());

        let gap = check_ranking("gap", &[result(1, 10.0), result(3, 11.0)]);
        assert!(matches!(gap, Err(SimError::Invariant(_))));

        let unsorted = check_ranking("unsorted", &[result(1, 12.0), result(2, 11.0)]);
        assert!(matches!(unsorted, Err(SimError::Invariant(_))));
    }

    #[test]
    fn test_instantly_completed_session_passes() {
        let mut program = RaceProgram::with_seed(ProgramConfig::default(), 7).unwrap();
        let ids = program.generate_program().unwrap();
        program.set_current_session(ids[0]);
        program.complete_session(vec![result(1, 10.0)]);

        assert!(check_program(&program).is_ok());
    }

    #[test]
    fn test_completing_animated_session_keeps_invariants() {
        let mut program = RaceProgram::with_seed(ProgramConfig::default(), 9).unwrap();
        let ids = program.generate_program().unwrap();
        program.start_all_races();
        program.on_frame(std::time::Duration::from_millis(16));

        // The browsed session is the animated one
        program.complete_session(Vec::new());

        assert!(check_program(&program).is_ok());
        assert_eq!(program.active_race_session_id(), Some(ids[1]));
    }
}
