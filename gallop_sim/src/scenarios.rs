//! Named simulation scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: Generate, start all, play to the end
    FullProgram,

    /// SIM-002: Pause mid-race, hold, resume with toggle
    PauseResume,

    /// SIM-003: Condition score biases finish times
    ConditionBias,

    /// SIM-004: Round-indexed instant resolution and guards
    InstantProgram,

    /// SIM-005: Repeated generation and registry growth
    RepeatGeneration,

    /// SIM-006: Stop the frame loop, then re-arm it
    StopRearm,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FullProgram,
            ScenarioId::PauseResume,
            ScenarioId::ConditionBias,
            ScenarioId::InstantProgram,
            ScenarioId::RepeatGeneration,
            ScenarioId::StopRearm,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FullProgram => "full_program",
            ScenarioId::PauseResume => "pause_resume",
            ScenarioId::ConditionBias => "condition_bias",
            ScenarioId::InstantProgram => "instant_program",
            ScenarioId::RepeatGeneration => "repeat_generation",
            ScenarioId::StopRearm => "stop_rearm",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FullProgram => "6 sessions chained back to back, all ranked, animation idle at the end",
            ScenarioId::PauseResume => "Paused frames hold every position; pause time is not race time",
            ScenarioId::ConditionBias => "Score-100 horse beats score-1 horse on mean finish time",
            ScenarioId::InstantProgram => "run_all_races ranks every round; guards reject bad transitions",
            ScenarioId::RepeatGeneration => "Session ids keep increasing, horse ids never collide",
            ScenarioId::StopRearm => "stop_animation freezes playback, start_all_races picks it back up",
        }
    }

    /// Returns true if the scenario animates sessions frame by frame.
    pub fn is_animated(&self) -> bool {
        matches!(
            self,
            ScenarioId::FullProgram | ScenarioId::PauseResume | ScenarioId::StopRearm
        )
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_program" | "fullprogram" | "sim-001" => Ok(ScenarioId::FullProgram),
            "pause_resume" | "pauseresume" | "sim-002" => Ok(ScenarioId::PauseResume),
            "condition_bias" | "conditionbias" | "sim-003" => Ok(ScenarioId::ConditionBias),
            "instant_program" | "instantprogram" | "sim-004" => Ok(ScenarioId::InstantProgram),
            "repeat_generation" | "repeatgeneration" | "sim-005" => Ok(ScenarioId::RepeatGeneration),
            "stop_rearm" | "stoprearm" | "sim-006" => Ok(ScenarioId::StopRearm),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
