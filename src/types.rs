use serde::{Deserialize, Serialize};

pub const MIN_SIM_SPEED: f64 = 0.5;
pub const MAX_SIM_SPEED: f64 = 3.0;
pub const DEFAULT_SIM_SPEED: f64 = 1.0;

pub const SIM_SPEED_STEP: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStep {
    Idle,
    Crushing,
    Feeding,
    Reaction,
    Linkage,
    Flashing,
    Filtration,
}

impl ProcessStep {
    pub const ALL: [ProcessStep; 7] = [
        ProcessStep::Idle,
        ProcessStep::Crushing,
        ProcessStep::Feeding,
        ProcessStep::Reaction,
        ProcessStep::Linkage,
        ProcessStep::Flashing,
        ProcessStep::Filtration,
    ];

    pub const FIRST: ProcessStep = ProcessStep::Idle;
    pub const LAST: ProcessStep = ProcessStep::Filtration;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Out-of-range indices fall back to `Idle`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(ProcessStep::Idle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetPoints {
    pub temperature_c: f64,
    pub pressure_mpa: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    pub step: ProcessStep,
    pub temperature: f64,
    pub pressure: f64,
    pub time_elapsed: u64,
    pub is_playing: bool,
    pub is_timer_paused: bool,
    pub sim_speed: f64,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            step: ProcessStep::Idle,
            temperature: 20.0,
            pressure: 0.1,
            time_elapsed: 0,
            is_playing: false,
            is_timer_paused: false,
            sim_speed: DEFAULT_SIM_SPEED,
        }
    }
}

impl SimState {
    pub fn set_points(&self) -> SetPoints {
        SetPoints {
            temperature_c: self.temperature,
            pressure_mpa: self.pressure,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub revision: u64,
    #[serde(flatten)]
    pub state: SimState,
    pub is_recording: bool,
}

/// Clamps a requested speed into the supported range. Non-finite input maps to the default.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(MIN_SIM_SPEED, MAX_SIM_SPEED)
    } else {
        DEFAULT_SIM_SPEED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_matches_idle_set_points() {
        let state = SimState::default();
        assert_eq!(state.step, ProcessStep::Idle);
        assert_eq!(state.temperature, 20.0);
        assert_eq!(state.pressure, 0.1);
        assert_eq!(state.time_elapsed, 0);
        assert!(!state.is_playing);
        assert!(!state.is_timer_paused);
        assert_eq!(state.sim_speed, 1.0);
    }

    #[test]
    fn from_index_defaults_to_idle() {
        assert_eq!(ProcessStep::from_index(3), ProcessStep::Reaction);
        assert_eq!(ProcessStep::from_index(7), ProcessStep::Idle);
        assert_eq!(ProcessStep::from_index(usize::MAX), ProcessStep::Idle);
    }

    #[test]
    fn clamp_speed_handles_bounds_and_nan() {
        assert_eq!(clamp_speed(0.1), MIN_SIM_SPEED);
        assert_eq!(clamp_speed(9.0), MAX_SIM_SPEED);
        assert_eq!(clamp_speed(2.0), 2.0);
        assert_eq!(clamp_speed(f64::NAN), DEFAULT_SIM_SPEED);
        assert_eq!(clamp_speed(f64::NEG_INFINITY), DEFAULT_SIM_SPEED);
    }

    #[test]
    fn snapshot_serializes_flat() {
        let snapshot = Snapshot {
            revision: 4,
            state: SimState::default(),
            is_recording: true,
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["step"], "IDLE");
        assert_eq!(json["revision"], 4);
        assert_eq!(json["is_recording"], true);
        assert_eq!(json["sim_speed"], 1.0);
    }
}
