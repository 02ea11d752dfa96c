use crate::types::{ProcessStep, Snapshot};

pub const MASTER_GAIN: f32 = 0.3;
pub const MAX_FLOW_GAIN: f32 = 0.5;
pub const MAX_PRESSURE_CUE_GAIN: f32 = 0.12;
const PRESSURE_CUE_THRESHOLD_MPA: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoiseShape {
    LowPass,
    BandPass,
    HighPass,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoundCue {
    pub step: ProcessStep,
    pub active: bool,
    pub hum_hz: f32,
    pub hum_gain: f32,
    /// Bright (sawtooth-like) hum instead of a pure sine.
    pub hum_buzz: bool,
    pub noise_shape: NoiseShape,
    pub noise_cutoff_hz: f32,
    pub noise_gain: f32,
    /// Amplitude modulation applied to the noise bed (crunching, pump strokes).
    pub lfo_hz: f32,
    pub lfo_depth: f32,
    pub flow_gain: f32,
    pub pressure_cue_hz: f32,
    pub pressure_cue_gain: f32,
}

impl Default for SoundCue {
    fn default() -> Self {
        Self {
            step: ProcessStep::Idle,
            active: false,
            hum_hz: 50.0,
            hum_gain: 0.0,
            hum_buzz: false,
            noise_shape: NoiseShape::LowPass,
            noise_cutoff_hz: 200.0,
            noise_gain: 0.0,
            lfo_hz: 0.0,
            lfo_depth: 0.0,
            flow_gain: 0.0,
            pressure_cue_hz: 300.0,
            pressure_cue_gain: 0.0,
        }
    }
}

impl SoundCue {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let state = &snapshot.state;
        let speed = state.sim_speed as f32;
        let pressure = state.pressure as f32;

        let mut cue = match state.step {
            ProcessStep::Idle => SoundCue {
                hum_hz: 50.0,
                hum_gain: 0.05,
                noise_shape: NoiseShape::LowPass,
                noise_cutoff_hz: 200.0,
                noise_gain: 0.02,
                ..SoundCue::default()
            },
            ProcessStep::Crushing => SoundCue {
                hum_hz: 45.0,
                hum_gain: 0.12,
                hum_buzz: true,
                noise_shape: NoiseShape::LowPass,
                noise_cutoff_hz: 600.0,
                noise_gain: 0.2,
                lfo_hz: 4.0 * speed,
                lfo_depth: 0.6,
                ..SoundCue::default()
            },
            ProcessStep::Feeding => SoundCue {
                hum_hz: 60.0,
                hum_gain: 0.1,
                noise_shape: NoiseShape::BandPass,
                noise_cutoff_hz: 500.0,
                noise_gain: 0.15,
                lfo_hz: 1.5 * speed,
                lfo_depth: 0.4,
                ..SoundCue::default()
            },
            ProcessStep::Reaction => SoundCue {
                hum_hz: 40.0 + pressure * 20.0,
                hum_gain: 0.06,
                hum_buzz: true,
                noise_shape: NoiseShape::HighPass,
                noise_cutoff_hz: 4_000.0 + pressure * 1_000.0,
                noise_gain: 0.03,
                ..SoundCue::default()
            },
            ProcessStep::Linkage => SoundCue {
                hum_hz: 55.0,
                hum_gain: 0.12,
                noise_shape: NoiseShape::BandPass,
                noise_cutoff_hz: 400.0,
                noise_gain: 0.1,
                ..SoundCue::default()
            },
            ProcessStep::Flashing => SoundCue {
                hum_hz: 60.0,
                hum_gain: 0.15,
                hum_buzz: true,
                noise_shape: NoiseShape::LowPass,
                noise_cutoff_hz: 600.0,
                noise_gain: 0.5,
                ..SoundCue::default()
            },
            ProcessStep::Filtration => SoundCue {
                hum_hz: 200.0 + 600.0 * speed,
                hum_gain: 0.08,
                noise_shape: NoiseShape::BandPass,
                noise_cutoff_hz: 1_000.0,
                noise_gain: 0.15,
                ..SoundCue::default()
            },
        };

        cue.step = state.step;
        cue.active = state.is_playing;
        cue.flow_gain = flow_gain(state.step, speed);
        if matches!(state.step, ProcessStep::Reaction | ProcessStep::Linkage) {
            cue.pressure_cue_hz = pressure_cue_hz(pressure);
            cue.pressure_cue_gain = pressure_cue_gain(pressure);
        }
        cue
    }
}

/// Faster runs sound like harder flow; capped so the bed never dominates.
pub fn flow_gain(step: ProcessStep, speed: f32) -> f32 {
    let base = match step {
        ProcessStep::Crushing => 0.15,
        ProcessStep::Feeding => 0.12,
        ProcessStep::Reaction => 0.18,
        ProcessStep::Flashing => 0.2,
        _ => 0.1,
    };
    (base * speed).min(MAX_FLOW_GAIN)
}

pub fn pressure_cue_hz(pressure_mpa: f32) -> f32 {
    300.0 + pressure_mpa * 220.0
}

/// Silent up to 0.3 MPa, then fades in.
pub fn pressure_cue_gain(pressure_mpa: f32) -> f32 {
    if pressure_mpa > PRESSURE_CUE_THRESHOLD_MPA {
        ((pressure_mpa - PRESSURE_CUE_THRESHOLD_MPA) * 0.08).min(MAX_PRESSURE_CUE_GAIN)
    } else {
        0.0
    }
}
