use std::time::Duration;

use crate::types::{ProcessStep, SetPoints};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepDefinition {
    pub step: ProcessStep,
    pub title: &'static str,
    pub description: &'static str,
    pub details: &'static str,
    pub nominal_duration: Duration,
}

const STEP_DURATION: Duration = Duration::from_millis(5_000);

pub const STEPS: [StepDefinition; 7] = [
    StepDefinition {
        step: ProcessStep::Idle,
        title: "System Ready",
        description: "System Check Complete | Waiting for Start",
        details: "Subcritical Hydrolysis | Deep Cell Disruption (Yield +30%) | Resource Recovery",
        nominal_duration: STEP_DURATION,
    },
    StepDefinition {
        step: ProcessStep::Crushing,
        title: "Crushing & Pulping",
        description: "Mechanical Crushing | Initial Oil Separation",
        details: "High-torque crushing homogenizes the feed; free oil separates on its own.",
        nominal_duration: STEP_DURATION,
    },
    StepDefinition {
        step: ProcessStep::Feeding,
        title: "Heat Recovery",
        description: "Direct Steam Heating | Preheating to 90°C",
        details: "Flash steam is recovered for direct heating, saving 40% energy.",
        nominal_duration: STEP_DURATION,
    },
    StepDefinition {
        step: ProcessStep::Reaction,
        title: "Injection Heating",
        description: "High Pressure Feed | Latent Heat Release",
        details: "1.8 MPa saturated steam is injected; its latent heat warms the slurry at once.",
        nominal_duration: STEP_DURATION,
    },
    StepDefinition {
        step: ProcessStep::Linkage,
        title: "Subcritical Hydrolysis",
        description: "Deep Hydrolysis | Bound Oil Release",
        details: "At 180°C the subcritical water breaks cell walls and frees the bound oil.",
        nominal_duration: STEP_DURATION,
    },
    StepDefinition {
        step: ProcessStep::Flashing,
        title: "Flash Evaporation",
        description: "Flash Explosion | Energy Loop",
        details: "The pressure drop boils the charge; the steam goes back to preheating.",
        nominal_duration: STEP_DURATION,
    },
    StepDefinition {
        step: ProcessStep::Filtration,
        title: "3-Phase Separation",
        description: "Centrifugal Separation | Oil/Water/Solid",
        details: "3000G separates industrial oil, liquid fertilizer and organic fertilizer.",
        nominal_duration: STEP_DURATION,
    },
];

pub fn definition(step: ProcessStep) -> &'static StepDefinition {
    &STEPS[step.index()]
}

pub fn successor(step: ProcessStep) -> ProcessStep {
    match step {
        ProcessStep::Idle => ProcessStep::Crushing,
        ProcessStep::Crushing => ProcessStep::Feeding,
        ProcessStep::Feeding => ProcessStep::Reaction,
        ProcessStep::Reaction => ProcessStep::Linkage,
        ProcessStep::Linkage => ProcessStep::Flashing,
        ProcessStep::Flashing => ProcessStep::Filtration,
        ProcessStep::Filtration => ProcessStep::Idle,
    }
}

pub fn predecessor(step: ProcessStep) -> ProcessStep {
    match step {
        ProcessStep::Idle => ProcessStep::Filtration,
        ProcessStep::Crushing => ProcessStep::Idle,
        ProcessStep::Feeding => ProcessStep::Crushing,
        ProcessStep::Reaction => ProcessStep::Feeding,
        ProcessStep::Linkage => ProcessStep::Reaction,
        ProcessStep::Flashing => ProcessStep::Linkage,
        ProcessStep::Filtration => ProcessStep::Flashing,
    }
}

/// The only place temperature and pressure are produced.
pub fn transition_for(step: ProcessStep) -> SetPoints {
    let (temperature_c, pressure_mpa) = match step {
        ProcessStep::Idle => (20.0, 0.1),
        ProcessStep::Crushing => (20.0, 0.2),
        ProcessStep::Feeding => (90.0, 0.5),
        // transfer phase, temperature still rising
        ProcessStep::Reaction => (140.0, 1.2),
        // holding phase
        ProcessStep::Linkage => (180.0, 1.8),
        ProcessStep::Flashing => (100.0, 0.2),
        ProcessStep::Filtration => (40.0, 0.1),
    };
    SetPoints {
        temperature_c,
        pressure_mpa,
    }
}
