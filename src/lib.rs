//! Subcritical water hydrolysis process simulator.

pub mod app;
pub mod audio_engine;
pub mod clock;
pub mod config;
pub mod headless;
pub mod recording;
pub mod simulation;
pub mod sound;
pub mod steps;
pub mod transport;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use recording::{CaptureError, CaptureSource, RecordingHandle, RecordingSession, TraceCapture};
pub use simulation::{RunMode, Simulation};
pub use steps::{definition, predecessor, successor, transition_for, StepDefinition, STEPS};
pub use transport::{AudioOutput, NoAudio, RecordingStart};
pub use types::{ProcessStep, SetPoints, SimState, Snapshot};
