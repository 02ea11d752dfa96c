use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::info;

use crate::clock::{Clock, ManualClock};
use crate::config::Config;
use crate::recording::{CaptureError, TraceCapture};
use crate::simulation::Simulation;
use crate::transport::{NoAudio, RecordingStart};
use crate::types::{ProcessStep, Snapshot};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct StepLogEntry {
    pub at: Duration,
    pub step: ProcessStep,
    pub temperature: f64,
    pub pressure: f64,
    pub time_elapsed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessReport {
    pub entries: Vec<StepLogEntry>,
    pub recorded: bool,
    pub final_snapshot: Snapshot,
}

pub fn run_cycle(config: &Config) -> Result<HeadlessReport, CaptureError> {
    let clock = Rc::new(ManualClock::new());
    let mut sim = Simulation::new(clock.clone());

    let entries = Rc::new(RefCell::new(Vec::<StepLogEntry>::new()));
    let sink = entries.clone();
    let log_clock = clock.clone();
    sim.subscribe(move |snapshot| {
        let mut entries = sink.borrow_mut();
        if entries.last().map(|entry| entry.step) != Some(snapshot.state.step) {
            entries.push(StepLogEntry {
                at: log_clock.now(),
                step: snapshot.state.step,
                temperature: snapshot.state.temperature,
                pressure: snapshot.state.pressure,
                time_elapsed: snapshot.state.time_elapsed,
            });
        }
    });

    let mut capture = TraceCapture::new(config.record_to.clone());
    let recorded = sim.start_recording_run(&mut capture, &NoAudio)? == RecordingStart::Started;
    if !recorded {
        sim.play_pause(&NoAudio);
    }
    // a recording run resets to defaults, speed included
    sim.set_speed(config.initial_speed);

    let mut left_idle = false;
    while sim.state().is_playing {
        clock.advance(POLL_INTERVAL);
        sim.poll();
        match sim.state().step {
            ProcessStep::Idle if left_idle => {
                if sim.state().is_playing {
                    sim.play_pause(&NoAudio);
                }
            }
            ProcessStep::Idle => {}
            _ => left_idle = true,
        }
    }

    info!(
        simulated_ms = clock.now().as_millis() as u64,
        recorded,
        "headless cycle finished"
    );

    let entries = entries.borrow().clone();
    Ok(HeadlessReport {
        entries,
        recorded,
        final_snapshot: sim.snapshot(),
    })
}
