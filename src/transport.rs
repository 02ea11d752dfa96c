use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::recording::{CaptureError, CaptureSource, RecordingSession};
use crate::simulation::{RunMode, Simulation};
use crate::steps::{predecessor, successor};
use crate::types::{clamp_speed, ProcessStep, SimState};

/// Unlocks sound output. Must be safe to call any number of times.
pub trait AudioOutput {
    fn resume(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudio;

impl AudioOutput for NoAudio {
    fn resume(&self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingStart {
    Started,
    /// The user refused the capture; nothing changed.
    Declined,
    AlreadyRecording,
}

impl<C: Clock> Simulation<C> {
    pub fn play_pause(&mut self, audio: &dyn AudioOutput) {
        let was_playing = self.state.is_playing;
        self.poll();
        audio.resume();
        if was_playing && !self.state.is_playing {
            // the click was meant as a pause and the cycle already ended on its own
            debug!(step = ?self.state.step, "playback already stopped, click ignored");
            return;
        }
        let now = self.clock.now();
        match self.mode {
            RunMode::Idle => {
                self.start_playback(RunMode::Playing, now);
                info!(step = ?self.state.step, speed = self.state.sim_speed, "playback started");
            }
            RunMode::Playing => {
                self.stop_playback(now);
                info!(step = ?self.state.step, "playback paused");
            }
            RunMode::PlayingWhileRecording => {
                self.stop_playback(now);
                self.end_recording();
                info!(step = ?self.state.step, "playback paused, recording stopped");
            }
        }
        self.commit();
    }

    pub fn toggle_timer(&mut self) {
        self.poll();
        let now = self.clock.now();
        self.state.is_timer_paused = !self.state.is_timer_paused;
        self.arm_tick_timer(now);
        debug!(paused = self.state.is_timer_paused, "elapsed timer toggled");
        self.commit();
    }

    pub fn previous(&mut self) -> bool {
        self.manual_step(predecessor, "previous")
    }

    /// Ignored while playing; returns whether the step moved. Same for [`Simulation::previous`].
    pub fn next(&mut self) -> bool {
        self.manual_step(successor, "next")
    }

    fn manual_step(&mut self, target: fn(ProcessStep) -> ProcessStep, op: &str) -> bool {
        self.poll();
        if self.state.is_playing {
            debug!(op, "manual step ignored while playing");
            return false;
        }
        let from = self.state.step;
        self.enter_step(target(from));
        self.state.is_playing = false;
        debug!(op, ?from, to = ?self.state.step, "manual step");
        self.commit();
        true
    }

    pub fn reset(&mut self) {
        self.reset_quietly();
        info!("simulation reset");
        self.commit();
    }

    fn reset_quietly(&mut self) {
        self.cancel_timers();
        self.end_recording();
        self.mode = RunMode::Idle;
        self.state = SimState::default();
        self.step_progress = Duration::ZERO;
        self.step_mark = self.clock.now();
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.poll();
        let clamped = clamp_speed(speed);
        if clamped != speed {
            debug!(requested = speed, clamped, "speed clamped");
        }
        let now = self.clock.now();
        if self.state.is_playing {
            self.fold_step_progress(now);
            self.state.sim_speed = clamped;
            self.arm_step_timer(now);
            self.arm_tick_timer(now);
        } else {
            self.state.sim_speed = clamped;
        }
        debug!(speed = clamped, "speed changed");
        self.commit();
    }

    /// A declined capture is `Ok(Declined)`. Technical failures leave the simulation untouched.
    pub fn start_recording_run(
        &mut self,
        capture: &mut dyn CaptureSource,
        audio: &dyn AudioOutput,
    ) -> Result<RecordingStart, CaptureError> {
        self.poll();
        if self.is_recording() {
            return Ok(RecordingStart::AlreadyRecording);
        }

        let handle = match capture.acquire() {
            Ok(handle) => handle,
            Err(err) if err.is_declined() => {
                info!("recording cancelled by user");
                return Ok(RecordingStart::Declined);
            }
            Err(err) => {
                warn!(%err, "unable to start recording");
                return Err(err);
            }
        };

        self.reset_quietly();
        self.recording = Some(RecordingSession::new(handle));
        let now = self.clock.now();
        self.start_playback(RunMode::PlayingWhileRecording, now);
        audio.resume();
        info!("recording run started");
        self.commit();
        Ok(RecordingStart::Started)
    }

    pub fn stop_recording(&mut self) -> bool {
        self.poll();
        if !self.end_recording() {
            return false;
        }
        info!("recording stopped");
        self.commit();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct CountingAudio {
        resumes: Cell<u32>,
    }

    impl AudioOutput for CountingAudio {
        fn resume(&self) {
            self.resumes.set(self.resumes.get() + 1);
        }
    }

    fn sim() -> (Rc<ManualClock>, Simulation<Rc<ManualClock>>) {
        let clock = Rc::new(ManualClock::new());
        (clock.clone(), Simulation::new(clock))
    }

    #[test]
    fn play_pause_resumes_audio_and_toggles() {
        let (_clock, mut sim) = sim();
        let audio = CountingAudio::default();
        sim.play_pause(&audio);
        assert!(sim.state().is_playing);
        assert_eq!(sim.mode(), RunMode::Playing);
        sim.play_pause(&audio);
        assert!(!sim.state().is_playing);
        assert_eq!(sim.mode(), RunMode::Idle);
        assert_eq!(audio.resumes.get(), 2);
    }

    #[test]
    fn manual_steps_ignored_while_playing() {
        let (_clock, mut sim) = sim();
        sim.play_pause(&NoAudio);
        assert!(!sim.next());
        assert!(!sim.previous());
        assert_eq!(sim.state().step, ProcessStep::Idle);
        assert!(sim.state().is_playing);
    }

    #[test]
    fn pause_keeps_progress_within_step() {
        let (clock, mut sim) = sim();
        sim.play_pause(&NoAudio);
        clock.advance(Duration::from_secs(3));
        sim.play_pause(&NoAudio);
        clock.advance(Duration::from_secs(30));
        sim.play_pause(&NoAudio);
        assert_eq!(sim.step_deadline(), Some(Duration::from_secs(35)));
    }

    #[test]
    fn manual_step_restarts_step_progress() {
        let (clock, mut sim) = sim();
        sim.play_pause(&NoAudio);
        clock.advance(Duration::from_secs(3));
        sim.play_pause(&NoAudio);
        sim.next();
        sim.play_pause(&NoAudio);
        assert_eq!(sim.state().step, ProcessStep::Crushing);
        assert_eq!(sim.step_deadline(), Some(Duration::from_secs(8)));
    }

    #[test]
    fn timer_pause_while_stopped_survives_play() {
        let (clock, mut sim) = sim();
        sim.toggle_timer();
        sim.play_pause(&NoAudio);
        assert!(sim.tick_deadline().is_none());
        clock.advance(Duration::from_secs(3));
        sim.poll();
        assert_eq!(sim.state().time_elapsed, 0);
        sim.toggle_timer();
        assert_eq!(sim.tick_deadline(), Some(Duration::from_secs(4)));
    }

    #[test]
    fn set_speed_while_stopped_arms_nothing() {
        let (_clock, mut sim) = sim();
        sim.set_speed(2.5);
        assert_eq!(sim.state().sim_speed, 2.5);
        assert!(sim.tick_deadline().is_none());
        assert!(sim.step_deadline().is_none());
    }

    #[test]
    fn reset_restores_defaults_and_cancels_timers() {
        let (clock, mut sim) = sim();
        sim.set_speed(3.0);
        sim.play_pause(&NoAudio);
        clock.advance(Duration::from_secs(4));
        sim.poll();
        sim.reset();
        assert_eq!(*sim.state(), SimState::default());
        assert!(sim.tick_deadline().is_none());
        assert!(sim.step_deadline().is_none());
        assert_eq!(sim.mode(), RunMode::Idle);
    }
}
