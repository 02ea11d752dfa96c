use std::time::Duration;

use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::recording::RecordingSession;
use crate::steps::{definition, successor, transition_for};
use crate::types::{ProcessStep, SimState, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Idle,
    Playing,
    PlayingWhileRecording,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimerKind {
    Tick,
    StepAdvance,
}

/// One-shot timer handle. `epoch` identifies the arm call that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Timer {
    pub(crate) deadline: Duration,
    pub(crate) epoch: u64,
}

type Observer = Box<dyn FnMut(&Snapshot)>;

pub struct Simulation<C: Clock> {
    pub(crate) clock: C,
    pub(crate) state: SimState,
    pub(crate) mode: RunMode,
    pub(crate) revision: u64,
    pub(crate) tick_timer: Option<Timer>,
    pub(crate) step_timer: Option<Timer>,
    pub(crate) tick_epoch: u64,
    pub(crate) step_epoch: u64,
    /// Nominal (speed 1.0) time already spent in the current step.
    pub(crate) step_progress: Duration,
    /// Wall time up to which `step_progress` is accounted.
    pub(crate) step_mark: Duration,
    pub(crate) recording: Option<RecordingSession>,
    observers: Vec<Observer>,
}

impl<C: Clock> Simulation<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: SimState::default(),
            mode: RunMode::Idle,
            revision: 0,
            tick_timer: None,
            step_timer: None,
            tick_epoch: 0,
            step_epoch: 0,
            step_progress: Duration::ZERO,
            step_mark: Duration::ZERO,
            recording: None,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.recording
            .as_ref()
            .is_some_and(RecordingSession::is_active)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            state: self.state,
            is_recording: self.is_recording(),
        }
    }

    pub fn subscribe(&mut self, mut observer: impl FnMut(&Snapshot) + 'static) {
        observer(&self.snapshot());
        self.observers.push(Box::new(observer));
    }

    pub fn tick_deadline(&self) -> Option<Duration> {
        self.tick_timer.map(|timer| timer.deadline)
    }

    pub fn step_deadline(&self) -> Option<Duration> {
        self.step_timer.map(|timer| timer.deadline)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1).div_f64(self.state.sim_speed)
    }

    pub fn step_fraction(&self) -> f64 {
        let nominal = definition(self.state.step).nominal_duration;
        let mut progress = self.step_progress;
        if self.step_timer.is_some() {
            let since_mark = self.clock.now().saturating_sub(self.step_mark);
            progress = progress.saturating_add(since_mark.mul_f64(self.state.sim_speed));
        }
        (progress.as_secs_f64() / nominal.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn poll(&mut self) {
        let now = self.clock.now();

        if self.recording.as_ref().is_some_and(RecordingSession::has_ended) {
            info!("recording ended externally");
            self.end_recording();
            self.commit();
        }

        while let Some((kind, timer)) = self.take_due(now) {
            self.fire(kind, timer);
        }
    }

    fn take_due(&mut self, now: Duration) -> Option<(TimerKind, Timer)> {
        let step_due = self.step_timer.filter(|timer| timer.deadline <= now);
        let tick_due = self.tick_timer.filter(|timer| timer.deadline <= now);
        match (step_due, tick_due) {
            (Some(step), Some(tick)) if tick.deadline < step.deadline => {
                self.tick_timer = None;
                Some((TimerKind::Tick, tick))
            }
            (Some(step), _) => {
                self.step_timer = None;
                Some((TimerKind::StepAdvance, step))
            }
            (None, Some(tick)) => {
                self.tick_timer = None;
                Some((TimerKind::Tick, tick))
            }
            (None, None) => None,
        }
    }

    pub(crate) fn fire(&mut self, kind: TimerKind, timer: Timer) {
        let current_epoch = match kind {
            TimerKind::Tick => self.tick_epoch,
            TimerKind::StepAdvance => self.step_epoch,
        };
        if !self.state.is_playing || timer.epoch != current_epoch {
            trace!(?kind, epoch = timer.epoch, current_epoch, "stale timer ignored");
            return;
        }

        match kind {
            TimerKind::Tick => self.on_tick(timer.deadline),
            TimerKind::StepAdvance => self.on_step_advance(timer.deadline),
        }
    }

    fn on_tick(&mut self, at: Duration) {
        if self.state.is_timer_paused {
            trace!("tick while timer paused ignored");
            return;
        }
        self.state.time_elapsed += 1;
        self.arm_tick_timer(at);
        self.commit();
    }

    fn on_step_advance(&mut self, at: Duration) {
        let from = self.state.step;
        let next = successor(from);
        self.enter_step(next);
        self.step_mark = at;

        let completed_cycle = next == ProcessStep::FIRST;
        debug!(?from, to = ?next, at_ms = at.as_millis() as u64, "step advanced");

        if completed_cycle && self.mode == RunMode::PlayingWhileRecording {
            info!("recorded cycle complete, stopping playback");
            self.stop_playback(at);
            // closing frame goes to the trace under the revision the projections get next
            let closing = Snapshot {
                revision: self.revision + 1,
                ..self.snapshot()
            };
            if let Some(session) = self.recording.as_mut() {
                session.record(&closing);
            }
            self.end_recording();
            self.commit();
            return;
        }

        self.arm_step_timer(at);
        self.commit();
    }

    pub(crate) fn enter_step(&mut self, step: ProcessStep) {
        let points = transition_for(step);
        self.state.step = step;
        self.state.temperature = points.temperature_c;
        self.state.pressure = points.pressure_mpa;
        self.step_progress = Duration::ZERO;
    }

    pub(crate) fn start_playback(&mut self, mode: RunMode, now: Duration) {
        debug_assert!(mode != RunMode::Idle);
        self.mode = mode;
        self.state.is_playing = true;
        self.arm_step_timer(now);
        self.arm_tick_timer(now);
    }

    pub(crate) fn stop_playback(&mut self, now: Duration) {
        self.fold_step_progress(now);
        self.mode = RunMode::Idle;
        self.state.is_playing = false;
        self.cancel_timers();
    }

    pub(crate) fn cancel_timers(&mut self) {
        self.tick_timer = None;
        self.step_timer = None;
        self.tick_epoch += 1;
        self.step_epoch += 1;
    }

    // wall time since the mark, scaled to nominal time at the current speed
    pub(crate) fn fold_step_progress(&mut self, now: Duration) {
        if self.step_timer.is_some() {
            let since_mark = now.saturating_sub(self.step_mark);
            let nominal = definition(self.state.step).nominal_duration;
            self.step_progress = self
                .step_progress
                .saturating_add(since_mark.mul_f64(self.state.sim_speed))
                .min(nominal);
        }
        self.step_mark = now;
    }

    pub(crate) fn arm_step_timer(&mut self, now: Duration) {
        self.step_epoch += 1;
        if !self.state.is_playing {
            self.step_timer = None;
            return;
        }
        let nominal = definition(self.state.step).nominal_duration;
        let remaining = nominal.saturating_sub(self.step_progress);
        self.step_mark = now;
        self.step_timer = Some(Timer {
            deadline: now + remaining.div_f64(self.state.sim_speed),
            epoch: self.step_epoch,
        });
    }

    pub(crate) fn arm_tick_timer(&mut self, now: Duration) {
        self.tick_epoch += 1;
        self.tick_timer = if self.state.is_playing && !self.state.is_timer_paused {
            Some(Timer {
                deadline: now + self.tick_interval(),
                epoch: self.tick_epoch,
            })
        } else {
            None
        };
    }

    // a recording run keeps playing as a normal run
    pub(crate) fn end_recording(&mut self) -> bool {
        let Some(mut session) = self.recording.take() else {
            return false;
        };
        session.release();
        if self.mode == RunMode::PlayingWhileRecording {
            self.mode = RunMode::Playing;
        }
        true
    }

    pub(crate) fn commit(&mut self) {
        self.revision += 1;
        let mut snapshot = self.snapshot();

        let recording_failed = self
            .recording
            .as_mut()
            .is_some_and(|session| !session.record(&snapshot));
        if recording_failed {
            self.end_recording();
            snapshot = self.snapshot();
        }

        for observer in &mut self.observers {
            observer(&snapshot);
        }
    }
}
