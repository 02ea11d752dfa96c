// Property-based checks for the step algebra and the transport controls

use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;

use hydrolysis_sim::types::{MAX_SIM_SPEED, MIN_SIM_SPEED};
use hydrolysis_sim::{
    predecessor, successor, transition_for, ManualClock, NoAudio, ProcessStep, SimState,
    Simulation,
};

fn step_strategy() -> impl Strategy<Value = ProcessStep> {
    prop::sample::select(ProcessStep::ALL.to_vec())
}

#[derive(Clone, Debug)]
enum Op {
    PlayPause,
    ToggleTimer,
    Next,
    Previous,
    Reset,
    SetSpeed(f64),
    Wait(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::PlayPause),
        Just(Op::ToggleTimer),
        Just(Op::Next),
        Just(Op::Previous),
        Just(Op::Reset),
        (-10.0f64..10.0).prop_map(Op::SetSpeed),
        (0u64..12_000).prop_map(Op::Wait),
    ]
}

fn sim_at(step: ProcessStep) -> Simulation<Rc<ManualClock>> {
    let mut sim = Simulation::new(Rc::new(ManualClock::new()));
    while sim.state().step != step {
        sim.next();
    }
    sim
}

proptest! {
    /// The transition function is deterministic
    #[test]
    fn transition_is_deterministic(step in step_strategy()) {
        prop_assert_eq!(transition_for(step), transition_for(step));
    }

    #[test]
    fn successor_and_predecessor_are_inverse(step in step_strategy()) {
        prop_assert_eq!(predecessor(successor(step)), step);
        prop_assert_eq!(successor(predecessor(step)), step);
    }

    #[test]
    fn next_then_previous_round_trips(step in step_strategy()) {
        let mut sim = sim_at(step);
        let before = *sim.state();
        sim.next();
        sim.previous();
        prop_assert_eq!(sim.state().step, before.step);
        prop_assert_eq!(sim.state().set_points(), before.set_points());
        prop_assert!(!sim.state().is_playing);
    }

    #[test]
    fn speed_is_always_clamped(speed in prop::num::f64::ANY) {
        let mut sim = Simulation::new(ManualClock::new());
        sim.set_speed(speed);
        let stored = sim.state().sim_speed;
        prop_assert!((MIN_SIM_SPEED..=MAX_SIM_SPEED).contains(&stored));
        if speed.is_finite() {
            prop_assert_eq!(stored, speed.clamp(MIN_SIM_SPEED, MAX_SIM_SPEED));
        }
    }

    /// Invariants hold after any sequence of transport operations
    #[test]
    fn invariants_hold_under_random_operations(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let clock = Rc::new(ManualClock::new());
        let mut sim = Simulation::new(clock.clone());

        for op in ops {
            match op {
                Op::PlayPause => sim.play_pause(&NoAudio),
                Op::ToggleTimer => sim.toggle_timer(),
                Op::Next => { sim.next(); }
                Op::Previous => { sim.previous(); }
                Op::Reset => sim.reset(),
                Op::SetSpeed(speed) => sim.set_speed(speed),
                Op::Wait(ms) => {
                    clock.advance(Duration::from_millis(ms));
                    sim.poll();
                }
            }

            let state = sim.state();
            prop_assert_eq!(state.set_points(), transition_for(state.step));
            prop_assert!(state.sim_speed > 0.0);
            if !state.is_playing {
                prop_assert!(sim.tick_deadline().is_none());
                prop_assert!(sim.step_deadline().is_none());
            } else {
                prop_assert!(sim.step_deadline().is_some());
                prop_assert_eq!(sim.tick_deadline().is_some(), !state.is_timer_paused);
            }
        }
    }
}

#[test]
fn reset_is_idempotent() {
    let clock = Rc::new(ManualClock::new());
    let mut sim = Simulation::new(clock.clone());
    sim.set_speed(2.0);
    sim.play_pause(&NoAudio);
    clock.advance(Duration::from_secs(7));
    sim.poll();

    sim.reset();
    let once = *sim.state();
    sim.reset();
    assert_eq!(*sim.state(), once);
    assert_eq!(once, SimState::default());
}
