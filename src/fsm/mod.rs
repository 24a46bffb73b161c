//! Timer-driven signal state machine.
//!
//! Each deadline firing calls [`advance`] exactly once. It reads the
//! current mode, moves the state forward, and returns the [`Step`] to
//! apply: the lamp pattern to show and how long to hold it before the
//! next firing.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Normal mode                                                     │
//! │  ┌─────────┬────────────────────┬─────────┬──────────────────┐   │
//! │  │ phase   │ show               │ next    │ hold             │   │
//! │  ├─────────┼────────────────────┼─────────┼──────────────────┤   │
//! │  │ Green   │ yellow             │ Yellow  │ 1 × base / rate  │   │
//! │  │ Yellow  │ red                │ Red     │ 2 × base / rate  │   │
//! │  │ Yellow* │ red + yellow       │ Red     │ 5 × base / rate  │   │
//! │  │ Red     │ green              │ Green   │ 3 × base / rate  │   │
//! │  └─────────┴────────────────────┴─────────┴──────────────────┘   │
//! │  * pedestrian call latched; the call is consumed here            │
//! │                                                                  │
//! │  Flashing modes: toggle red (or yellow), others off,             │
//! │  hold 1 × base / rate, forever.                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod states;

use context::ControllerState;
use states::{Aspect, Lamp, Mode, Phase};

// ---------------------------------------------------------------------------
// Hold multipliers (units of base / rate)
// ---------------------------------------------------------------------------

pub const YELLOW_HOLD: u32 = 1;
pub const RED_HOLD: u32 = 2;
pub const CROSSING_HOLD: u32 = 5;
pub const GREEN_HOLD: u32 = 3;
pub const BLINK_HOLD: u32 = 1;

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// What a single firing did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Normal-mode phase change. `crossing` is true when a pedestrian call
    /// was consumed and the red + yellow hold was inserted.
    Phase { from: Phase, to: Phase, crossing: bool },
    /// Flashing-mode toggle of `lamp` to `on`.
    Blink { lamp: Lamp, on: bool },
}

/// The outputs and deadline produced by one firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub aspect: Aspect,
    pub hold_ms: u32,
    pub transition: Transition,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Advance the state by one firing and return what to show.
///
/// Must run inside the controller's critical section: the pedestrian
/// latch is read and cleared here in the same step that writes the phase.
pub fn advance(state: &mut ControllerState) -> Step {
    match state.mode {
        Mode::Normal => advance_phase(state),
        Mode::FlashingRed => {
            let on = state.blink_red;
            state.blink_red = !on;
            blink(state, Lamp::Red, on)
        }
        Mode::FlashingYellow => {
            let on = state.blink_yellow;
            state.blink_yellow = !on;
            blink(state, Lamp::Yellow, on)
        }
    }
}

/// How long the start-up Green is held before the first firing.
pub fn initial_hold_ms(state: &ControllerState) -> u32 {
    state.scaled_ms(GREEN_HOLD)
}

/// The step shown while the deadline timer cannot be armed.
///
/// Normal mode parks on red and resumes the cycle from Red; a latched call
/// stays latched. Flashing modes go dark and light their lamp on the next
/// firing.
pub fn fallback(state: &mut ControllerState) -> Step {
    match state.mode {
        Mode::Normal => {
            let from = state.phase;
            state.phase = Phase::Red;
            Step {
                aspect: Aspect::RED,
                hold_ms: state.scaled_ms(RED_HOLD),
                transition: Transition::Phase {
                    from,
                    to: Phase::Red,
                    crossing: false,
                },
            }
        }
        Mode::FlashingRed => {
            state.blink_red = true;
            blink(state, Lamp::Red, false)
        }
        Mode::FlashingYellow => {
            state.blink_yellow = true;
            blink(state, Lamp::Yellow, false)
        }
    }
}

fn advance_phase(state: &mut ControllerState) -> Step {
    let from = state.phase;
    let to = from.next();
    let (aspect, multiplier, crossing) = match from {
        Phase::Green => (Aspect::YELLOW, YELLOW_HOLD, false),
        Phase::Yellow => {
            if core::mem::take(&mut state.pedestrian_call) {
                (Aspect::RED_YELLOW, CROSSING_HOLD, true)
            } else {
                (Aspect::RED, RED_HOLD, false)
            }
        }
        Phase::Red => (Aspect::GREEN, GREEN_HOLD, false),
    };
    state.phase = to;

    Step {
        aspect,
        hold_ms: state.scaled_ms(multiplier),
        transition: Transition::Phase { from, to, crossing },
    }
}

fn blink(state: &ControllerState, lamp: Lamp, on: bool) -> Step {
    Step {
        aspect: Aspect::single(lamp, on),
        hold_ms: state.scaled_ms(BLINK_HOLD),
        transition: Transition::Blink { lamp, on },
    }
}
