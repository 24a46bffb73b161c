//! The controller state record.
//!
//! `ControllerState` is the single source of truth for mode, phase,
//! pedestrian latch, blink flags and timing. It carries no locking of its
//! own; [`Controller`](crate::app::service::Controller) keeps it behind one
//! critical section, so every method here runs with interrupts masked and
//! is observed either fully applied or not at all.

use core::num::NonZeroU32;

use super::states::{Mode, Phase};
use crate::config::{ControllerConfig, ResumePhase};

// ---------------------------------------------------------------------------
// Handler outcomes
// ---------------------------------------------------------------------------

/// Result of a mode-button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: Mode,
    pub to: Mode,
    /// A latched pedestrian call was thrown away because Normal was left.
    pub discarded_call: bool,
}

/// Result of a pedestrian-button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The latch was set; the next Yellow exit will serve it.
    Latched,
    /// A call was already waiting; nothing changed.
    AlreadyPending,
    /// Not in Normal mode; the press is dropped.
    Ignored(Mode),
}

// ---------------------------------------------------------------------------
// ControllerState
// ---------------------------------------------------------------------------

/// Snapshot-able controller state. `Copy` so readers can take a consistent
/// view out of the critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    // -- Regime --
    pub mode: Mode,
    /// Meaningful only while `mode == Normal`.
    pub phase: Phase,

    // -- Pedestrian --
    /// One-shot crossing request, consumed at the Yellow exit.
    pub pedestrian_call: bool,

    // -- Flashing --
    /// Level the red lamp takes on the next flashing-red firing.
    pub blink_red: bool,
    /// Level the yellow lamp takes on the next flashing-yellow firing.
    pub blink_yellow: bool,

    // -- Timing --
    pub cycle_base_ms: u32,
    rate_divisor: NonZeroU32,
}

impl ControllerState {
    /// Fresh state: Normal, Green, no call, both blink flags on.
    ///
    /// Returns `None` when the configured divisor is zero.
    pub fn new(config: &ControllerConfig) -> Option<Self> {
        Some(Self {
            mode: Mode::Normal,
            phase: Phase::Green,
            pedestrian_call: false,
            blink_red: true,
            blink_yellow: true,
            cycle_base_ms: config.cycle_base_ms,
            rate_divisor: NonZeroU32::new(config.rate_divisor)?,
        })
    }

    pub fn rate_divisor(&self) -> u32 {
        self.rate_divisor.get()
    }

    pub fn set_rate_divisor(&mut self, divisor: NonZeroU32) {
        self.rate_divisor = divisor;
    }

    /// `multiplier × base / divisor`, multiplied before dividing.
    pub fn scaled_ms(&self, multiplier: u32) -> u32 {
        let total = u64::from(multiplier) * u64::from(self.cycle_base_ms);
        let ms = total / u64::from(self.rate_divisor.get());
        u32::try_from(ms).unwrap_or(u32::MAX)
    }

    /// Advance the mode cyclically. Leaving Normal discards any pending
    /// call; entering Normal applies `resume`.
    pub fn cycle_mode(&mut self, resume: ResumePhase) -> ModeChange {
        let from = self.mode;
        let to = from.next();
        self.mode = to;

        let discarded_call = from == Mode::Normal && core::mem::take(&mut self.pedestrian_call);

        if to == Mode::Normal && resume == ResumePhase::Green {
            self.phase = Phase::Green;
        }

        ModeChange {
            from,
            to,
            discarded_call,
        }
    }

    /// Latch a crossing request if the controller is cycling normally.
    pub fn request_crossing(&mut self) -> CallOutcome {
        match self.mode {
            Mode::Normal if self.pedestrian_call => CallOutcome::AlreadyPending,
            Mode::Normal => {
                self.pedestrian_call = true;
                CallOutcome::Latched
            }
            other => CallOutcome::Ignored(other),
        }
    }
}
