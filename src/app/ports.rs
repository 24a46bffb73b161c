//! Port traits: the boundary between the signal logic and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Drivers (lamp pins, deadline timer, button interrupts) implement these
//! traits. The [`Controller`](super::service::Controller) consumes them via
//! generics, so the domain core never touches hardware directly and the
//! whole sequence runs on the host against mocks.

use crate::error::{InputError, OutputError, TimerError};
use crate::fsm::states::{Aspect, Lamp};

// ───────────────────────────────────────────────────────────────
// Lamp port (domain → indicator outputs)
// ───────────────────────────────────────────────────────────────

/// Write-and-read-back access to the three indicator outputs.
///
/// `is_on` must report the latched output level, not a software mirror,
/// so the status line always matches what the lamps are doing.
pub trait LampPort {
    /// Drive one lamp.
    fn set(&mut self, lamp: Lamp, on: bool) -> Result<(), OutputError>;

    /// Read back the latched level of one lamp.
    fn is_on(&mut self, lamp: Lamp) -> Result<bool, OutputError>;

    /// Drive all three lamps. Every lamp is attempted even if an earlier
    /// one fails; the first failure is returned.
    fn show(&mut self, aspect: Aspect) -> Result<(), OutputError> {
        let mut first_err = None;
        for lamp in Lamp::ALL {
            if let Err(e) = self.set(lamp, aspect.lamp(lamp)) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Force every lamp low.
    fn all_off(&mut self) -> Result<(), OutputError> {
        self.show(Aspect::DARK)
    }

    /// Read back all three lamps.
    fn read_aspect(&mut self) -> Result<Aspect, OutputError> {
        let mut aspect = Aspect::DARK;
        for lamp in Lamp::ALL {
            aspect.set_lamp(lamp, self.is_on(lamp)?);
        }
        Ok(aspect)
    }
}

// ───────────────────────────────────────────────────────────────
// Deadline timer port
// ───────────────────────────────────────────────────────────────

/// Single-shot deadline. The expiry callback is wired by the adapter and
/// must call [`Controller::fire`](super::service::Controller::fire), which
/// re-arms through this same port.
pub trait DeadlineTimer {
    /// Schedule one firing `after_ms` from now, replacing any pending one.
    fn arm(&mut self, after_ms: u32) -> Result<(), TimerError>;

    /// Drop the pending firing, if any.
    fn cancel(&mut self) -> Result<(), TimerError>;
}

// ───────────────────────────────────────────────────────────────
// Edge input port (buttons → domain)
// ───────────────────────────────────────────────────────────────

/// The two momentary inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Steps the operating mode.
    Mode,
    /// Requests a pedestrian crossing.
    Pedestrian,
}

/// Falling-edge subscription on a button input.
///
/// Handlers run in interrupt context: they must not block, allocate or log.
pub trait EdgeInput {
    fn subscribe_falling<F>(&mut self, button: Button, handler: F) -> Result<(), InputError>
    where
        F: FnMut() + Send + 'static;

    fn unsubscribe(&mut self, button: Button) -> Result<(), InputError>;
}
