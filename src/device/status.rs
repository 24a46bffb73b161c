//! Status line rendering.
//!
//! ```text
//! operational mode: <mode> - cycle rate: <base/1000> - LED status: red <on|off>, \
//!     yellow <on|off>, green <on|off>, Pedestrian: <present|not present>\n
//! ```
//!
//! Lamp fields come from the hardware read-back, everything else from the
//! state snapshot. Output is capped at [`STATUS_CAPACITY`] bytes; anything
//! beyond it is dropped rather than overflowing.

use core::fmt::{self, Write};

use crate::config::STATUS_CAPACITY;
use crate::fsm::context::ControllerState;
use crate::fsm::states::Aspect;

pub type StatusLine = heapless::String<STATUS_CAPACITY>;

/// Render the status line for `state` with the lamps at `lamps`.
pub fn render(state: &ControllerState, lamps: Aspect) -> StatusLine {
    let mut out = Clipped(StatusLine::new());
    // Clipped never reports an error.
    let _ = writeln!(
        out,
        "operational mode: {} - cycle rate: {} - LED status: red {}, yellow {}, green {}, \
         Pedestrian: {}",
        state.mode.name(),
        state.cycle_base_ms / 1000,
        on_off(lamps.red),
        on_off(lamps.yellow),
        on_off(lamps.green),
        if state.pedestrian_call { "present" } else { "not present" },
    );
    out.0
}

const fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Writer that keeps whatever fits and silently drops the rest.
struct Clipped(StatusLine);

impl Write for Clipped {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}
