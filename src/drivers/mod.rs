//! Lamp outputs, deadline timer and button inputs.

pub mod button;
pub mod hw_timer;
pub mod signal_head;
