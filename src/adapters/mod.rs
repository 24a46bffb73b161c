//! Outer-ring adapters: serial console and monotonic clock.

pub mod console;
pub mod time;
