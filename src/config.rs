//! Controller configuration parameters
//!
//! All tunable parameters for the signal controller. Only `rate_divisor`
//! is changed at runtime (through the intake); everything else is fixed
//! at start-up. Nothing is persisted across restarts.

use serde::{Deserialize, Serialize};

/// Capacity of the configuration intake buffer (bytes per session).
pub const INTAKE_CAPACITY: usize = 128;

/// Most bytes a single write call accepts.
pub const MAX_WRITE_CHUNK: usize = 128;

/// Capacity of the rendered status line.
pub const STATUS_CAPACITY: usize = 128;

/// Phase to resume from when the mode button returns the controller to Normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResumePhase {
    /// Keep whatever phase was current before the flashing modes.
    #[default]
    Retain,
    /// Restart the cycle at Green.
    Green,
}

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Timing ---
    /// Base duration unit in milliseconds
    pub cycle_base_ms: u32,
    /// Initial divisor applied to `cycle_base_ms` (must be >= 1)
    pub rate_divisor: u32,
    /// Override for the very first deadline after start-up.
    /// `None` holds the initial Green for the regular Green hold.
    pub initial_delay_ms: Option<u32>,

    // --- Behaviour ---
    /// Phase used when the mode button cycles back into Normal
    pub resume_phase: ResumePhase,

    // --- Fault handling ---
    /// How many times the scheduler tries to re-arm before giving up
    pub arm_attempts: u8,

    // --- Buttons ---
    /// Minimum spacing between accepted button edges (0 = no filtering)
    pub debounce_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Timing
            cycle_base_ms: 1000,
            rate_divisor: 1,
            initial_delay_ms: None,

            // Behaviour
            resume_phase: ResumePhase::Retain,

            // Fault handling
            arm_attempts: 3,

            // Buttons
            debounce_ms: 0,
        }
    }
}

impl ControllerConfig {
    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.cycle_base_ms == 0 {
            return Err("cycle_base_ms must be non-zero");
        }
        if self.rate_divisor == 0 {
            return Err("rate_divisor must be at least 1");
        }
        if self.arm_attempts == 0 {
            return Err("arm_attempts must be at least 1");
        }
        Ok(())
    }
}
