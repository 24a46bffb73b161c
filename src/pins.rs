//! GPIO pin assignments for the signal controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Signal head (three lamp drivers, active HIGH)
// ---------------------------------------------------------------------------

/// Red lamp driver. Configured input/output so the latch can be read back.
pub const RED_LAMP_GPIO: i32 = 4;
/// Yellow lamp driver.
pub const YELLOW_LAMP_GPIO: i32 = 5;
/// Green lamp driver.
pub const GREEN_LAMP_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Push-buttons (active-low with pull-up, falling edge)
// ---------------------------------------------------------------------------

/// Operator button that steps Normal → flashing red → flashing yellow.
pub const MODE_BUTTON_GPIO: i32 = 16;
/// Pedestrian call button.
pub const PEDESTRIAN_BUTTON_GPIO: i32 = 17;
