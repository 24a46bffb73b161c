//! Monotonic clock for button debounce.
//!
//! - **`espidf`**: wraps `esp_timer_get_time()` from the ESP-IDF
//!   high-resolution timer (microsecond precision, monotonic, ISR-safe).
//! - **host**: uses `std::time::Instant` for tests and simulation.

/// Milliseconds since boot, wrapping at `u32::MAX` (about 49 days).
#[cfg(feature = "espidf")]
pub fn uptime_ms() -> u32 {
    // SAFETY: esp_timer_get_time has no preconditions and may be called
    // from interrupt context.
    ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1000) as u32
}

/// Milliseconds since the first call, wrapping at `u32::MAX`.
#[cfg(not(feature = "espidf"))]
pub fn uptime_ms() -> u32 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u32
}
