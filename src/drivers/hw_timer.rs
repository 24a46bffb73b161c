//! One-shot deadline timer using ESP-IDF's esp_timer API.
//!
//! The timer callback runs in the esp_timer task (not an ISR). It calls
//! [`Controller::fire`], which advances the signal and re-arms the same
//! timer through the [`DeadlineTimer`] port.
//!
//! ```text
//!   EspTimerSlot::create ──▶ esp_timer_create(deadline_cb, ctx)
//!                                         │
//!   Controller::start ──▶ arm ──▶ esp_timer_start_once
//!                                         │  (expiry)
//!                      deadline_cb ◀──────┘
//!                           │
//!                           └──▶ Controller::fire ──▶ arm ──▶ ...
//! ```
//!
//! If every re-arm attempt inside a firing fails, nothing is pending any
//! more and the callback will not run again. [`supervise`] runs on its own
//! thread and re-arms a stalled controller with exponential backoff.
//!
//! On simulation targets, [`SimTimer`] records the armed deadline and the
//! test decides when it expires.

use crate::app::ports::DeadlineTimer;
use crate::app::service::Controller;
use crate::error::TimerError;

#[cfg(feature = "espidf")]
pub use esp::{EspDeadline, EspTimerSlot};

#[cfg(feature = "espidf")]
mod esp {
    use core::ffi::c_void;
    use core::ptr;
    use std::sync::Arc;

    use esp_idf_svc::sys::*;
    use log::error;

    use super::{Controller, DeadlineTimer, TimerError};
    use crate::app::ports::LampPort;

    /// Borrowed esp_timer handle. Copyable so the callback can re-arm the
    /// timer it is running on.
    #[derive(Clone, Copy)]
    pub struct EspDeadline {
        handle: esp_timer_handle_t,
    }

    // SAFETY: esp_timer_* calls are thread-safe; the handle is only a key.
    unsafe impl Send for EspDeadline {}

    impl DeadlineTimer for EspDeadline {
        fn arm(&mut self, after_ms: u32) -> Result<(), TimerError> {
            // SAFETY: handle comes from a live EspTimerSlot.
            unsafe {
                // Restart semantics: stop whatever is pending first. Not
                // running is the only expected failure and is harmless.
                esp_timer_stop(self.handle);
                let ret = esp_timer_start_once(self.handle, u64::from(after_ms) * 1000);
                if ret != ESP_OK as i32 {
                    return Err(TimerError::ArmFailed(ret));
                }
            }
            Ok(())
        }

        fn cancel(&mut self) -> Result<(), TimerError> {
            // SAFETY: handle comes from a live EspTimerSlot.
            let ret = unsafe { esp_timer_stop(self.handle) };
            if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
                return Err(TimerError::CancelFailed(ret));
            }
            Ok(())
        }
    }

    struct TimerContext<L> {
        controller: Arc<Controller<L>>,
        deadline: EspDeadline,
    }

    /// Owns the esp_timer and the callback context that points at the
    /// controller. Dropping it stops and deletes the timer.
    pub struct EspTimerSlot<L: LampPort + Send + 'static> {
        deadline: EspDeadline,
        ctx: *mut TimerContext<L>,
    }

    impl<L: LampPort + Send + 'static> EspTimerSlot<L> {
        pub fn create(controller: Arc<Controller<L>>) -> Result<Self, TimerError> {
            let ctx = Box::into_raw(Box::new(TimerContext {
                controller,
                deadline: EspDeadline {
                    handle: ptr::null_mut(),
                },
            }));

            let args = esp_timer_create_args_t {
                callback: Some(deadline_cb::<L>),
                arg: ctx.cast::<c_void>(),
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: b"signal\0".as_ptr() as *const _,
                skip_unhandled_events: false,
            };
            let mut handle: esp_timer_handle_t = ptr::null_mut();

            // SAFETY: args and ctx outlive the timer; the context is only
            // freed in Drop after the timer has been deleted.
            unsafe {
                let ret = esp_timer_create(&args, &mut handle);
                if ret != ESP_OK as i32 {
                    drop(Box::from_raw(ctx));
                    return Err(TimerError::ArmFailed(ret));
                }
                (*ctx).deadline = EspDeadline { handle };
            }

            Ok(Self {
                deadline: EspDeadline { handle },
                ctx,
            })
        }

        /// Port handle for `Controller::start` and `Controller::shutdown`.
        pub fn deadline(&self) -> EspDeadline {
            self.deadline
        }
    }

    impl<L: LampPort + Send + 'static> Drop for EspTimerSlot<L> {
        fn drop(&mut self) {
            // SAFETY: stop + delete guarantee the callback no longer runs
            // before the context is released.
            unsafe {
                esp_timer_stop(self.deadline.handle);
                let ret = esp_timer_delete(self.deadline.handle);
                if ret != ESP_OK as i32 {
                    error!("hw_timer: delete failed (rc={}); leaking context", ret);
                    return;
                }
                drop(Box::from_raw(self.ctx));
            }
        }
    }

    unsafe extern "C" fn deadline_cb<L: LampPort + Send + 'static>(arg: *mut c_void) {
        // SAFETY: arg is the TimerContext installed by EspTimerSlot::create.
        let ctx = unsafe { &*arg.cast::<TimerContext<L>>() };
        let mut deadline = ctx.deadline;
        if let Err(e) = ctx.controller.fire(&mut deadline) {
            error!("hw_timer: {}", e);
        }
    }
}

// ── Stall recovery ────────────────────────────────────────────

/// Poll interval while the controller is healthy.
pub const RECOVERY_POLL_MS: u32 = 250;
/// Upper bound on the backoff between failed recovery attempts.
pub const RECOVERY_MAX_MS: u32 = 8_000;

/// Watch `controller` and re-arm it through `timer` whenever it stalls.
///
/// `pause(ms)` sleeps between checks and returns `false` to stop early.
/// The delay doubles after each failed attempt, up to [`RECOVERY_MAX_MS`],
/// and drops back to [`RECOVERY_POLL_MS`] once the timer accepts a
/// deadline. Returns when the controller stops running.
pub fn supervise<L, T, P>(controller: &Controller<L>, timer: &mut T, mut pause: P)
where
    L: crate::app::ports::LampPort,
    T: DeadlineTimer,
    P: FnMut(u32) -> bool,
{
    let mut delay = RECOVERY_POLL_MS;
    while pause(delay) && controller.is_running() {
        match controller.recover(timer) {
            Ok(_) => delay = RECOVERY_POLL_MS,
            Err(e) => {
                delay = delay.saturating_mul(2).min(RECOVERY_MAX_MS);
                log::warn!("hw_timer: recovery failed ({}); retry in {} ms", e, delay);
            }
        }
    }
}

// ── Simulation ────────────────────────────────────────────────

/// Host deadline timer. Nothing expires on its own: call
/// [`expire`](Self::expire) to deliver the pending firing.
#[derive(Debug, Default)]
pub struct SimTimer {
    pending: Option<u32>,
    history: Vec<u32>,
    failing_arms: u32,
    cancels: u32,
}

impl SimTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration of the pending deadline, if one is armed.
    pub fn pending(&self) -> Option<u32> {
        self.pending
    }

    /// Every successfully armed duration, oldest first.
    pub fn history(&self) -> &[u32] {
        &self.history
    }

    pub fn cancels(&self) -> u32 {
        self.cancels
    }

    /// Make the next `n` arm calls fail.
    pub fn fail_next(&mut self, n: u32) {
        self.failing_arms = n;
    }

    /// Deliver the pending firing to `controller`. Returns `Ok(None)` when
    /// nothing was armed.
    pub fn expire<L: crate::app::ports::LampPort>(
        &mut self,
        controller: &Controller<L>,
    ) -> crate::error::Result<Option<crate::fsm::Step>> {
        if self.pending.take().is_none() {
            return Ok(None);
        }
        controller.fire(self)
    }
}

impl DeadlineTimer for SimTimer {
    fn arm(&mut self, after_ms: u32) -> Result<(), TimerError> {
        if self.failing_arms > 0 {
            self.failing_arms -= 1;
            return Err(TimerError::ArmFailed(-1));
        }
        self.pending = Some(after_ms);
        self.history.push(after_ms);
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), TimerError> {
        self.pending = None;
        self.cancels += 1;
        Ok(())
    }
}
