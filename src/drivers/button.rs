//! Falling-edge button inputs.
//!
//! ## Hardware
//!
//! Active-low momentary switches with internal pull-ups. The GPIO
//! interrupt fires on the falling edge and runs the subscribed handler
//! directly in ISR context; there is no polling loop.
//!
//! ## Debounce
//!
//! [`ButtonGate`] drops edges that arrive within `debounce_ms` of the last
//! accepted one. It is lock-free (two atomics) so it can run in the ISR.
//! A window of 0 accepts every edge.
//!
//! ## Wiring
//!
//! | Button     | Handler                               |
//! |------------|---------------------------------------|
//! | Mode       | `Controller::on_mode_button`          |
//! | Pedestrian | `Controller::on_pedestrian_button`    |

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::app::ports::{Button, EdgeInput, LampPort};
use crate::app::service::Controller;
use crate::error::InputError;

#[cfg(feature = "espidf")]
pub use esp::EspButtons;

/// ISR-safe edge filter.
#[derive(Debug)]
pub struct ButtonGate {
    window_ms: u32,
    last_ms: AtomicU32,
    seen: AtomicBool,
}

impl ButtonGate {
    pub const fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            last_ms: AtomicU32::new(0),
            seen: AtomicBool::new(false),
        }
    }

    /// Accept or reject an edge observed at `now_ms` (wrapping millis).
    pub fn admit(&self, now_ms: u32) -> bool {
        if self.window_ms == 0 {
            return true;
        }
        if self.seen.load(Ordering::Acquire)
            && now_ms.wrapping_sub(self.last_ms.load(Ordering::Acquire)) < self.window_ms
        {
            return false;
        }
        self.last_ms.store(now_ms, Ordering::Release);
        self.seen.store(true, Ordering::Release);
        true
    }
}

/// Subscribe both buttons to `controller`.
///
/// `clock` returns monotonic milliseconds and must be callable from
/// interrupt context. If the second subscription fails the first is
/// removed again.
pub fn attach_buttons<L, I, C>(
    controller: &Arc<Controller<L>>,
    inputs: &mut I,
    debounce_ms: u32,
    clock: C,
) -> Result<(), InputError>
where
    L: LampPort + Send + 'static,
    I: EdgeInput,
    C: Fn() -> u32 + Clone + Send + 'static,
{
    let ctl = Arc::clone(controller);
    let gate = ButtonGate::new(debounce_ms);
    let now = clock.clone();
    inputs.subscribe_falling(Button::Mode, move || {
        if gate.admit(now()) {
            let _ = ctl.on_mode_button();
        }
    })?;

    let ctl = Arc::clone(controller);
    let gate = ButtonGate::new(debounce_ms);
    let subscribed = inputs.subscribe_falling(Button::Pedestrian, move || {
        if gate.admit(clock()) {
            let _ = ctl.on_pedestrian_button();
        }
    });
    if let Err(e) = subscribed {
        let _ = inputs.unsubscribe(Button::Mode);
        return Err(e);
    }

    log::info!("Buttons attached (debounce {} ms)", debounce_ms);
    Ok(())
}

/// Remove both handlers. Both are attempted; the first failure is returned.
pub fn detach_buttons<I: EdgeInput>(inputs: &mut I) -> Result<(), InputError> {
    let mode = inputs.unsubscribe(Button::Mode);
    let pedestrian = inputs.unsubscribe(Button::Pedestrian);
    mode.and(pedestrian)
}

// ── ESP-IDF GPIO interrupts ───────────────────────────────────

#[cfg(feature = "espidf")]
mod esp {
    use core::ffi::c_void;

    use esp_idf_svc::sys::*;

    use crate::app::ports::{Button, EdgeInput};
    use crate::error::InputError;
    use crate::pins;

    type IsrHandler = Box<dyn FnMut() + Send>;

    const fn gpio_for(button: Button) -> i32 {
        match button {
            Button::Mode => pins::MODE_BUTTON_GPIO,
            Button::Pedestrian => pins::PEDESTRIAN_BUTTON_GPIO,
        }
    }

    const fn slot(button: Button) -> usize {
        match button {
            Button::Mode => 0,
            Button::Pedestrian => 1,
        }
    }

    /// Both button GPIOs, configured as pulled-up inputs interrupting on
    /// the falling edge.
    pub struct EspButtons {
        handlers: [*mut IsrHandler; 2],
    }

    impl EspButtons {
        pub fn new() -> Result<Self, InputError> {
            let mask = (1u64 << pins::MODE_BUTTON_GPIO) | (1u64 << pins::PEDESTRIAN_BUTTON_GPIO);
            let cfg = gpio_config_t {
                pin_bit_mask: mask,
                mode: gpio_mode_t_GPIO_MODE_INPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
                ..Default::default()
            };

            // SAFETY: called once from the main task before any handler
            // is registered.
            unsafe {
                let ret = gpio_config(&cfg);
                if ret != ESP_OK as i32 {
                    return Err(InputError::SubscribeFailed(ret));
                }
                // Already installed is fine.
                let ret = gpio_install_isr_service(0);
                if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
                    return Err(InputError::SubscribeFailed(ret));
                }
            }

            Ok(Self {
                handlers: [core::ptr::null_mut(); 2],
            })
        }
    }

    unsafe extern "C" fn button_trampoline(arg: *mut c_void) {
        // SAFETY: arg is the boxed handler registered in subscribe_falling
        // and stays alive until the ISR handler is removed.
        let handler = unsafe { &mut *arg.cast::<IsrHandler>() };
        handler();
    }

    impl EdgeInput for EspButtons {
        fn subscribe_falling<F>(&mut self, button: Button, handler: F) -> Result<(), InputError>
        where
            F: FnMut() + Send + 'static,
        {
            self.unsubscribe(button)?;

            let boxed: *mut IsrHandler = Box::into_raw(Box::new(Box::new(handler)));
            let gpio = gpio_for(button);

            // SAFETY: boxed stays valid until unsubscribe removes the
            // handler and frees it.
            unsafe {
                let ret = gpio_isr_handler_add(gpio, Some(button_trampoline), boxed.cast());
                if ret != ESP_OK as i32 {
                    drop(Box::from_raw(boxed));
                    return Err(InputError::SubscribeFailed(ret));
                }
                gpio_intr_enable(gpio);
            }
            self.handlers[slot(button)] = boxed;
            Ok(())
        }

        fn unsubscribe(&mut self, button: Button) -> Result<(), InputError> {
            let idx = slot(button);
            let boxed = self.handlers[idx];
            if boxed.is_null() {
                return Ok(());
            }
            let gpio = gpio_for(button);

            // SAFETY: once gpio_isr_handler_remove returns the trampoline
            // can no longer be entered for this pin.
            unsafe {
                gpio_intr_disable(gpio);
                let ret = gpio_isr_handler_remove(gpio);
                if ret != ESP_OK as i32 {
                    return Err(InputError::UnsubscribeFailed(ret));
                }
                drop(Box::from_raw(boxed));
            }
            self.handlers[idx] = core::ptr::null_mut();
            Ok(())
        }
    }

    impl Drop for EspButtons {
        fn drop(&mut self) {
            let _ = self.unsubscribe(Button::Mode);
            let _ = self.unsubscribe(Button::Pedestrian);
        }
    }
}
