//! Controller service, the hexagonal core.
//!
//! [`Controller`] owns the [`ControllerState`] and the lamp port behind a
//! single critical-section mutex. Three execution contexts share it:
//!
//! ```text
//!  button ISR ──▶ on_mode_button / on_pedestrian_button ─┐
//!                                                         │   ┌─────────────────────┐
//!  timer task ──▶ fire ───────────────────────────────────┼──▶│ Mutex<RefCell<..>>  │
//!                                                         │   │  state · lamps      │
//!  requests   ──▶ status / set_rate / snapshot ───────────┘   └─────────────────────┘
//! ```
//!
//! Every multi-field read-modify-write (phase advance, latch consumption,
//! mode change plus lamp blanking) happens inside one `lock` call, so no
//! context ever observes a half-applied update. Logging happens after the
//! lock is released, and never from the button handlers.

use core::cell::RefCell;
use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, error, info, warn};

use crate::config::{ControllerConfig, ResumePhase};
use crate::device::status::{self, StatusLine};
use crate::error::{Error, RequestError, Result, TimerError};
use crate::fsm::context::{CallOutcome, ControllerState, ModeChange};
use crate::fsm::states::Aspect;
use crate::fsm::{self, Step, Transition};

use super::ports::{DeadlineTimer, LampPort};

// ───────────────────────────────────────────────────────────────
// Shared record
// ───────────────────────────────────────────────────────────────

struct Shared<L> {
    state: ControllerState,
    /// `None` once shutdown has handed the lamps back.
    lamps: Option<L>,
    /// Firings and button presses are ignored unless set.
    running: bool,
    /// Hold to arm once the timer accepts deadlines again. Set while the
    /// lamps show the fallback pattern.
    stalled: Option<u32>,
}

// ───────────────────────────────────────────────────────────────
// Counters
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    firings: AtomicU32,
    output_faults: AtomicU32,
    arm_retries: AtomicU32,
    calls_served: AtomicU32,
    calls_discarded: AtomicU32,
    stalls: AtomicU32,
    recoveries: AtomicU32,
}

/// Point-in-time copy of the controller's runtime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Deadline firings that advanced the state.
    pub firings: u32,
    /// Lamp writes that failed (scheduler and mode button).
    pub output_faults: u32,
    /// Failed arm attempts absorbed by the bounded retry.
    pub arm_retries: u32,
    /// Pedestrian calls that produced a crossing hold.
    pub calls_served: u32,
    /// Pedestrian calls dropped because Normal mode was left.
    pub calls_discarded: u32,
    /// Firings that ran out of arm attempts and parked the lamps.
    pub stalls: u32,
    /// Stalls that [`Controller::recover`] brought back.
    pub recoveries: u32,
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// The signal controller. Share it behind an `Arc` between the timer
/// callback, the button handlers and the request surface.
pub struct Controller<L> {
    shared: Mutex<CriticalSectionRawMutex, RefCell<Shared<L>>>,
    counters: Counters,
    initial_delay_ms: Option<u32>,
    resume_phase: ResumePhase,
    arm_attempts: u8,
}

impl<L: LampPort> Controller<L> {
    /// Build the controller around its lamp port.
    ///
    /// Does **not** touch the lamps or arm anything; call [`start`](Self::start).
    pub fn new(config: &ControllerConfig, lamps: L) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        let state =
            ControllerState::new(config).ok_or(Error::Config("rate_divisor must be at least 1"))?;

        Ok(Self {
            shared: Mutex::new(RefCell::new(Shared {
                state,
                lamps: Some(lamps),
                running: false,
                stalled: None,
            })),
            counters: Counters::default(),
            initial_delay_ms: config.initial_delay_ms,
            resume_phase: config.resume_phase,
            arm_attempts: config.arm_attempts,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Show green only and arm the first deadline.
    ///
    /// Any failure aborts start-up with every lamp forced low.
    pub fn start(&self, timer: &mut impl DeadlineTimer) -> Result<()> {
        let started = self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let Shared {
                state,
                lamps,
                running,
                ..
            } = &mut *shared;

            if *running {
                return Err((Error::Init("controller already running"), Ok(())));
            }
            let lamps = lamps
                .as_mut()
                .ok_or((Error::Init("controller was shut down"), Ok(())))?;
            let delay = self
                .initial_delay_ms
                .unwrap_or_else(|| fsm::initial_hold_ms(state));

            if let Err(e) = lamps.show(Aspect::GREEN) {
                return Err((e.into(), lamps.all_off()));
            }
            if let Err(e) = timer.arm(delay) {
                return Err((e.into(), lamps.all_off()));
            }
            *running = true;
            Ok(delay)
        });

        match started {
            Ok(delay) => {
                info!("Controller started: green, first deadline in {} ms", delay);
                Ok(())
            }
            Err((e, blanked)) => {
                if let Err(off) = blanked {
                    warn!("Start-up: {}; outputs may still be lit", off);
                }
                error!("Controller start aborted: {}", e);
                Err(e)
            }
        }
    }

    /// Cancel the timer, blank the lamps and hand the lamp port back.
    ///
    /// Takes the same lock as every handler, so anything in flight finishes
    /// first; anything that runs afterwards finds the controller stopped
    /// and touches nothing.
    pub fn shutdown(&self, timer: &mut impl DeadlineTimer) -> Result<L> {
        let (lamps, cancelled, blanked) = self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            shared.running = false;
            shared.stalled = None;
            let cancelled = timer.cancel();
            let mut lamps = shared
                .lamps
                .take()
                .ok_or(Error::Init("controller already shut down"))?;
            let blanked = lamps.all_off();
            Ok::<_, Error>((lamps, cancelled, blanked))
        })?;

        if let Err(e) = cancelled {
            warn!("Shutdown: {}; late firings will be ignored", e);
        }
        if let Err(e) = blanked {
            warn!("Shutdown: {}", e);
        }
        info!("Controller stopped");
        Ok(lamps)
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock(|cell| cell.borrow().running)
    }

    // ── Phase scheduler (timer context) ───────────────────────

    /// Deadline callback: advance one step, drive the lamps, re-arm.
    ///
    /// A lamp fault does not stop the sequence; the next firing rewrites
    /// all three lamps. Arming is retried up to `arm_attempts` times. When
    /// every attempt fails the lamps are parked on the [`fsm::fallback`]
    /// pattern, the controller is marked stalled and the error is returned;
    /// [`recover`](Self::recover) re-arms it later.
    ///
    /// Returns `Ok(None)` when the controller is not running.
    pub fn fire(&self, timer: &mut impl DeadlineTimer) -> Result<Option<Step>> {
        let fired = self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let Shared {
                state,
                lamps,
                running,
                stalled,
            } = &mut *shared;

            if !*running {
                return None;
            }
            let lamps = lamps.as_mut()?;
            let step = fsm::advance(state);
            let shown = lamps.show(step.aspect);
            let armed = arm_bounded(timer, step.hold_ms, self.arm_attempts);
            let parked = armed.is_err().then(|| {
                // The crossing hold never ran; keep the call for the next cycle.
                if let Transition::Phase { crossing: true, .. } = step.transition {
                    state.pedestrian_call = true;
                }
                let safe = fsm::fallback(state);
                *stalled = Some(safe.hold_ms);
                (safe, lamps.show(safe.aspect))
            });
            Some((step, shown, armed, parked))
        });

        let Some((step, shown, armed, parked)) = fired else {
            debug!("Deadline fired while stopped; ignored");
            return Ok(None);
        };

        self.counters.firings.fetch_add(1, Ordering::Relaxed);
        if let (Transition::Phase { crossing: true, .. }, None) = (step.transition, &parked) {
            self.counters.calls_served.fetch_add(1, Ordering::Relaxed);
            info!("Pedestrian call served: red+yellow for {} ms", step.hold_ms);
        }
        if let Err(e) = shown {
            self.counters.output_faults.fetch_add(1, Ordering::Relaxed);
            warn!("Scheduler: {}; sequence continues", e);
        }

        match armed {
            Ok(retries) => {
                if retries > 0 {
                    self.counters.arm_retries.fetch_add(retries, Ordering::Relaxed);
                    warn!("Scheduler: deadline armed after {} retries", retries);
                }
                debug!("{:?} -> {:?}, next in {} ms", step.transition, step.aspect, step.hold_ms);
                Ok(Some(step))
            }
            Err(e) => {
                self.counters
                    .arm_retries
                    .fetch_add(u32::from(self.arm_attempts), Ordering::Relaxed);
                self.counters.stalls.fetch_add(1, Ordering::Relaxed);
                if let Some((safe, Err(off))) = parked {
                    self.counters.output_faults.fetch_add(1, Ordering::Relaxed);
                    warn!("Scheduler: fallback {:?}: {}", safe.aspect, off);
                }
                error!("Scheduler: {}; lamps parked until the timer recovers", e);
                Err(e.into())
            }
        }
    }

    /// Re-arm a stalled controller with the fallback hold.
    ///
    /// Returns `Ok(true)` when the sequence is running again and `Ok(false)`
    /// when there was nothing to recover. One attempt per call; the caller
    /// spaces the calls out.
    pub fn recover(&self, timer: &mut impl DeadlineTimer) -> Result<bool> {
        let armed = self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            if !shared.running {
                return None;
            }
            let hold = shared.stalled?;
            let armed = timer.arm(hold);
            if armed.is_ok() {
                shared.stalled = None;
            }
            Some(armed.map(|()| hold))
        });

        match armed {
            None => Ok(false),
            Some(Ok(hold)) => {
                self.counters.recoveries.fetch_add(1, Ordering::Relaxed);
                info!("Scheduler: timer recovered, next in {} ms", hold);
                Ok(true)
            }
            Some(Err(e)) => Err(e.into()),
        }
    }

    /// True while a failed re-arm has parked the lamps.
    pub fn is_stalled(&self) -> bool {
        self.shared.lock(|cell| cell.borrow().stalled.is_some())
    }

    // ── Input handlers (interrupt context) ────────────────────

    /// Mode button: step the mode and blank all lamps. The next firing
    /// shows the pattern for the new mode.
    ///
    /// Bounded, non-blocking and silent. Returns `None` when not running.
    pub fn on_mode_button(&self) -> Option<ModeChange> {
        let (change, blanked) = self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let Shared {
                state,
                lamps,
                running,
                ..
            } = &mut *shared;

            if !*running {
                return None;
            }
            let change = state.cycle_mode(self.resume_phase);
            let blanked = lamps.as_mut().is_some_and(|l| l.all_off().is_ok());
            Some((change, blanked))
        })?;

        if !blanked {
            self.counters.output_faults.fetch_add(1, Ordering::Relaxed);
        }
        if change.discarded_call {
            self.counters.calls_discarded.fetch_add(1, Ordering::Relaxed);
        }
        Some(change)
    }

    /// Pedestrian button: latch a crossing request if cycling normally.
    ///
    /// Bounded, non-blocking and silent.
    pub fn on_pedestrian_button(&self) -> CallOutcome {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            if shared.running {
                shared.state.request_crossing()
            } else {
                CallOutcome::Ignored(shared.state.mode)
            }
        })
    }

    // ── Request context ───────────────────────────────────────

    /// Render the status line from the state and the lamps' read-back.
    pub fn status(&self) -> core::result::Result<StatusLine, RequestError> {
        let (state, aspect) = self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let state = shared.state;
            let lamps = shared.lamps.as_mut().ok_or(RequestError::Fault)?;
            Ok::<_, RequestError>((state, lamps.read_aspect()?))
        })?;
        Ok(status::render(&state, aspect))
    }

    /// Replace the rate divisor. Returns the previous value.
    ///
    /// Takes effect at the next re-arm; the pending deadline keeps the
    /// duration it was armed with.
    pub fn set_rate(&self, divisor: NonZeroU32) -> u32 {
        self.shared.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let previous = shared.state.rate_divisor();
            shared.state.set_rate_divisor(divisor);
            previous
        })
    }

    /// Consistent copy of the controller state.
    pub fn snapshot(&self) -> ControllerState {
        self.shared.lock(|cell| cell.borrow().state)
    }

    pub fn stats(&self) -> Stats {
        let c = &self.counters;
        Stats {
            firings: c.firings.load(Ordering::Relaxed),
            output_faults: c.output_faults.load(Ordering::Relaxed),
            arm_retries: c.arm_retries.load(Ordering::Relaxed),
            calls_served: c.calls_served.load(Ordering::Relaxed),
            calls_discarded: c.calls_discarded.load(Ordering::Relaxed),
            stalls: c.stalls.load(Ordering::Relaxed),
            recoveries: c.recoveries.load(Ordering::Relaxed),
        }
    }
}

/// Try to arm up to `attempts` times. Returns how many attempts failed
/// before one succeeded.
fn arm_bounded(
    timer: &mut impl DeadlineTimer,
    after_ms: u32,
    attempts: u8,
) -> core::result::Result<u32, TimerError> {
    for failed in 0..attempts {
        if timer.arm(after_ms).is_ok() {
            return Ok(u32::from(failed));
        }
    }
    Err(TimerError::Exhausted { attempts })
}
