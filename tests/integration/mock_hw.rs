//! Mock hardware adapters for integration tests.
//!
//! Records every lamp write and timer call so tests can assert on the full
//! history without touching real GPIO or esp_timer.

use std::sync::{Arc, Mutex, MutexGuard};

use signalhead::app::ports::{Button, DeadlineTimer, EdgeInput, LampPort};
use signalhead::error::{InputError, OutputError, TimerError};
use signalhead::fsm::states::{Aspect, Lamp};

// ── Lamp call record ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LampCall {
    pub lamp: Lamp,
    pub on: bool,
}

#[derive(Debug, Default)]
pub struct LampLog {
    pub levels: Aspect,
    pub calls: Vec<LampCall>,
    pub fail_sets: Vec<Lamp>,
    pub fail_reads: bool,
}

// ── RecordingLamps ────────────────────────────────────────────

/// Lamp port whose log stays reachable through a clone after the lamps
/// move into the controller.
#[derive(Debug, Clone, Default)]
pub struct RecordingLamps {
    log: Arc<Mutex<LampLog>>,
}

#[allow(dead_code)]
impl RecordingLamps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> MutexGuard<'_, LampLog> {
        self.log.lock().unwrap()
    }

    pub fn aspect(&self) -> Aspect {
        self.log().levels
    }

    /// Fail the next write to `lamp`.
    pub fn fail_next_set(&self, lamp: Lamp) {
        self.log().fail_sets.push(lamp);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.log().fail_reads = fail;
    }
}

impl LampPort for RecordingLamps {
    fn set(&mut self, lamp: Lamp, on: bool) -> Result<(), OutputError> {
        let mut log = self.log();
        if let Some(pos) = log.fail_sets.iter().position(|&l| l == lamp) {
            log.fail_sets.remove(pos);
            return Err(OutputError::SetFailed(lamp));
        }
        log.levels.set_lamp(lamp, on);
        log.calls.push(LampCall { lamp, on });
        Ok(())
    }

    fn is_on(&mut self, lamp: Lamp) -> Result<bool, OutputError> {
        let log = self.log();
        if log.fail_reads {
            return Err(OutputError::ReadFailed(lamp));
        }
        Ok(log.levels.lamp(lamp))
    }
}

// ── MockTimer ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCall {
    Arm(u32),
    Cancel,
}

#[derive(Debug, Default)]
pub struct MockTimer {
    pub calls: Vec<TimerCall>,
    pub pending: Option<u32>,
    pub fail_arms: u32,
}

#[allow(dead_code)]
impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations of every successful arm, oldest first.
    pub fn armed(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                TimerCall::Arm(ms) => Some(*ms),
                TimerCall::Cancel => None,
            })
            .collect()
    }
}

impl DeadlineTimer for MockTimer {
    fn arm(&mut self, after_ms: u32) -> Result<(), TimerError> {
        if self.fail_arms > 0 {
            self.fail_arms -= 1;
            return Err(TimerError::ArmFailed(0x103));
        }
        self.pending = Some(after_ms);
        self.calls.push(TimerCall::Arm(after_ms));
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), TimerError> {
        self.pending = None;
        self.calls.push(TimerCall::Cancel);
        Ok(())
    }
}

// ── MockInputs ────────────────────────────────────────────────

type Handler = Box<dyn FnMut() + Send>;

/// Edge input that lets a test "press" a button by calling its handler.
#[derive(Default)]
pub struct MockInputs {
    mode: Option<Handler>,
    pedestrian: Option<Handler>,
}

#[allow(dead_code)]
impl MockInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, button: Button) {
        let handler = match button {
            Button::Mode => self.mode.as_mut(),
            Button::Pedestrian => self.pedestrian.as_mut(),
        };
        if let Some(h) = handler {
            h();
        }
    }

    pub fn is_subscribed(&self, button: Button) -> bool {
        match button {
            Button::Mode => self.mode.is_some(),
            Button::Pedestrian => self.pedestrian.is_some(),
        }
    }
}

impl EdgeInput for MockInputs {
    fn subscribe_falling<F>(&mut self, button: Button, handler: F) -> Result<(), InputError>
    where
        F: FnMut() + Send + 'static,
    {
        let slot = match button {
            Button::Mode => &mut self.mode,
            Button::Pedestrian => &mut self.pedestrian,
        };
        *slot = Some(Box::new(handler));
        Ok(())
    }

    fn unsubscribe(&mut self, button: Button) -> Result<(), InputError> {
        match button {
            Button::Mode => self.mode = None,
            Button::Pedestrian => self.pedestrian = None,
        }
        Ok(())
    }
}
