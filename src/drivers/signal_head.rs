//! Three-lamp signal head on GPIO outputs.
//!
//! ## Hardware
//!
//! Each lamp is a push-pull output driving an LED (or a lamp relay) high =
//! lit. Lamps are read back through `StatefulOutputPin::is_set_high`, which
//! returns the output latch, so the status line reports the real pin level
//! rather than a software copy.
//!
//! On the host, [`SimPin`] stands in for a GPIO. Clones share one pin, so a
//! test can keep a handle after the pin has moved into a [`SignalHead`].

use embedded_hal::digital::{PinState, StatefulOutputPin};

use crate::app::ports::LampPort;
use crate::error::OutputError;
use crate::fsm::states::Lamp;

/// Red, yellow and green outputs.
pub struct SignalHead<R, Y, G> {
    red: R,
    yellow: Y,
    green: G,
}

impl<R, Y, G> SignalHead<R, Y, G> {
    pub fn new(red: R, yellow: Y, green: G) -> Self {
        Self { red, yellow, green }
    }

    /// Hand the pins back (e.g. to reconfigure them as inputs on shutdown).
    pub fn release(self) -> (R, Y, G) {
        (self.red, self.yellow, self.green)
    }
}

impl<R, Y, G> LampPort for SignalHead<R, Y, G>
where
    R: StatefulOutputPin,
    Y: StatefulOutputPin,
    G: StatefulOutputPin,
{
    fn set(&mut self, lamp: Lamp, on: bool) -> Result<(), OutputError> {
        let level = PinState::from(on);
        let ok = match lamp {
            Lamp::Red => self.red.set_state(level).is_ok(),
            Lamp::Yellow => self.yellow.set_state(level).is_ok(),
            Lamp::Green => self.green.set_state(level).is_ok(),
        };
        if ok { Ok(()) } else { Err(OutputError::SetFailed(lamp)) }
    }

    fn is_on(&mut self, lamp: Lamp) -> Result<bool, OutputError> {
        let level = match lamp {
            Lamp::Red => self.red.is_set_high().ok(),
            Lamp::Yellow => self.yellow.is_set_high().ok(),
            Lamp::Green => self.green.is_set_high().ok(),
        };
        level.ok_or(OutputError::ReadFailed(lamp))
    }
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(feature = "espidf"))]
pub use sim::SimPin;

#[cfg(not(feature = "espidf"))]
mod sim {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, StatefulOutputPin};

    #[derive(Debug, Default)]
    struct PinCell {
        level: AtomicBool,
        failing_writes: AtomicU32,
        failing_reads: AtomicBool,
    }

    /// Host stand-in for an output GPIO with fault injection.
    #[derive(Debug, Clone, Default)]
    pub struct SimPin {
        cell: Arc<PinCell>,
    }

    impl SimPin {
        pub fn new() -> Self {
            Self::default()
        }

        /// Current output level.
        pub fn level(&self) -> bool {
            self.cell.level.load(Ordering::Acquire)
        }

        /// Make the next `n` writes fail without changing the level.
        pub fn fail_writes(&self, n: u32) {
            self.cell.failing_writes.store(n, Ordering::Release);
        }

        /// Make read-back fail until switched off again.
        pub fn fail_reads(&self, fail: bool) {
            self.cell.failing_reads.store(fail, Ordering::Release);
        }
    }

    impl ErrorType for SimPin {
        type Error = ErrorKind;
    }

    impl SimPin {
        fn write(&self, high: bool) -> Result<(), ErrorKind> {
            let injected = self
                .cell
                .failing_writes
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok();
            if injected {
                return Err(ErrorKind::Other);
            }
            self.cell.level.store(high, Ordering::Release);
            Ok(())
        }
    }

    impl OutputPin for SimPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.write(false)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.write(true)
        }
    }

    impl StatefulOutputPin for SimPin {
        fn is_set_high(&mut self) -> Result<bool, Self::Error> {
            if self.cell.failing_reads.load(Ordering::Acquire) {
                return Err(ErrorKind::Other);
            }
            Ok(self.level())
        }

        fn is_set_low(&mut self) -> Result<bool, Self::Error> {
            self.is_set_high().map(|high| !high)
        }
    }
}
