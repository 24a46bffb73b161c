//! Unified error types for the signal controller.
//!
//! Hardware-facing faults funnel into [`Error`]. The request surface has
//! its own [`RequestError`] because those faults are returned to a
//! caller rather than handled locally, and rate parsing reports through
//! [`ParseRateError`] so callers can assert on rejection.
//! All variants are `Copy` so they can be passed out of interrupt and
//! timer context without allocation.

use core::fmt;

use crate::fsm::states::Lamp;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible hardware operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An indicator output could not be driven or read back.
    Output(OutputError),
    /// The deadline timer could not be armed or cancelled.
    Timer(TimerError),
    /// A button edge subscription failed.
    Input(InputError),
    /// Start-up could not acquire a resource.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output(e) => write!(f, "output: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// Setting the level of a lamp failed.
    SetFailed(Lamp),
    /// Reading back the latched level of a lamp failed.
    ReadFailed(Lamp),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetFailed(lamp) => write!(f, "{} lamp set failed", lamp.name()),
            Self::ReadFailed(lamp) => write!(f, "{} lamp read-back failed", lamp.name()),
        }
    }
}

impl From<OutputError> for Error {
    fn from(e: OutputError) -> Self {
        Self::Output(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer rejected the deadline (platform return code).
    ArmFailed(i32),
    /// Cancelling the pending deadline failed.
    CancelFailed(i32),
    /// Every bounded re-arm attempt failed; the sequence has stalled.
    Exhausted { attempts: u8 },
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArmFailed(rc) => write!(f, "arm failed (rc={rc})"),
            Self::CancelFailed(rc) => write!(f, "cancel failed (rc={rc})"),
            Self::Exhausted { attempts } => write!(f, "re-arm gave up after {attempts} attempts"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Installing the edge callback failed.
    SubscribeFailed(i32),
    /// Removing the edge callback failed.
    UnsubscribeFailed(i32),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscribeFailed(rc) => write!(f, "edge subscribe failed (rc={rc})"),
            Self::UnsubscribeFailed(rc) => write!(f, "edge unsubscribe failed (rc={rc})"),
        }
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Request surface errors
// ---------------------------------------------------------------------------

/// Faults returned to the caller of `read`/`write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// The intake offset has reached capacity; the caller must stop writing.
    NoSpace,
    /// Transfer between caller and device failed (includes lamp read-back).
    Fault,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpace => write!(f, "no space left in intake buffer"),
            Self::Fault => write!(f, "transfer fault"),
        }
    }
}

impl From<OutputError> for RequestError {
    fn from(_: OutputError) -> Self {
        Self::Fault
    }
}

/// Why a rate payload was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRateError {
    /// Nothing but whitespace was written.
    Empty,
    /// The payload does not start with a base-10 integer.
    NotANumber,
    /// The value parsed but is zero or negative.
    NotPositive,
    /// The value does not fit the divisor type.
    Overflow,
}

impl fmt::Display for ParseRateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::NotANumber => write!(f, "not a number"),
            Self::NotPositive => write!(f, "rate must be at least 1"),
            Self::Overflow => write!(f, "rate out of range"),
        }
    }
}

impl std::error::Error for Error {}
impl std::error::Error for OutputError {}
impl std::error::Error for TimerError {}
impl std::error::Error for InputError {}
impl std::error::Error for RequestError {}
impl std::error::Error for ParseRateError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
