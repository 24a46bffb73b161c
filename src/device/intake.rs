//! Configuration intake.
//!
//! A client writes a decimal rate divisor. Bytes accumulate in a fixed
//! [`INTAKE_CAPACITY`] buffer per session; each write is capped at
//! [`MAX_WRITE_CHUNK`] bytes and at the room left. Once the buffer is
//! full, further writes get [`RequestError::NoSpace`] until the session is
//! reset.
//!
//! Each write parses only the bytes that write accepted. Malformed input is
//! reported to the caller through [`ParseRateError`] and otherwise ignored.

use core::num::NonZeroU32;

use crate::config::{INTAKE_CAPACITY, MAX_WRITE_CHUNK};
use crate::error::{ParseRateError, RequestError};

/// Per-session byte buffer; its length is the session's write offset.
#[derive(Debug, Default)]
pub struct Intake {
    buf: heapless::Vec<u8, INTAKE_CAPACITY>,
}

impl Intake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes accepted so far in this session.
    pub fn offset(&self) -> usize {
        self.buf.len()
    }

    /// Append as much of `payload` as the caps allow and return the
    /// accepted bytes.
    pub fn accept(&mut self, payload: &[u8]) -> Result<&[u8], RequestError> {
        let start = self.buf.len();
        if start >= INTAKE_CAPACITY {
            return Err(RequestError::NoSpace);
        }
        let n = payload.len().min(MAX_WRITE_CHUNK).min(INTAKE_CAPACITY - start);
        self.buf
            .extend_from_slice(&payload[..n])
            .map_err(|()| RequestError::NoSpace)?;
        Ok(&self.buf[start..])
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// Parse a leading base-10 integer as a rate divisor.
///
/// Leading ASCII whitespace and one sign are accepted; parsing stops at
/// the first non-digit, so `"5\n"` and `"5abc"` both give 5.
pub fn parse_rate(bytes: &[u8]) -> Result<NonZeroU32, ParseRateError> {
    let trimmed = bytes.trim_ascii_start();
    if trimmed.is_empty() {
        return Err(ParseRateError::Empty);
    }

    let (negative, rest) = match trimmed.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, trimmed),
    };
    let digits_len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits_len == 0 {
        return Err(ParseRateError::NotANumber);
    }
    if negative {
        return Err(ParseRateError::NotPositive);
    }

    let mut value: u32 = 0;
    for &d in &rest[..digits_len] {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u32::from(d - b'0')))
            .ok_or(ParseRateError::Overflow)?;
    }
    NonZeroU32::new(value).ok_or(ParseRateError::NotPositive)
}
