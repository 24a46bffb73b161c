//! Request surface: the controller as an openable device.
//!
//! A [`Session`] is one open handle. The first read renders the status line
//! and later reads stream the rest of that same rendering, returning 0 once
//! it is exhausted; writes feed the configuration intake.
//!
//! ```text
//!   Session::read  ──▶ Controller::status ──▶ status::render
//!   Session::write ──▶ Intake::accept ──▶ parse_rate ──▶ Controller::set_rate
//! ```

pub mod intake;
pub mod status;

use log::{debug, info};

use crate::app::ports::LampPort;
use crate::app::service::Controller;
use crate::error::{ParseRateError, RequestError};
use intake::{Intake, parse_rate};
use status::StatusLine;

/// What one write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// Bytes taken from the payload.
    pub accepted: usize,
    /// The divisor that was applied, or why the payload was ignored.
    pub rate: Result<u32, ParseRateError>,
}

/// One open handle on the controller.
pub struct Session<'a, L> {
    controller: &'a Controller<L>,
    read_pos: usize,
    /// Line being streamed; rendered when a read starts at offset 0.
    line: Option<StatusLine>,
    intake: Intake,
}

impl<'a, L: LampPort> Session<'a, L> {
    pub fn open(controller: &'a Controller<L>) -> Self {
        Self {
            controller,
            read_pos: 0,
            line: None,
            intake: Intake::new(),
        }
    }

    /// Copy status bytes from the read offset into `buf`.
    ///
    /// The line is rendered once per pass, so chunked reads never mix two
    /// states. Returns 0 at end of line.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, RequestError> {
        let line = match &mut self.line {
            Some(line) => line,
            slot => slot.insert(self.controller.status()?),
        };
        let bytes = line.as_bytes();
        if self.read_pos >= bytes.len() {
            return Ok(0);
        }
        let n = buf.len().min(bytes.len() - self.read_pos);
        buf[..n].copy_from_slice(&bytes[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }

    /// Feed the intake. Returns the number of bytes accepted; a payload
    /// that is not a positive integer is accepted and ignored.
    pub fn write(&mut self, payload: &[u8]) -> Result<usize, RequestError> {
        self.write_detailed(payload).map(|report| report.accepted)
    }

    /// Like [`write`](Self::write) but also reports the parse result.
    pub fn write_detailed(&mut self, payload: &[u8]) -> Result<WriteReport, RequestError> {
        let chunk = self.intake.accept(payload)?;
        let accepted = chunk.len();
        let rate = parse_rate(chunk).map(|divisor| {
            let previous = self.controller.set_rate(divisor);
            info!("Rate divisor {} -> {}", previous, divisor);
            divisor.get()
        });
        if let Err(e) = rate {
            debug!("Intake: ignored {} bytes ({})", accepted, e);
        }
        Ok(WriteReport { accepted, rate })
    }

    /// Start over: read from the top of the line, empty the intake.
    pub fn rewind(&mut self) {
        self.read_pos = 0;
        self.line = None;
        self.intake.reset();
    }

    pub fn write_offset(&self) -> usize {
        self.intake.offset()
    }
}
