//! Line console over the serial port.
//!
//! Maps console lines onto one [`Session`]:
//!
//! | Line       | Action                                      |
//! |------------|---------------------------------------------|
//! | `status`   | read the status line from the top           |
//! | `stats`    | print runtime counters                      |
//! | `reset`    | rewind the session (empties the intake)     |
//! | `shutdown` | ask the caller to stop the controller       |
//! | other      | rate payload, written to a fresh intake     |
//!
//! Each console line stands for one complete open-write-close, so a rate
//! line rewinds the session before writing.

use core::fmt;

use crate::app::ports::LampPort;
use crate::app::service::Stats;
use crate::config::STATUS_CAPACITY;
use crate::device::{Session, WriteReport};
use crate::error::RequestError;

/// Console response to one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(heapless::String<STATUS_CAPACITY>),
    Stats(Stats),
    Written(WriteReport),
    Rewound,
    Shutdown,
    Failed(RequestError),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(line) => f.write_str(line),
            Self::Stats(s) => writeln!(
                f,
                "firings: {} - output faults: {} - arm retries: {} - stalls: {} - \
                 recoveries: {} - calls served: {} - calls discarded: {}",
                s.firings,
                s.output_faults,
                s.arm_retries,
                s.stalls,
                s.recoveries,
                s.calls_served,
                s.calls_discarded
            ),
            Self::Written(WriteReport { accepted, rate }) => match rate {
                Ok(divisor) => writeln!(f, "ok ({accepted} bytes): rate divisor {divisor}"),
                Err(e) => writeln!(f, "ok ({accepted} bytes): ignored, {e}"),
            },
            Self::Rewound => writeln!(f, "ok: session reset"),
            Self::Shutdown => writeln!(f, "shutting down"),
            Self::Failed(e) => writeln!(f, "error: {e}"),
        }
    }
}

/// Handle one console line (without its terminator).
pub fn handle_line<L: LampPort>(session: &mut Session<'_, L>, stats: Stats, line: &str) -> Reply {
    match line.trim() {
        "status" => {
            session.rewind();
            let mut buf = [0u8; STATUS_CAPACITY];
            let mut len = 0;
            loop {
                match session.read(&mut buf[len..]) {
                    Ok(0) => break,
                    Ok(n) => len += n,
                    Err(e) => return Reply::Failed(e),
                }
            }
            let text = core::str::from_utf8(&buf[..len]).unwrap_or_default();
            let mut line = heapless::String::new();
            let _ = line.push_str(text);
            Reply::Status(line)
        }
        "stats" => Reply::Stats(stats),
        "reset" => {
            session.rewind();
            Reply::Rewound
        }
        "shutdown" => Reply::Shutdown,
        _ => {
            session.rewind();
            match session.write_detailed(line.as_bytes()) {
                Ok(report) => Reply::Written(report),
                Err(e) => Reply::Failed(e),
            }
        }
    }
}
