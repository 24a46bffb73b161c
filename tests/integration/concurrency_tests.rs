//! Interleaving tests: firings, button presses and status reads racing on
//! separate threads against one controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use signalhead::app::service::Controller;
use signalhead::config::ControllerConfig;
use signalhead::device::Session;
use signalhead::fsm::context::CallOutcome;

use crate::mock_hw::{MockTimer, RecordingLamps};

const ROUNDS: usize = 2_000;

fn started() -> Arc<Controller<RecordingLamps>> {
    let ctl = Controller::new(&ControllerConfig::default(), RecordingLamps::new()).unwrap();
    ctl.start(&mut MockTimer::new()).unwrap();
    Arc::new(ctl)
}

/// Pull the mode and lamp fields out of a status line.
fn parse_line(line: &str) -> (String, bool, bool, bool) {
    let mode = line
        .strip_prefix("operational mode: ")
        .and_then(|rest| rest.split(' ').next())
        .unwrap()
        .to_string();
    (
        mode,
        line.contains("red on"),
        line.contains("yellow on"),
        line.contains("green on"),
    )
}

#[test]
fn pedestrian_calls_are_never_lost_or_doubled() {
    let ctl = started();
    let done = Arc::new(AtomicBool::new(false));

    let firer = {
        let ctl = Arc::clone(&ctl);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut timer = MockTimer::new();
            while !done.load(Ordering::Acquire) {
                ctl.fire(&mut timer).unwrap();
            }
        })
    };

    let presser = {
        let ctl = Arc::clone(&ctl);
        thread::spawn(move || {
            let mut latched = 0u32;
            for i in 0..ROUNDS {
                if ctl.on_pedestrian_button() == CallOutcome::Latched {
                    latched += 1;
                }
                if i % 97 == 0 {
                    ctl.on_mode_button();
                }
            }
            latched
        })
    };

    let latched = presser.join().unwrap();
    done.store(true, Ordering::Release);
    firer.join().unwrap();

    let stats = ctl.stats();
    let pending = u32::from(ctl.snapshot().pedestrian_call);
    assert_eq!(latched, stats.calls_served + stats.calls_discarded + pending);
}

#[test]
fn status_never_shows_a_torn_pattern() {
    let ctl = started();
    let done = Arc::new(AtomicBool::new(false));

    let workers: Vec<_> = (0..2)
        .map(|worker| {
            let ctl = Arc::clone(&ctl);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut timer = MockTimer::new();
                let mut n = 0usize;
                while !done.load(Ordering::Acquire) {
                    if worker == 0 {
                        ctl.fire(&mut timer).unwrap();
                    } else {
                        n += 1;
                        if n % 7 == 0 {
                            ctl.on_mode_button();
                        } else {
                            ctl.on_pedestrian_button();
                        }
                    }
                }
            })
        })
        .collect();

    let mut session = Session::open(&ctl);
    for _ in 0..ROUNDS {
        session.rewind();
        let mut buf = [0u8; 128];
        let n = session.read(&mut buf).unwrap();
        let line = std::str::from_utf8(&buf[..n]).unwrap();
        let (mode, red, yellow, green) = parse_line(line);

        if mode == "normal" {
            // One lamp, or red + yellow during a crossing, or dark just
            // after the mode button.
            assert!(!(green && (red || yellow)), "torn pattern: {line}");
        } else {
            // Flashing: the mode change blanked every lamp under the same
            // lock, so only the flashing lamp can ever be lit.
            assert!(!green, "green while flashing: {line}");
            assert!(!(red && yellow), "two lamps while flashing: {line}");
        }
    }

    done.store(true, Ordering::Release);
    for w in workers {
        w.join().unwrap();
    }
}
