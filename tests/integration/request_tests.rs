//! Integration tests for the request surface: status reads and the
//! configuration intake.

use signalhead::app::service::Controller;
use signalhead::config::{ControllerConfig, INTAKE_CAPACITY};
use signalhead::device::{Session, WriteReport};
use signalhead::error::{ParseRateError, RequestError};

use crate::mock_hw::{MockTimer, RecordingLamps};

fn started() -> (Controller<RecordingLamps>, RecordingLamps, MockTimer) {
    let lamps = RecordingLamps::new();
    let ctl = Controller::new(&ControllerConfig::default(), lamps.clone()).unwrap();
    let mut timer = MockTimer::new();
    ctl.start(&mut timer).unwrap();
    (ctl, lamps, timer)
}

fn read_line(session: &mut Session<'_, RecordingLamps>) -> String {
    session.rewind();
    let mut buf = [0u8; 256];
    let n = session.read(&mut buf).unwrap();
    String::from_utf8(buf[..n].to_vec()).unwrap()
}

#[test]
fn status_during_normal_red() {
    let (ctl, _lamps, mut timer) = started();
    ctl.fire(&mut timer).unwrap();
    ctl.fire(&mut timer).unwrap();
    let mut session = Session::open(&ctl);
    assert_eq!(
        read_line(&mut session),
        "operational mode: normal - cycle rate: 1 - LED status: red on, yellow off, green off, \
         Pedestrian: not present\n"
    );
}

#[test]
fn status_during_flashing_red_dark_half() {
    let (ctl, _lamps, mut timer) = started();
    ctl.on_mode_button();
    ctl.fire(&mut timer).unwrap(); // red on
    ctl.fire(&mut timer).unwrap(); // red off
    let mut session = Session::open(&ctl);
    assert_eq!(
        read_line(&mut session),
        "operational mode: flashing-red - cycle rate: 1 - LED status: red off, yellow off, \
         green off, Pedestrian: not present\n"
    );
}

#[test]
fn status_during_crossing_hold() {
    let (ctl, _lamps, mut timer) = started();
    ctl.on_pedestrian_button();
    let mut session = Session::open(&ctl);
    assert!(read_line(&mut session).ends_with("Pedestrian: present\n"));

    ctl.fire(&mut timer).unwrap();
    ctl.fire(&mut timer).unwrap();
    assert_eq!(
        read_line(&mut session),
        "operational mode: normal - cycle rate: 1 - LED status: red on, yellow on, green off, \
         Pedestrian: not present\n"
    );
}

#[test]
fn status_is_a_pure_read() {
    let (ctl, lamps, _timer) = started();
    let before = ctl.snapshot();
    let writes = lamps.log().calls.len();
    let mut session = Session::open(&ctl);
    let first = read_line(&mut session);
    let second = read_line(&mut session);
    assert_eq!(first, second);
    assert_eq!(ctl.snapshot(), before);
    assert_eq!(lamps.log().calls.len(), writes);
}

#[test]
fn status_read_back_fault() {
    let (ctl, lamps, _timer) = started();
    lamps.fail_reads(true);
    let mut session = Session::open(&ctl);
    assert_eq!(session.read(&mut [0u8; 64]), Err(RequestError::Fault));
}

#[test]
fn partial_reads_then_eof() {
    let (ctl, _lamps, _timer) = started();
    let mut session = Session::open(&ctl);
    let mut text = Vec::new();
    let mut buf = [0u8; 10];
    loop {
        let n = session.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        assert!(n <= buf.len());
        text.extend_from_slice(&buf[..n]);
    }
    assert!(text.ends_with(b"green on, Pedestrian: not present\n"));
}

#[test]
fn write_five_speeds_up_next_deadline() {
    let (ctl, _lamps, mut timer) = started();
    let mut session = Session::open(&ctl);
    assert_eq!(session.write(b"5").unwrap(), 1);
    assert_eq!(ctl.snapshot().rate_divisor(), 5);
    ctl.fire(&mut timer).unwrap();
    assert_eq!(timer.pending, Some(200));
}

#[test]
fn write_zero_is_accepted_and_ignored() {
    let (ctl, _lamps, _timer) = started();
    let mut session = Session::open(&ctl);
    assert_eq!(session.write(b"0").unwrap(), 1);
    assert_eq!(ctl.snapshot().rate_divisor(), 1);
}

#[test]
fn write_garbage_is_accepted_and_ignored() {
    let (ctl, _lamps, _timer) = started();
    let mut session = Session::open(&ctl);
    assert_eq!(
        session.write_detailed(b"abc").unwrap(),
        WriteReport {
            accepted: 3,
            rate: Err(ParseRateError::NotANumber)
        }
    );
    assert_eq!(ctl.snapshot().rate_divisor(), 1);
}

#[test]
fn write_past_capacity_is_no_space() {
    let (ctl, _lamps, _timer) = started();
    let mut session = Session::open(&ctl);
    let filler = vec![b'x'; INTAKE_CAPACITY];
    assert_eq!(session.write(&filler).unwrap(), INTAKE_CAPACITY);
    assert_eq!(session.write(b"5"), Err(RequestError::NoSpace));
    assert_eq!(ctl.snapshot().rate_divisor(), 1);
}

#[test]
fn oversized_write_is_truncated() {
    let (ctl, _lamps, _timer) = started();
    let mut session = Session::open(&ctl);
    let mut payload = b"3".to_vec();
    payload.resize(500, b' ');
    assert_eq!(session.write(&payload).unwrap(), INTAKE_CAPACITY);
    assert_eq!(ctl.snapshot().rate_divisor(), 3);
}
