//! Signalhead Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SignalHead      EspTimerSlot     EspButtons     Console       │
//! │  (LampPort)      (DeadlineTimer)  (EdgeInput)    (Session)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │         Controller (critical-section core)             │    │
//! │  │  FSM · pedestrian latch · rate divisor                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::{error, info, warn};

use signalhead::adapters::console::{self, Reply};
use signalhead::adapters::time::uptime_ms;
use signalhead::app::service::Controller;
use signalhead::config::ControllerConfig;
use signalhead::device::Session;
use signalhead::drivers::button::{EspButtons, attach_buttons, detach_buttons};
use signalhead::drivers::hw_timer::{EspTimerSlot, supervise};
use signalhead::drivers::signal_head::SignalHead;

const CONSOLE_IDLE: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Signalhead v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = ControllerConfig {
        debounce_ms: 50,
        ..ControllerConfig::default()
    };

    // ── 2. Lamp outputs (pins::RED/YELLOW/GREEN_LAMP_GPIO) ────
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let red = PinDriver::input_output(peripherals.pins.gpio4)?;
    let yellow = PinDriver::input_output(peripherals.pins.gpio5)?;
    let green = PinDriver::input_output(peripherals.pins.gpio6)?;
    let head = SignalHead::new(red, yellow, green);

    // ── 3. Controller + deadline timer ────────────────────────
    let controller = Arc::new(Controller::new(&config, head)?);
    let slot = EspTimerSlot::create(Arc::clone(&controller))?;
    let mut deadline = slot.deadline();
    controller.start(&mut deadline)?;

    let recovery = {
        let controller = Arc::clone(&controller);
        let mut deadline = slot.deadline();
        std::thread::Builder::new()
            .name("recovery".into())
            .stack_size(4096)
            .spawn(move || {
                supervise(&controller, &mut deadline, |ms| {
                    std::thread::sleep(Duration::from_millis(u64::from(ms)));
                    true
                });
            })?
    };

    // ── 4. Buttons ────────────────────────────────────────────
    let mut buttons = match EspButtons::new() {
        Ok(b) => b,
        Err(e) => {
            error!("Button init failed: {}; stopping", e);
            controller.shutdown(&mut deadline)?;
            return Err(e.into());
        }
    };
    if let Err(e) = attach_buttons(&controller, &mut buttons, config.debounce_ms, uptime_ms) {
        error!("Button attach failed: {}; stopping", e);
        controller.shutdown(&mut deadline)?;
        return Err(e.into());
    }

    // ── 5. Console loop ───────────────────────────────────────
    info!("Console ready: status | stats | reset | shutdown | <rate>");
    run_console(&controller);

    // ── 6. Ordered shutdown ───────────────────────────────────
    if let Err(e) = detach_buttons(&mut buttons) {
        warn!("Button detach: {}", e);
    }
    let head = controller.shutdown(&mut deadline)?;
    if recovery.join().is_err() {
        warn!("Recovery thread panicked");
    }
    drop(slot);
    drop(head.release());
    info!("Signalhead stopped");
    Ok(())
}

fn run_console<L>(controller: &Controller<L>)
where
    L: signalhead::app::ports::LampPort,
{
    let mut session = Session::open(controller);
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                std::thread::sleep(CONSOLE_IDLE);
                continue;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(CONSOLE_IDLE);
                continue;
            }
            Err(e) => {
                warn!("Console read failed: {}", e);
                std::thread::sleep(CONSOLE_IDLE);
                continue;
            }
        }

        let reply = console::handle_line(&mut session, controller.stats(), &line);
        print!("{reply}");
        if reply == Reply::Shutdown {
            return;
        }
    }
}
