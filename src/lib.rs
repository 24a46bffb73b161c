//! Signalhead firmware library.
//!
//! Exposes the controller core, the request surface and the drivers for
//! integration testing. ESP-IDF-specific code is guarded by
//! `#[cfg(feature = "espidf")]` within each module; everything else runs
//! on the host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod device;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod pins;

pub use app::service::{Controller, Stats};
pub use config::ControllerConfig;
pub use device::Session;
pub use error::{Error, Result};
