//! Heating bridge library.
//!
//! Exposes thermostat accessories to a home-automation hub, backed either by
//! a weekly heating schedule or by an HTTP-controlled heating device.

pub mod accessory;
pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod host;
pub mod http;
pub mod mode;
pub mod platform;
pub mod schedule;
