//! Interface to the home-automation host.
//!
//! The accessory never talks to a concrete host type. It pushes characteristic
//! updates through a [`CharacteristicSink`] and answers pull-style reads from a
//! [`SharedSnapshot`] that it refreshes after every push.

mod log_sink;

pub use log_sink::LogSink;

use crate::mode::{HeatingState, Mode};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Receives characteristic updates from an accessory.
///
/// Calls are fire-and-forget; implementations must not block.
pub trait CharacteristicSink: Send + Sync {
    fn set_current_heating_cooling_state(&self, state: HeatingState);

    fn set_current_temperature(&self, celsius: f64);

    fn set_target_temperature(&self, celsius: f64);
}

/// Last values pushed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThermostatSnapshot {
    pub current_state: HeatingState,
    pub target_mode: Mode,
    pub current_temperature: f64,
    pub target_temperature: f64,
}

/// Snapshot shared between the accessory task and host-side readers.
#[derive(Debug, Clone)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<ThermostatSnapshot>>,
}

impl SharedSnapshot {
    pub fn new(initial: ThermostatSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> ThermostatSnapshot {
        *self.inner.read()
    }

    pub(crate) fn store(&self, snapshot: ThermostatSnapshot) {
        *self.inner.write() = snapshot;
    }
}
