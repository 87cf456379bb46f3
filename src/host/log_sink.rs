//! Characteristic sink that reports updates through the log.
//!
//! Used by the standalone binary, where there is no hub to push values to.
//! Only changes are logged at info level; unchanged pushes go to debug.

use super::CharacteristicSink;
use crate::mode::HeatingState;
use log::{debug, info};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct LastPushed {
    state: Option<HeatingState>,
    current_temperature: Option<f64>,
    target_temperature: Option<f64>,
}

pub struct LogSink {
    name: String,
    last: Mutex<LastPushed>,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last: Mutex::new(LastPushed::default()),
        }
    }
}

impl CharacteristicSink for LogSink {
    fn set_current_heating_cooling_state(&self, state: HeatingState) {
        let mut last = self.last.lock();
        if last.state.replace(state) != Some(state) {
            info!("[{}] CurrentHeatingCoolingState -> {}", self.name, state);
        } else {
            debug!("[{}] CurrentHeatingCoolingState = {}", self.name, state);
        }
    }

    fn set_current_temperature(&self, celsius: f64) {
        let mut last = self.last.lock();
        if last.current_temperature.replace(celsius) != Some(celsius) {
            info!("[{}] CurrentTemperature -> {:.1}°C", self.name, celsius);
        } else {
            debug!("[{}] CurrentTemperature = {:.1}°C", self.name, celsius);
        }
    }

    fn set_target_temperature(&self, celsius: f64) {
        let mut last = self.last.lock();
        if last.target_temperature.replace(celsius) != Some(celsius) {
            info!("[{}] TargetTemperature -> {:.1}°C", self.name, celsius);
        }
    }
}
