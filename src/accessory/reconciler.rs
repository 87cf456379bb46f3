//! Heating state reconciliation.
//!
//! The reconciler owns the only mutable runtime state of an accessory: the
//! selected [`Mode`] and the current [`HeatingState`]. It is driven from a
//! single task, so its methods take `&mut self` and never block.

use super::Actuator;
use crate::clock::Clock;
use crate::config::Thresholds;
use crate::host::{CharacteristicSink, SharedSnapshot, ThermostatSnapshot};
use crate::mode::{HeatingState, Mode, expected_state};
use crate::schedule::{WeekSchedule, must_heat};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do when a polled device status disagrees with the expected state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedPolicy {
    /// Command the expected state on every poll that disagrees with it.
    #[default]
    Enforce,
    /// Command the expected state once per disagreement, then wait for the
    /// device to catch up.
    EnforceOnce,
    /// Only display the observed state; actuate on mode changes only.
    ObserveOnly,
}

pub struct StateReconciler {
    name: String,
    schedule: WeekSchedule,
    clock: Box<dyn Clock>,
    thresholds: Thresholds,
    policy: ObservedPolicy,
    mode: Mode,
    current: HeatingState,
    /// State commanded while the device disagreed with the expected state.
    commanded: Option<HeatingState>,
    actuator: Arc<dyn Actuator>,
    sink: Arc<dyn CharacteristicSink>,
    snapshot: SharedSnapshot,
}

impl StateReconciler {
    pub fn new(
        name: impl Into<String>,
        schedule: WeekSchedule,
        clock: Box<dyn Clock>,
        thresholds: Thresholds,
        mode: Mode,
        actuator: Arc<dyn Actuator>,
        sink: Arc<dyn CharacteristicSink>,
    ) -> Self {
        let current = HeatingState::Off;
        let snapshot = SharedSnapshot::new(ThermostatSnapshot {
            current_state: current,
            target_mode: mode,
            current_temperature: thresholds.off,
            target_temperature: thresholds.heat,
        });
        Self {
            name: name.into(),
            schedule,
            clock,
            thresholds,
            policy: ObservedPolicy::default(),
            mode,
            current,
            commanded: None,
            actuator,
            sink,
            snapshot,
        }
    }

    pub fn with_policy(mut self, policy: ObservedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_state(&self) -> HeatingState {
        self.current
    }

    /// Handle to the values last pushed to the host.
    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    pub fn current_temperature(&self) -> f64 {
        match self.current {
            HeatingState::Heat => self.thresholds.heat,
            HeatingState::Off => self.thresholds.off,
        }
    }

    /// Single-point target: min = max = heat threshold.
    pub fn target_temperature(&self) -> f64 {
        self.thresholds.heat
    }

    /// State implied by the mode and the schedule at the clock's current time.
    pub fn expected_state(&self) -> HeatingState {
        let now = self.clock.now();
        let planned = must_heat(&self.schedule, now.weekday, now.time);
        debug!(
            "[{}] Schedule at day {} {}: planned heat = {}",
            self.name, now.weekday, now.time, planned
        );
        expected_state(self.mode, planned)
    }

    /// Change the user mode and re-evaluate immediately.
    pub fn set_mode(&mut self, mode: Mode) {
        info!("[{}] Target mode {} -> {}", self.name, self.mode, mode);
        self.mode = mode;
        self.refresh();
    }

    /// Re-evaluate the expected state and actuate if it differs from the
    /// current one. Always pushes the characteristics.
    pub fn refresh(&mut self) {
        let expected = self.expected_state();
        debug!(
            "[{}] Refresh current state: current={} expected={} mode={}",
            self.name, self.current, expected, self.mode
        );

        if expected != self.current {
            info!("[{}] Heating {} -> {}", self.name, self.current, expected);
            self.current = expected;
            self.commanded = Some(expected);
            self.actuator.apply(expected);
        }

        self.publish();
    }

    /// Take the device-reported state as current, then reconcile it against
    /// the expected state according to the policy.
    pub fn on_external_status(&mut self, observed_heating: bool) {
        let observed = HeatingState::from(observed_heating);
        if observed != self.current {
            info!("[{}] Device reports {} (was {})", self.name, observed, self.current);
        }
        self.current = observed;
        self.publish();

        if self.policy == ObservedPolicy::ObserveOnly {
            return;
        }

        let expected = self.expected_state();
        if expected == observed {
            self.commanded = None;
            return;
        }

        if self.policy == ObservedPolicy::EnforceOnce && self.commanded == Some(expected) {
            debug!(
                "[{}] {} already commanded, waiting for device",
                self.name, expected
            );
            return;
        }

        info!(
            "[{}] Device is {} but {} is expected, switching",
            self.name, observed, expected
        );
        self.commanded = Some(expected);
        self.actuator.apply(expected);
    }

    /// Push current state, current temperature and target temperature to the
    /// host and refresh the cached snapshot.
    pub fn publish(&self) {
        let current_temperature = self.current_temperature();
        let target_temperature = self.target_temperature();

        self.sink.set_current_heating_cooling_state(self.current);
        self.sink.set_current_temperature(current_temperature);
        self.sink.set_target_temperature(target_temperature);

        self.snapshot.store(ThermostatSnapshot {
            current_state: self.current,
            target_mode: self.mode,
            current_temperature,
            target_temperature,
        });
    }
}
