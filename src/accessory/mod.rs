//! Heating thermostat accessory.
//!
//! Each accessory runs one task that owns its [`StateReconciler`]. Timer
//! ticks, user mode changes and poll results all arrive on that task, so
//! reconciliation passes never interleave. HTTP calls are spawned and never
//! awaited by the loop.

mod reconciler;

pub use reconciler::{ObservedPolicy, StateReconciler};

use crate::config::HeatingAccessoryConfig;
use crate::error::{HeatingError, Result};
use crate::host::{CharacteristicSink, SharedSnapshot, ThermostatSnapshot};
use crate::http::{self, HttpActuator, StatusPath, StatusPoller};
use crate::mode::{HeatingState, Mode};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Carries out a newly decided heating state.
///
/// Implementations must return immediately; any I/O runs in the background
/// and its outcome is only logged.
pub trait Actuator: Send + Sync {
    fn apply(&self, state: HeatingState);
}

/// Actuator for schedule-only accessories, which have no device to drive.
pub struct NoopActuator {
    name: String,
}

impl NoopActuator {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Actuator for NoopActuator {
    fn apply(&self, state: HeatingState) {
        debug!("[{}] No device configured, {} not sent", self.name, state);
    }
}

/// Source of the current state on every tick.
pub enum Backend {
    /// Re-evaluate schedule and mode.
    Schedule,
    /// Poll the device; its answer becomes the current state.
    Polling(StatusPoller),
}

pub struct HeatingAccessory {
    name: String,
    modes: mpsc::Sender<Mode>,
    snapshot: SharedSnapshot,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HeatingAccessory {
    /// Build an accessory from its config and start its periodic task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        name: impl Into<String>,
        config: &HeatingAccessoryConfig,
        sink: Arc<dyn CharacteristicSink>,
    ) -> Result<Self> {
        let name = name.into();
        config.validate()?;

        let thresholds = config.thresholds();
        let schedule = config.week_schedule();
        if schedule.is_empty() {
            info!("[{}] No heating schedule configured", name);
        }

        let (actuator, backend, policy): (Arc<dyn Actuator>, Backend, ObservedPolicy) =
            match &config.http {
                Some(endpoints) => {
                    let client = http::build_client(endpoints.request_timeout())?;
                    let poller = StatusPoller::new(
                        name.as_str(),
                        client.clone(),
                        endpoints.status_url.as_str(),
                        StatusPath::parse(&endpoints.status_path)?,
                        endpoints.status_value.clone(),
                    );
                    let actuator = HttpActuator::new(
                        name.as_str(),
                        client,
                        endpoints.heat_url.as_str(),
                        endpoints.off_url.as_str(),
                    );
                    (Arc::new(actuator), Backend::Polling(poller), endpoints.policy)
                }
                None => (
                    Arc::new(NoopActuator::new(name.as_str())),
                    Backend::Schedule,
                    ObservedPolicy::default(),
                ),
            };

        let reconciler = StateReconciler::new(
            name.as_str(),
            schedule,
            config.clock.build(),
            thresholds,
            config.mode,
            actuator,
            sink,
        )
        .with_policy(policy);

        info!(
            "[{}] Starting: mode={} heat={}°C off={}°C every {}s{}",
            name,
            config.mode,
            thresholds.heat,
            thresholds.off,
            config.refresh_interval().as_secs(),
            match &backend {
                Backend::Polling(poller) => format!(", polling {}", poller.url()),
                Backend::Schedule => String::new(),
            }
        );

        Ok(Self::spawn(reconciler, backend, config.refresh_interval()))
    }

    /// Start the periodic task for an already assembled reconciler.
    ///
    /// The first tick fires immediately.
    pub fn spawn(reconciler: StateReconciler, backend: Backend, interval: Duration) -> Self {
        let name = reconciler.name().to_string();
        let snapshot = reconciler.snapshot();
        let (modes_tx, modes_rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(reconciler, backend, interval, modes_rx, cancel.clone()));

        Self {
            name,
            modes: modes_tx,
            snapshot,
            cancel,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a user mode change. It is applied on the accessory task.
    pub async fn set_mode(&self, mode: Mode) -> Result<()> {
        self.modes
            .send(mode)
            .await
            .map_err(|_| HeatingError::AccessoryStopped)
    }

    /// Values last pushed to the host.
    pub fn snapshot(&self) -> ThermostatSnapshot {
        self.snapshot.get()
    }

    /// Answer for a pull-style current temperature read.
    pub fn current_temperature(&self) -> f64 {
        self.snapshot.get().current_temperature
    }

    pub fn target_mode(&self) -> Mode {
        self.snapshot.get().target_mode
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the periodic task and wait for it to exit.
    ///
    /// HTTP requests already in flight are left to finish on their own.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!("[{}] Accessory task failed: {}", self.name, e);
        }
        info!("[{}] Stopped", self.name);
    }
}

impl Drop for HeatingAccessory {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut reconciler: StateReconciler,
    backend: Backend,
    interval: Duration,
    mut modes: mpsc::Receiver<Mode>,
    cancel: CancellationToken,
) {
    let (status_tx, mut status_rx) = mpsc::channel::<bool>(8);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if matches!(backend, Backend::Polling(_)) {
        // show something consistent until the first poll answers
        reconciler.publish();
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => match &backend {
                Backend::Schedule => reconciler.refresh(),
                Backend::Polling(poller) => {
                    spawn_poll(reconciler.name().to_string(), poller.clone(), status_tx.clone());
                }
            },
            Some(mode) = modes.recv() => reconciler.set_mode(mode),
            Some(observed) = status_rx.recv() => reconciler.on_external_status(observed),
        }
    }

    debug!("[{}] Accessory loop exited", reconciler.name());
}

fn spawn_poll(name: String, poller: StatusPoller, results: mpsc::Sender<bool>) {
    tokio::spawn(async move {
        match poller.poll().await {
            Ok(heating) => {
                if results.send(heating).await.is_err() {
                    debug!("[{}] Accessory stopped, dropping poll result", name);
                }
            }
            Err(e) => error!("[{}] Failed to poll device status: {}", name, e),
        }
    });
}


#[cfg(test)]
mod tests {
    use super::testing::{FixedClock, RecordingActuator, RecordingSink};
    use super::*;
    use crate::config::{DeviceEndpoints, Thresholds};
    use crate::http::testing::StubDevice;
    use crate::schedule::{Interval, TimeOfDay, WeekSchedule};
    use tokio_test::assert_ok;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..300 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    fn scheduled_accessory(
        mode: Mode,
        clock: FixedClock,
    ) -> (HeatingAccessory, Arc<RecordingActuator>, Arc<RecordingSink>) {
        let actuator = Arc::new(RecordingActuator::default());
        let sink = Arc::new(RecordingSink::default());
        let reconciler = StateReconciler::new(
            "test",
            WeekSchedule::every_day(vec![Interval::new(t("06:00"), t("12:00"))]),
            Box::new(clock),
            Thresholds { off: 15.0, heat: 19.0 },
            mode,
            actuator.clone(),
            sink.clone(),
        );
        let accessory = HeatingAccessory::spawn(reconciler, Backend::Schedule, Duration::from_secs(3600));
        (accessory, actuator, sink)
    }

    #[tokio::test]
    async fn test_first_tick_refreshes_immediately() {
        let (mut accessory, actuator, sink) =
            scheduled_accessory(Mode::Auto, FixedClock::new(1, t("08:00")));

        wait_until(|| !sink.pushes().is_empty()).await;
        assert_eq!(accessory.snapshot().current_state, HeatingState::Heat);
        assert_eq!(accessory.current_temperature(), 19.0);
        assert_eq!(actuator.calls(), vec![HeatingState::Heat]);

        accessory.shutdown().await;
        assert!(!accessory.is_running());
    }

    #[tokio::test]
    async fn test_mode_changes_are_applied_in_order() {
        let (mut accessory, actuator, _sink) =
            scheduled_accessory(Mode::Auto, FixedClock::new(1, t("20:00")));

        assert_ok!(accessory.set_mode(Mode::Heat).await);
        assert_ok!(accessory.set_mode(Mode::Heat).await);
        assert_ok!(accessory.set_mode(Mode::Off).await);

        wait_until(|| accessory.target_mode() == Mode::Off).await;
        assert_eq!(accessory.snapshot().current_state, HeatingState::Off);
        assert_eq!(actuator.calls(), vec![HeatingState::Heat, HeatingState::Off]);

        accessory.shutdown().await;
    }

    #[tokio::test]
    async fn test_set_mode_after_shutdown_fails() {
        let (mut accessory, _actuator, _sink) =
            scheduled_accessory(Mode::Auto, FixedClock::new(1, t("08:00")));

        accessory.shutdown().await;
        let result = accessory.set_mode(Mode::Heat).await;
        assert!(matches!(result, Err(HeatingError::AccessoryStopped)));
    }

    fn polling_config(device: &StubDevice, mode: Mode) -> HeatingAccessoryConfig {
        HeatingAccessoryConfig {
            mode,
            refresh_interval_secs: 1,
            http: Some(DeviceEndpoints {
                heat_url: device.url("/heat"),
                off_url: device.url("/off"),
                status_url: device.url("/status"),
                status_path: "$.state".to_string(),
                status_value: serde_json::json!("on"),
                policy: ObservedPolicy::Enforce,
                request_timeout_secs: Some(1),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_last_observed_state() {
        let device = StubDevice::start().await;
        device.respond(200, r#"{"state":"on"}"#);
        let sink = Arc::new(RecordingSink::default());
        let mut accessory =
            HeatingAccessory::start("boiler", &polling_config(&device, Mode::Heat), sink).unwrap();

        wait_until(|| accessory.snapshot().current_state == HeatingState::Heat).await;

        device.respond(500, "");
        wait_until(|| device.count("/status") >= 2).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = accessory.snapshot();
        assert_eq!(snapshot.current_state, HeatingState::Heat);
        assert_eq!(snapshot.current_temperature, 19.0);
        assert_eq!(device.count("/heat"), 0);

        accessory.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_device_leaves_initial_state() {
        let config = HeatingAccessoryConfig {
            mode: Mode::Heat,
            http: Some(DeviceEndpoints {
                heat_url: "http://127.0.0.1:1/heat".to_string(),
                off_url: "http://127.0.0.1:1/off".to_string(),
                status_url: "http://127.0.0.1:1/status".to_string(),
                status_path: "$.state".to_string(),
                status_value: serde_json::json!("on"),
                policy: ObservedPolicy::Enforce,
                request_timeout_secs: Some(1),
            }),
            ..Default::default()
        };
        let sink = Arc::new(RecordingSink::default());
        let mut accessory = HeatingAccessory::start("boiler", &config, sink.clone()).unwrap();

        wait_until(|| !sink.pushes().is_empty()).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = accessory.snapshot();
        assert_eq!(snapshot.current_state, HeatingState::Off);
        assert_eq!(snapshot.current_temperature, 15.5);
        assert_eq!(snapshot.target_temperature, 19.0);
        assert_eq!(sink.pushes().len(), 1);

        accessory.shutdown().await;
    }

    #[tokio::test]
    async fn test_mode_change_commands_device() {
        let device = StubDevice::start().await;
        device.respond(200, r#"{"state":"on"}"#);
        let sink = Arc::new(RecordingSink::default());
        let mut accessory =
            HeatingAccessory::start("boiler", &polling_config(&device, Mode::Heat), sink).unwrap();

        wait_until(|| accessory.snapshot().current_state == HeatingState::Heat).await;
        assert_ok!(accessory.set_mode(Mode::Off).await);

        wait_until(|| device.count("/off") >= 1).await;
        assert_eq!(accessory.target_mode(), Mode::Off);
        assert_eq!(device.count("/heat"), 0);

        accessory.shutdown().await;
    }

    #[tokio::test]
    async fn test_device_is_recommanded_while_it_disagrees() {
        let device = StubDevice::start().await;
        // the device ignores heat commands
        device.respond(200, r#"{"state":"off"}"#);
        let sink = Arc::new(RecordingSink::default());
        let mut accessory =
            HeatingAccessory::start("boiler", &polling_config(&device, Mode::Heat), sink).unwrap();

        wait_until(|| device.count("/heat") >= 2).await;
        assert_eq!(accessory.snapshot().current_state, HeatingState::Off);

        accessory.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let config = HeatingAccessoryConfig {
            http: Some(DeviceEndpoints {
                heat_url: "http://127.0.0.1:1/heat".to_string(),
                off_url: "http://127.0.0.1:1/off".to_string(),
                status_url: "http://127.0.0.1:1/status".to_string(),
                status_path: "$[".to_string(),
                status_value: serde_json::json!("on"),
                policy: ObservedPolicy::Enforce,
                request_timeout_secs: None,
            }),
            ..Default::default()
        };
        let sink = Arc::new(RecordingSink::default());
        assert!(HeatingAccessory::start("bad", &config, sink).is_err());
    }
}
