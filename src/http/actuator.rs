//! Device actuation over HTTP.

use crate::accessory::Actuator;
use crate::error::{HeatingError, Result};
use crate::mode::HeatingState;
use log::{error, info};
use std::sync::Arc;

/// Sends `GET heat_url` / `GET off_url` when the heating state changes.
#[derive(Clone)]
pub struct HttpActuator {
    name: Arc<str>,
    client: reqwest::Client,
    heat_url: Arc<str>,
    off_url: Arc<str>,
}

impl HttpActuator {
    pub fn new(
        name: impl Into<Arc<str>>,
        client: reqwest::Client,
        heat_url: impl Into<Arc<str>>,
        off_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            heat_url: heat_url.into(),
            off_url: off_url.into(),
        }
    }

    pub fn url_for(&self, state: HeatingState) -> &str {
        match state {
            HeatingState::Heat => &self.heat_url,
            HeatingState::Off => &self.off_url,
        }
    }

    /// Issue the command for `state` and wait for the response.
    pub async fn send(&self, state: HeatingState) -> Result<()> {
        let url = self.url_for(state);
        let http_error = |source| HeatingError::Http {
            url: url.to_string(),
            source,
        };
        self.client
            .get(url)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?;
        Ok(())
    }
}

impl Actuator for HttpActuator {
    /// Fire-and-forget: the outcome is only logged, never retried.
    fn apply(&self, state: HeatingState) {
        let actuator = self.clone();
        tokio::spawn(async move {
            match actuator.send(state).await {
                Ok(()) => info!("[{}] Device switched to {}", actuator.name, state),
                Err(e) => error!("[{}] Failed to switch device to {}: {}", actuator.name, state, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubDevice;
    use std::time::Duration;

    fn actuator() -> HttpActuator {
        HttpActuator::new(
            "test",
            reqwest::Client::new(),
            "http://127.0.0.1:1/heat",
            "http://127.0.0.1:1/off",
        )
    }

    #[test]
    fn test_url_per_state() {
        let actuator = actuator();
        assert_eq!(actuator.url_for(HeatingState::Heat), "http://127.0.0.1:1/heat");
        assert_eq!(actuator.url_for(HeatingState::Off), "http://127.0.0.1:1/off");
    }

    #[tokio::test]
    async fn test_send_reports_transport_failure() {
        let err = actuator().send(HeatingState::Heat).await.unwrap_err();
        match err {
            HeatingError::Http { url, .. } => assert_eq!(url, "http://127.0.0.1:1/heat"),
            other => panic!("unexpected error: {other}"),
        }
    }

    fn stub_actuator(device: &StubDevice) -> HttpActuator {
        HttpActuator::new(
            "test",
            reqwest::Client::new(),
            device.url("/heat"),
            device.url("/off"),
        )
    }

    #[tokio::test]
    async fn test_send_hits_url_for_state() {
        let device = StubDevice::start().await;
        let actuator = stub_actuator(&device);

        assert!(actuator.send(HeatingState::Heat).await.is_ok());
        assert!(actuator.send(HeatingState::Off).await.is_ok());

        assert_eq!(device.requests(), vec!["/heat", "/off"]);
    }

    #[tokio::test]
    async fn test_send_reports_error_status() {
        let device = StubDevice::start().await;
        device.respond(503, "");

        let err = stub_actuator(&device).send(HeatingState::Off).await.unwrap_err();
        match err {
            HeatingError::Http { url, .. } => assert_eq!(url, device.url("/off")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_apply_sends_in_background() {
        let device = StubDevice::start().await;

        stub_actuator(&device).apply(HeatingState::Heat);

        for _ in 0..200 {
            if device.count("/heat") == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("heat command never reached the device");
    }

    #[tokio::test]
    async fn test_apply_does_not_block_on_failure() {
        // returns immediately even though the request will fail
        actuator().apply(HeatingState::Off);
        tokio::task::yield_now().await;
    }
}
