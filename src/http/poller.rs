//! Device status polling.

use super::StatusPath;
use crate::error::{HeatingError, Result};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

/// Fetches the device status and decides whether it reports heating.
///
/// Cheap to clone; every tick polls from its own task with its own clone.
#[derive(Clone)]
pub struct StatusPoller {
    name: Arc<str>,
    client: reqwest::Client,
    url: Arc<str>,
    path: Arc<StatusPath>,
    heating_value: Arc<Value>,
}

impl StatusPoller {
    pub fn new(
        name: impl Into<Arc<str>>,
        client: reqwest::Client,
        url: impl Into<Arc<str>>,
        path: StatusPath,
        heating_value: Value,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            url: url.into(),
            path: Arc::new(path),
            heating_value: Arc::new(heating_value),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the status URL and evaluate the body.
    ///
    /// Transport errors, non-success statuses and non-JSON bodies are errors.
    /// A body in which the path matches nothing reports "not heating".
    pub async fn poll(&self) -> Result<bool> {
        let http_error = |source| HeatingError::Http {
            url: self.url.to_string(),
            source,
        };

        let body = self
            .client
            .get(&*self.url)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?
            .text()
            .await
            .map_err(http_error)?;

        debug!("[{}] Status from {}: {}", self.name, self.url, body);
        self.evaluate(&body)
    }

    /// Whether `body` reports heating.
    pub fn evaluate(&self, body: &str) -> Result<bool> {
        let document: Value = serde_json::from_str(body)?;
        Ok(self.path.matches(&document, &self.heating_value))
    }
}
