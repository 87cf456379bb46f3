//! Starts one accessory per configured device.

use crate::accessory::HeatingAccessory;
use crate::config::{Config, DeviceConfig};
use crate::error::HeatingError;
use crate::host::CharacteristicSink;
use log::{error, info, warn};
use std::sync::Arc;

pub struct Platform {
    accessories: Vec<(String, HeatingAccessory)>,
}

impl Platform {
    /// Start every valid device in `config`.
    ///
    /// Devices with a duplicate id or an invalid config are logged and
    /// skipped; the others still start. `make_sink` provides the host sink for
    /// each device.
    pub fn start<F>(config: &Config, mut make_sink: F) -> Self
    where
        F: FnMut(&DeviceConfig) -> Arc<dyn CharacteristicSink>,
    {
        let mut accessories: Vec<(String, HeatingAccessory)> = Vec::new();

        for device in &config.devices {
            if accessories.iter().any(|(id, _)| id == &device.id) {
                error!("{}", HeatingError::DuplicateDevice(device.id.clone()));
                continue;
            }

            match HeatingAccessory::start(&device.name, &device.config, make_sink(device)) {
                Ok(accessory) => {
                    info!("Added accessory: {} ({})", device.name, device.id);
                    accessories.push((device.id.clone(), accessory));
                }
                Err(e) => error!("Skipping accessory {} ({}): {}", device.name, device.id, e),
            }
        }

        if accessories.is_empty() {
            warn!("No accessories configured");
        }

        Self { accessories }
    }

    pub fn accessory(&self, id: &str) -> Option<&HeatingAccessory> {
        self.accessories
            .iter()
            .find(|(accessory_id, _)| accessory_id == id)
            .map(|(_, accessory)| accessory)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.accessories.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    /// Stop all accessories.
    pub async fn shutdown(mut self) {
        for (_, accessory) in &mut self.accessories {
            accessory.shutdown().await;
        }
    }
}
