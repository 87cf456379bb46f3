//! Line-based command input for the standalone binary.
//!
//! Stands in for the hub's command source: `<device-id> off|heat|auto`
//! changes a device's mode, `<device-id> status` prints its cached state.

use crate::accessory::HeatingAccessory;
use crate::error::{HeatingError, Result};
use crate::mode::Mode;
use crate::platform::Platform;
use log::{info, warn};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    SetMode { device: String, mode: Mode },
    Status { device: String },
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Option<std::result::Result<Self, ParseError>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut words = line.split_whitespace();
        let (Some(device), Some(action), None) = (words.next(), words.next(), words.next()) else {
            return Some(Err(ParseError(line.to_string())));
        };
        let device = device.to_string();

        if action.eq_ignore_ascii_case("status") {
            return Some(Ok(ConsoleCommand::Status { device }));
        }
        Some(
            action
                .parse::<Mode>()
                .map(|mode| ConsoleCommand::SetMode { device, mode })
                .map_err(|_| ParseError(line.to_string())),
        )
    }

    /// Run the command against the platform.
    pub async fn execute(&self, platform: &Platform) -> Result<()> {
        match self {
            ConsoleCommand::SetMode { device, mode } => {
                let accessory = lookup(platform, device)?;
                info!("[{}] Mode change requested: {}", accessory.name(), mode);
                accessory.set_mode(*mode).await
            }
            ConsoleCommand::Status { device } => {
                let accessory = lookup(platform, device)?;
                let snapshot = accessory.snapshot();
                info!(
                    "[{}] mode={} state={} current={:.1}°C target={:.1}°C",
                    accessory.name(),
                    snapshot.target_mode,
                    snapshot.current_state,
                    snapshot.current_temperature,
                    snapshot.target_temperature
                );
                Ok(())
            }
        }
    }
}

fn lookup<'a>(platform: &'a Platform, device: &str) -> Result<&'a HeatingAccessory> {
    platform.accessory(device).ok_or_else(|| {
        warn!(
            "Unknown device '{}', known: {}",
            device,
            platform.ids().collect::<Vec<_>>().join(", ")
        );
        HeatingError::UnknownDevice(device.to_string())
    })
}

/// Line that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot parse '{}', expected '<device-id> off|heat|auto|status'",
            self.0
        )
    }
}

impl std::error::Error for ParseError {}
