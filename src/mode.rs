//! User-selected operating mode and the resulting heating state.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Operating mode chosen by the user.
///
/// Text forms are case-insensitive in config and on the console alike.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
    Off,
    Heat,
    /// Follow the weekly schedule.
    #[default]
    Auto,
}

impl TryFrom<String> for Mode {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

/// Commanded state of the heating system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HeatingState {
    #[default]
    Off,
    Heat,
}

impl From<bool> for HeatingState {
    fn from(heating: bool) -> Self {
        if heating {
            HeatingState::Heat
        } else {
            HeatingState::Off
        }
    }
}

/// State implied by `mode` given whether the schedule plans heating now.
pub fn expected_state(mode: Mode, planned_heat: bool) -> HeatingState {
    match mode {
        Mode::Off => HeatingState::Off,
        Mode::Heat => HeatingState::Heat,
        Mode::Auto => HeatingState::from(planned_heat),
    }
}
