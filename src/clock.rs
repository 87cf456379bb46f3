//! Time sources for schedule evaluation.
//!
//! The schedule only needs a weekday index (0 = Sunday) and a time of day.
//! [`SystemClock`] reads the local wall clock; [`SimulatedClock`] advances one
//! hour every time it is read, which makes a full day of schedule transitions
//! observable in a couple of minutes when paired with a short refresh interval.

use crate::schedule::TimeOfDay;
use chrono::{Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// A point in the week as seen by the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekTime {
    /// 0 = Sunday .. 6 = Saturday
    pub weekday: u8,
    pub time: TimeOfDay,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> WeekTime;
}

/// Local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> WeekTime {
        let now = Local::now();
        WeekTime {
            weekday: now.weekday().num_days_from_sunday() as u8,
            // chrono guarantees hour < 24 and minute < 60
            time: TimeOfDay::new(now.hour() as u8, now.minute() as u8)
                .unwrap_or(TimeOfDay::MIDNIGHT),
        }
    }
}

/// Clock that jumps forward one hour on every reading.
///
/// The first reading is 01:00 on `start_weekday`; after 23:00 it rolls over
/// to 00:00 of the next weekday.
#[derive(Debug)]
pub struct SimulatedClock {
    start_weekday: u8,
    readings: AtomicU32,
}

impl SimulatedClock {
    pub fn new(start_weekday: u8) -> Self {
        Self {
            start_weekday: start_weekday % 7,
            readings: AtomicU32::new(0),
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> WeekTime {
        let hours = self.readings.fetch_add(1, Ordering::SeqCst) + 1;
        let days = hours / 24;
        WeekTime {
            weekday: ((self.start_weekday as u32 + days) % 7) as u8,
            time: TimeOfDay::new((hours % 24) as u8, 0).unwrap_or(TimeOfDay::MIDNIGHT),
        }
    }
}

/// Which clock an accessory evaluates its schedule against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockKind {
    #[default]
    System,
    Simulated,
}

impl ClockKind {
    pub fn build(self) -> Box<dyn Clock> {
        match self {
            ClockKind::System => Box::new(SystemClock),
            ClockKind::Simulated => {
                Box::new(SimulatedClock::new(Local::now().weekday().num_days_from_sunday() as u8))
            }
        }
    }
}
