//! Weekly heating schedule.
//!
//! A [`WeekSchedule`] maps a weekday index (0 = Sunday .. 6 = Saturday) to a
//! list of [`Interval`]s during which heating is planned. Intervals may wrap
//! past midnight: `22:00 -> 06:00` is active from 22:00 until 23:59 and from
//! 00:00 until (excluding) 06:00.

use crate::error::{HeatingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of minutes in a day.
const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock time with minute resolution.
///
/// Serialized as `HH:MM`. Parsing also accepts a single-digit hour (`6:30`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { minutes: 0 };
    pub const LAST_MINUTE: TimeOfDay = TimeOfDay {
        minutes: MINUTES_PER_DAY - 1,
    };

    /// Build a time from hour and minute, rejecting out-of-range values.
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(HeatingError::InvalidTimeOfDay(format!(
                "{}:{:02}",
                hour, minute
            )));
        }
        Ok(Self {
            minutes: hour as u16 * 60 + minute as u16,
        })
    }

    pub fn hour(&self) -> u8 {
        (self.minutes / 60) as u8
    }

    pub fn minute(&self) -> u8 {
        (self.minutes % 60) as u8
    }

    /// Minutes elapsed since midnight.
    pub fn minutes_since_midnight(&self) -> u16 {
        self.minutes
    }
}

impl FromStr for TimeOfDay {
    type Err = HeatingError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || HeatingError::InvalidTimeOfDay(s.to_string());

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = HeatingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// A heating interval within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    #[serde(rename = "start_time")]
    pub start: TimeOfDay,
    #[serde(rename = "end_time")]
    pub end: TimeOfDay,
}

impl Interval {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Whether the interval spans midnight.
    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    /// Whether `now` falls inside the interval.
    ///
    /// Non-wrapping intervals are half-open (`start <= now < end`), so an
    /// interval with `start == end` never matches.
    pub fn contains(&self, now: TimeOfDay) -> bool {
        if self.wraps() {
            (self.start <= now && now <= TimeOfDay::LAST_MINUTE)
                || (TimeOfDay::MIDNIGHT <= now && now < self.end)
        } else {
            self.start <= now && now < self.end
        }
    }
}

/// Heating intervals for one day. Overlaps are allowed.
pub type DaySchedule = Vec<Interval>;

/// Heating intervals per weekday index (0 = Sunday).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, DaySchedule>")]
pub struct WeekSchedule {
    days: BTreeMap<u8, DaySchedule>,
}

impl WeekSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the same day schedule to all seven weekdays.
    pub fn every_day(day: DaySchedule) -> Self {
        Self {
            days: (0..7).map(|weekday| (weekday, day.clone())).collect(),
        }
    }

    /// Set the schedule for one weekday.
    pub fn with_day(mut self, weekday: u8, day: DaySchedule) -> Result<Self> {
        if weekday > 6 {
            return Err(HeatingError::InvalidWeekday(weekday.to_string()));
        }
        self.days.insert(weekday, day);
        Ok(self)
    }

    pub fn day(&self, weekday: u8) -> Option<&DaySchedule> {
        self.days.get(&weekday)
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(Vec::is_empty)
    }
}

impl TryFrom<BTreeMap<String, DaySchedule>> for WeekSchedule {
    type Error = HeatingError;

    fn try_from(raw: BTreeMap<String, DaySchedule>) -> Result<Self> {
        let mut days = BTreeMap::new();
        for (key, day) in raw {
            let weekday: u8 = key
                .trim()
                .parse()
                .map_err(|_| HeatingError::InvalidWeekday(key.clone()))?;
            if weekday > 6 {
                return Err(HeatingError::InvalidWeekday(key));
            }
            days.insert(weekday, day);
        }
        Ok(Self { days })
    }
}

impl Serialize for WeekSchedule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let as_strings: BTreeMap<String, &DaySchedule> = self
            .days
            .iter()
            .map(|(weekday, day)| (weekday.to_string(), day))
            .collect();
        as_strings.serialize(serializer)
    }
}

/// Whether the schedule mandates heating on `weekday` at `now`.
pub fn must_heat(schedule: &WeekSchedule, weekday: u8, now: TimeOfDay) -> bool {
    schedule
        .day(weekday)
        .is_some_and(|day| day.iter().any(|interval| interval.contains(now)))
}
