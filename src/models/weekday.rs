use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("weekday number {0} is outside 2..=8")]
pub struct InvalidDayOfWeek(pub u8);

/// Weekday number in the timetable convention: Monday = 2 through
/// Saturday = 7, Sunday = 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const MONDAY: DayOfWeek = DayOfWeek(2);
    pub const TUESDAY: DayOfWeek = DayOfWeek(3);
    pub const WEDNESDAY: DayOfWeek = DayOfWeek(4);
    pub const THURSDAY: DayOfWeek = DayOfWeek(5);
    pub const FRIDAY: DayOfWeek = DayOfWeek(6);
    pub const SATURDAY: DayOfWeek = DayOfWeek(7);
    pub const SUNDAY: DayOfWeek = DayOfWeek(8);

    pub const ALL: [DayOfWeek; 7] = [
        Self::MONDAY,
        Self::TUESDAY,
        Self::WEDNESDAY,
        Self::THURSDAY,
        Self::FRIDAY,
        Self::SATURDAY,
        Self::SUNDAY,
    ];

    pub fn new(number: u8) -> Result<Self, InvalidDayOfWeek> {
        if (2..=8).contains(&number) {
            Ok(Self(number))
        } else {
            Err(InvalidDayOfWeek(number))
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Offset from the Monday that starts the week (Monday = 0, Sunday = 6).
    pub fn days_from_monday(self) -> i64 {
        i64::from(self.0 - 2)
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            2 => "Monday",
            3 => "Tuesday",
            4 => "Wednesday",
            5 => "Thursday",
            6 => "Friday",
            7 => "Saturday",
            _ => "Sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        Self(weekday.num_days_from_monday() as u8 + 2)
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day.0 {
            2 => Weekday::Mon,
            3 => Weekday::Tue,
            4 => Weekday::Wed,
            5 => Weekday::Thu,
            6 => Weekday::Fri,
            7 => Weekday::Sat,
            _ => Weekday::Sun,
        }
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = InvalidDayOfWeek;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(day: DayOfWeek) -> Self {
        day.0
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
