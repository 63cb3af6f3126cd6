use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Semester {
    pub fn range(&self) -> SemesterRange {
        SemesterRange::new(self.start_date, self.end_date)
    }
}

/// Inclusive date range of a semester. A range whose start is after its end
/// is empty rather than invalid, so expansion and probing yield nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SemesterRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Holiday dates of one semester. A date in here is never eligible for a lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    dates: BTreeMap<NaiveDate, String>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_holidays<I>(holidays: I) -> Self
    where
        I: IntoIterator<Item = Holiday>,
    {
        let dates = holidays
            .into_iter()
            .map(|holiday| (holiday.date, holiday.name))
            .collect();
        Self { dates }
    }

    pub fn from_dates<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            dates: dates.into_iter().map(|date| (date, String::new())).collect(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains_key(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
