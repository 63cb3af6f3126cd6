use chrono::{Datelike, Duration, NaiveDate};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::semester::SemesterRange;
use crate::models::weekday::DayOfWeek;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid date format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

/// Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = DayOfWeek::of(date).days_from_monday();
    shift(date, -back).unwrap_or(NaiveDate::MIN)
}

/// First date on or after `date` falling on `weekday`; the search never
/// looks further than six days ahead.
pub fn first_on_or_after(date: NaiveDate, weekday: DayOfWeek) -> Option<NaiveDate> {
    let current = DayOfWeek::of(date).days_from_monday();
    let offset = (weekday.days_from_monday() - current).rem_euclid(7);
    shift(date, offset)
}

pub fn iso_week(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

/// 1-based teaching week of `date` counted from the week holding the
/// semester start. Dates outside the range have no teaching week.
pub fn teaching_week(range: &SemesterRange, date: NaiveDate) -> Option<u32> {
    if !range.contains(date) {
        return None;
    }
    let days = (week_start(date) - week_start(range.start)).num_days();
    u32::try_from(days / 7 + 1).ok()
}

pub fn weeks_spanned(range: &SemesterRange) -> u32 {
    if range.is_empty() {
        return 0;
    }
    teaching_week(range, range.end).unwrap_or(0)
}
