use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};

const WIRE_SEPARATOR: char = '|';

/// One room at one time slot on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
    pub date: NaiveDate,
    pub time_slot_id: i64,
    pub room_id: i64,
}

impl SlotKey {
    pub fn new(date: NaiveDate, time_slot_id: i64, room_id: i64) -> Self {
        Self {
            date,
            time_slot_id,
            room_id,
        }
    }

    pub fn time(&self) -> DateSlotKey {
        DateSlotKey::new(self.date, self.time_slot_id)
    }
}

/// A time slot on a date, regardless of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSlotKey {
    pub date: NaiveDate,
    pub time_slot_id: i64,
}

impl DateSlotKey {
    pub fn new(date: NaiveDate, time_slot_id: i64) -> Self {
        Self { date, time_slot_id }
    }

    /// Parses the boundary's `"YYYY-MM-DD|<timeSlotId>"` form.
    pub fn parse_wire(raw: &str) -> AppResult<Self> {
        let invalid = |reason: &str| {
            AppError::validation_with_details(
                "invalid student schedule entry",
                json!({"value": raw, "reason": reason}),
            )
        };

        let (date, slot) = raw
            .split_once(WIRE_SEPARATOR)
            .ok_or_else(|| invalid("missing separator"))?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| invalid("bad date"))?;
        let time_slot_id = slot
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("bad time slot id"))?;
        Ok(Self::new(date, time_slot_id))
    }

    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DateSlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.date.format("%Y-%m-%d"),
            WIRE_SEPARATOR,
            self.time_slot_id
        )
    }
}
