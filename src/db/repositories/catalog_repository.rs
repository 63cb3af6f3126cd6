use std::convert::TryFrom;

use chrono::NaiveTime;
use rusqlite::{named_params, Connection, Row};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::room::{Room, TimeSlot};

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone)]
pub struct TimeSlotRow {
    pub id: i64,
    pub label: String,
    pub start_time: String,
    pub end_time: String,
}

impl TimeSlotRow {
    pub fn into_model(self) -> AppResult<TimeSlot> {
        Ok(TimeSlot {
            id: self.id,
            label: self.label,
            start_time: parse_time(&self.start_time)?,
            end_time: parse_time(&self.end_time)?,
        })
    }
}

impl TryFrom<&Row<'_>> for TimeSlotRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TimeSlotRow {
            id: row.get("id")?,
            label: row.get("label")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
        })
    }
}

/// Rooms and time slots, the fixed grid patterns are placed on.
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn insert_room(conn: &Connection, name: &str, is_active: bool) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO rooms (name, is_active) VALUES (:name, :is_active)",
            named_params! {
                ":name": name,
                ":is_active": is_active as i64,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_rooms(conn: &Connection) -> AppResult<Vec<Room>> {
        let mut stmt = conn.prepare("SELECT id, name, is_active FROM rooms ORDER BY id")?;
        let rooms = stmt
            .query_map([], |row| {
                Ok(Room {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    is_active: row.get::<_, i64>("is_active")? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rooms)
    }

    pub fn insert_time_slot(
        conn: &Connection,
        label: &str,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> AppResult<i64> {
        if start_time >= end_time {
            return Err(AppError::validation_with_details(
                "time slot must end after it starts",
                json!({"label": label}),
            ));
        }
        conn.execute(
            "INSERT INTO time_slots (label, start_time, end_time) VALUES (:label, :start_time, :end_time)",
            named_params! {
                ":label": label,
                ":start_time": start_time.format(TIME_FORMAT).to_string(),
                ":end_time": end_time.format(TIME_FORMAT).to_string(),
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_time_slots(conn: &Connection) -> AppResult<Vec<TimeSlot>> {
        let mut stmt =
            conn.prepare("SELECT id, label, start_time, end_time FROM time_slots ORDER BY start_time, id")?;
        let rows = stmt
            .query_map([], |row| TimeSlotRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TimeSlotRow::into_model).collect()
    }
}

fn parse_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid time format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}
