use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::semester::{Holiday, Semester};
use crate::services::calendar;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        name,
        start_date,
        end_date
    FROM semesters
"#;

#[derive(Debug, Clone)]
pub struct SemesterRow {
    pub id: i64,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

impl SemesterRow {
    pub fn into_model(self) -> AppResult<Semester> {
        Ok(Semester {
            id: self.id,
            name: self.name,
            start_date: calendar::parse_date(&self.start_date)?,
            end_date: calendar::parse_date(&self.end_date)?,
        })
    }
}

impl TryFrom<&Row<'_>> for SemesterRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(SemesterRow {
            id: row.get("id")?,
            name: row.get("name")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
        })
    }
}

pub struct SemesterRepository;

impl SemesterRepository {
    pub fn insert(conn: &Connection, name: &str, start: NaiveDate, end: NaiveDate) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO semesters (name, start_date, end_date) VALUES (:name, :start_date, :end_date)",
            named_params! {
                ":name": name,
                ":start_date": calendar::format_date(start),
                ":end_date": calendar::format_date(end),
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<Semester>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| SemesterRow::try_from(row))
            .optional()?;
        row.map(SemesterRow::into_model).transpose()
    }

    pub fn insert_holiday(
        conn: &Connection,
        semester_id: i64,
        date: NaiveDate,
        name: &str,
    ) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO holidays (semester_id, holiday_date, name) VALUES (:semester_id, :holiday_date, :name)",
            named_params! {
                ":semester_id": semester_id,
                ":holiday_date": calendar::format_date(date),
                ":name": name,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_holidays(conn: &Connection, semester_id: i64) -> AppResult<Vec<Holiday>> {
        let mut stmt = conn.prepare(
            "SELECT holiday_date, name FROM holidays WHERE semester_id = ?1 ORDER BY holiday_date",
        )?;
        let rows = stmt
            .query_map([semester_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(date, name)| {
                Ok(Holiday {
                    date: calendar::parse_date(&date)?,
                    name,
                })
            })
            .collect()
    }
}
