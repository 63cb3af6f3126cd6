use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::weekday::DayOfWeek;

/// A committed lesson as returned by `GetSemesterLessons`, with the display
/// labels denormalised so conflict reasons can be rendered without lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterLesson {
    pub date: NaiveDate,
    pub time_slot_id: i64,
    pub room_id: i64,
    pub room_name: String,
    pub class_id: i64,
    pub class_name: String,
    pub lecturer_id: i64,
    pub lecturer_label: String,
}

/// Lesson produced by the pattern expander. Never persisted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLesson {
    pub date: NaiveDate,
    pub weekday: DayOfWeek,
    pub time_slot_id: i64,
    pub room_id: i64,
    pub is_preview: bool,
}

/// Stored lesson row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    pub id: i64,
    pub batch_id: Option<String>,
    pub semester_id: i64,
    pub class_id: i64,
    pub lecturer_id: i64,
    pub room_id: i64,
    pub time_slot_id: i64,
    pub lesson_date: NaiveDate,
    pub created_at: String,
}
