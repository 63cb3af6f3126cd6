use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::lesson::SemesterLesson;
use crate::models::pattern::WeeklyPattern;
use crate::models::room::{Room, TimeSlot};
use crate::models::semester::{Holiday, Semester};
use crate::models::weekday::DayOfWeek;

/// Per-student occupied lesson times as delivered by the persistence
/// boundary. Entries use the wire format `"YYYY-MM-DD|<timeSlotId>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentScheduleCache {
    pub student_ids: Vec<i64>,
    pub student_time_map: HashMap<i64, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoster {
    pub class_id: i64,
    pub class_name: String,
    pub student_ids: Vec<i64>,
    pub required_lesson_count: usize,
}

/// Semester, rooms and time slots, loaded once per scheduling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCatalog {
    pub semester: Semester,
    pub rooms: Vec<Room>,
    pub time_slots: Vec<TimeSlot>,
}

impl ScheduleCatalog {
    pub fn active_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(|room| room.is_active)
    }

    pub fn room(&self, room_id: i64) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == room_id)
    }

    pub fn time_slot(&self, time_slot_id: i64) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|slot| slot.id == time_slot_id)
    }

    pub fn room_name(&self, room_id: i64) -> String {
        self.room(room_id)
            .map(|room| room.name.clone())
            .unwrap_or_else(|| format!("room #{room_id}"))
    }

    pub fn time_slot_label(&self, time_slot_id: i64) -> String {
        self.time_slot(time_slot_id)
            .map(TimeSlot::display_label)
            .unwrap_or_else(|| format!("slot #{time_slot_id}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub semester_id: i64,
    pub class_id: i64,
    pub lecturer_id: i64,
    pub patterns: Vec<WeeklyPattern>,
    pub required_lesson_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleResult {
    pub lessons_created_count: usize,
    pub lessons_skipped_count: usize,
    pub batch_id: String,
}

/// Why one pattern cannot be placed: it has no conflict-free date left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetail {
    pub weekday: DayOfWeek,
    pub time_slot_id: i64,
    pub room_id: i64,
    pub time_slot_label: String,
    pub room_name: String,
    /// Distinct room, class and lecturer clashes found across the semester.
    pub reasons: Vec<String>,
    /// Dates rejected only because an enrolled student is already busy.
    pub student_clash_dates: usize,
    pub message: String,
}

/// Which of semester, class and lecturer the user has picked so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSelection {
    pub semester_id: Option<i64>,
    pub class_id: Option<i64>,
    pub lecturer_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleScope {
    pub semester_id: i64,
    pub class_id: i64,
    pub lecturer_id: i64,
}

impl ScheduleSelection {
    pub fn require(&self) -> AppResult<ScheduleScope> {
        let semester_id = self
            .semester_id
            .ok_or_else(|| AppError::missing_selection("semester"))?;
        let class_id = self
            .class_id
            .ok_or_else(|| AppError::missing_selection("class"))?;
        let lecturer_id = self
            .lecturer_id
            .ok_or_else(|| AppError::missing_selection("lecturer"))?;
        Ok(ScheduleScope {
            semester_id,
            class_id,
            lecturer_id,
        })
    }
}

/// Partial weekday/slot/room choice made in the pattern form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionSelection {
    pub weekday: Option<DayOfWeek>,
    pub time_slot_id: Option<i64>,
    pub room_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableOptions {
    pub weekdays: Vec<DayOfWeek>,
    pub time_slot_ids: Vec<i64>,
    pub room_ids: Vec<i64>,
}

/// Read and write contract of the persistence boundary. The engine only
/// consumes snapshots through it; it never owns persistence.
#[async_trait::async_trait]
pub trait ScheduleBoundary: Send + Sync {
    async fn get_catalog(&self, semester_id: i64) -> AppResult<ScheduleCatalog>;

    async fn get_semester_lessons(&self, semester_id: i64) -> AppResult<Vec<SemesterLesson>>;

    async fn get_holidays(&self, semester_id: i64) -> AppResult<Vec<Holiday>>;

    async fn get_student_schedule_cache(
        &self,
        class_id: i64,
        semester_id: i64,
    ) -> AppResult<StudentScheduleCache>;

    async fn get_class_roster(&self, class_id: i64) -> AppResult<ClassRoster>;

    async fn create_schedule(
        &self,
        request: CreateScheduleRequest,
    ) -> AppResult<CreateScheduleResult>;
}
