use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::AppResult;
use crate::models::lesson::SemesterLesson;
use crate::models::schedule::{ScheduleBoundary, StudentScheduleCache};
use crate::models::semester::{Holiday, HolidayCalendar, Semester, SemesterRange};
use crate::services::conflict_index::ConflictIndex;
use crate::services::student_occupancy::StudentOccupancy;

/// Everything the availability filter and validator read for one
/// (semester, class) pair. Never mutated; a refresh builds a new one.
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub semester_id: i64,
    pub class_id: i64,
    pub range: SemesterRange,
    pub holidays: HolidayCalendar,
    pub conflicts: ConflictIndex,
    pub students: StudentOccupancy,
    pub built_at: DateTime<Utc>,
}

impl ScheduleSnapshot {
    pub fn new(
        semester: &Semester,
        class_id: i64,
        holidays: &[Holiday],
        lessons: &[SemesterLesson],
        student_cache: &StudentScheduleCache,
    ) -> AppResult<Self> {
        Ok(Self {
            semester_id: semester.id,
            class_id,
            range: semester.range(),
            holidays: HolidayCalendar::from_holidays(holidays.iter().cloned()),
            conflicts: ConflictIndex::build(lessons),
            students: StudentOccupancy::build(student_cache)?,
            built_at: Utc::now(),
        })
    }

    /// Pulls fresh lessons, holidays and student times from the boundary.
    pub async fn load(
        boundary: &dyn ScheduleBoundary,
        semester: &Semester,
        class_id: i64,
    ) -> AppResult<Self> {
        let (lessons, holidays, student_cache) = tokio::try_join!(
            boundary.get_semester_lessons(semester.id),
            boundary.get_holidays(semester.id),
            boundary.get_student_schedule_cache(class_id, semester.id),
        )?;

        let snapshot = Self::new(semester, class_id, &holidays, &lessons, &student_cache)?;
        info!(
            target: "app::schedule",
            semester_id = semester.id,
            class_id,
            lessons = snapshot.conflicts.len(),
            holidays = snapshot.holidays.len(),
            "schedule snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Snapshot with no committed lessons or busy students; handy for
    /// previews before anything is loaded.
    pub fn empty(semester: &Semester, class_id: i64) -> Self {
        Self {
            semester_id: semester.id,
            class_id,
            range: semester.range(),
            holidays: HolidayCalendar::new(),
            conflicts: ConflictIndex::default(),
            students: StudentOccupancy::default(),
            built_at: Utc::now(),
        }
    }
}
