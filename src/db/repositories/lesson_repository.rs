use std::collections::HashMap;
use std::convert::TryFrom;

use chrono::{NaiveDate, Utc};
use rusqlite::{named_params, Connection, Row};

use crate::error::AppResult;
use crate::models::lesson::{LessonRecord, SemesterLesson};
use crate::models::schedule::StudentScheduleCache;
use crate::models::slot_key::DateSlotKey;
use crate::services::calendar;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        batch_id,
        semester_id,
        class_id,
        lecturer_id,
        room_id,
        time_slot_id,
        lesson_date,
        created_at
    FROM lessons
"#;

const SEMESTER_LESSONS_SELECT: &str = r#"
    SELECT
        l.lesson_date,
        l.time_slot_id,
        l.room_id,
        r.name AS room_name,
        l.class_id,
        c.name AS class_name,
        l.lecturer_id,
        COALESCE(lec.title || ' ', '') || lec.full_name AS lecturer_label
    FROM lessons l
    JOIN rooms r ON r.id = l.room_id
    JOIN classes c ON c.id = l.class_id
    JOIN lecturers lec ON lec.id = l.lecturer_id
    WHERE l.semester_id = ?1
    ORDER BY l.lesson_date, l.time_slot_id, l.room_id
"#;

#[derive(Debug, Clone)]
pub struct LessonRow {
    pub id: i64,
    pub batch_id: Option<String>,
    pub semester_id: i64,
    pub class_id: i64,
    pub lecturer_id: i64,
    pub room_id: i64,
    pub time_slot_id: i64,
    pub lesson_date: String,
    pub created_at: String,
}

impl LessonRow {
    pub fn into_record(self) -> AppResult<LessonRecord> {
        Ok(LessonRecord {
            id: self.id,
            batch_id: self.batch_id,
            semester_id: self.semester_id,
            class_id: self.class_id,
            lecturer_id: self.lecturer_id,
            room_id: self.room_id,
            time_slot_id: self.time_slot_id,
            lesson_date: calendar::parse_date(&self.lesson_date)?,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for LessonRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(LessonRow {
            id: row.get("id")?,
            batch_id: row.get("batch_id")?,
            semester_id: row.get("semester_id")?,
            class_id: row.get("class_id")?,
            lecturer_id: row.get("lecturer_id")?,
            room_id: row.get("room_id")?,
            time_slot_id: row.get("time_slot_id")?,
            lesson_date: row.get("lesson_date")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SemesterLessonRow {
    pub lesson_date: String,
    pub time_slot_id: i64,
    pub room_id: i64,
    pub room_name: String,
    pub class_id: i64,
    pub class_name: String,
    pub lecturer_id: i64,
    pub lecturer_label: String,
}

impl SemesterLessonRow {
    pub fn into_model(self) -> AppResult<SemesterLesson> {
        Ok(SemesterLesson {
            date: calendar::parse_date(&self.lesson_date)?,
            time_slot_id: self.time_slot_id,
            room_id: self.room_id,
            room_name: self.room_name,
            class_id: self.class_id,
            class_name: self.class_name,
            lecturer_id: self.lecturer_id,
            lecturer_label: self.lecturer_label,
        })
    }
}

impl TryFrom<&Row<'_>> for SemesterLessonRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(SemesterLessonRow {
            lesson_date: row.get("lesson_date")?,
            time_slot_id: row.get("time_slot_id")?,
            room_id: row.get("room_id")?,
            room_name: row.get("room_name")?,
            class_id: row.get("class_id")?,
            class_name: row.get("class_name")?,
            lecturer_id: row.get("lecturer_id")?,
            lecturer_label: row.get("lecturer_label")?,
        })
    }
}

/// Fields of a lesson about to be inserted.
#[derive(Debug, Clone, Copy)]
pub struct NewLesson<'a> {
    pub batch_id: &'a str,
    pub semester_id: i64,
    pub class_id: i64,
    pub lecturer_id: i64,
    pub room_id: i64,
    pub time_slot_id: i64,
    pub lesson_date: NaiveDate,
}

pub struct LessonRepository;

impl LessonRepository {
    pub fn insert(conn: &Connection, lesson: &NewLesson<'_>) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO lessons (
                    batch_id,
                    semester_id,
                    class_id,
                    lecturer_id,
                    room_id,
                    time_slot_id,
                    lesson_date,
                    created_at
                ) VALUES (
                    :batch_id,
                    :semester_id,
                    :class_id,
                    :lecturer_id,
                    :room_id,
                    :time_slot_id,
                    :lesson_date,
                    :created_at
                )
            "#,
            named_params! {
                ":batch_id": lesson.batch_id,
                ":semester_id": lesson.semester_id,
                ":class_id": lesson.class_id,
                ":lecturer_id": lesson.lecturer_id,
                ":room_id": lesson.room_id,
                ":time_slot_id": lesson.time_slot_id,
                ":lesson_date": calendar::format_date(lesson.lesson_date),
                ":created_at": Utc::now().to_rfc3339(),
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Every committed lesson of the semester with display labels joined in.
    pub fn list_semester_lessons(conn: &Connection, semester_id: i64) -> AppResult<Vec<SemesterLesson>> {
        let mut stmt = conn.prepare(SEMESTER_LESSONS_SELECT)?;
        let rows = stmt
            .query_map([semester_id], |row| SemesterLessonRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(SemesterLessonRow::into_model).collect()
    }

    /// Lesson times of every student enrolled in `class_id`, across all of
    /// that student's classes in the semester.
    pub fn student_schedule_cache(
        conn: &Connection,
        class_id: i64,
        semester_id: i64,
    ) -> AppResult<StudentScheduleCache> {
        let mut roster_stmt = conn.prepare(
            "SELECT student_id FROM enrollments WHERE class_id = ?1 ORDER BY student_id",
        )?;
        let student_ids = roster_stmt
            .query_map([class_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT e.student_id, l.lesson_date, l.time_slot_id
            FROM enrollments e
            JOIN enrollments other ON other.student_id = e.student_id
            JOIN lessons l ON l.class_id = other.class_id AND l.semester_id = :semester_id
            WHERE e.class_id = :class_id
            ORDER BY e.student_id, l.lesson_date, l.time_slot_id
            "#,
        )?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":semester_id": semester_id,
                    ":class_id": class_id,
                },
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut student_time_map: HashMap<i64, Vec<String>> = HashMap::new();
        for (student_id, date, time_slot_id) in rows {
            let key = DateSlotKey::new(calendar::parse_date(&date)?, time_slot_id);
            student_time_map
                .entry(student_id)
                .or_default()
                .push(key.to_wire());
        }

        Ok(StudentScheduleCache {
            student_ids,
            student_time_map,
        })
    }

    pub fn list_by_batch(conn: &Connection, batch_id: &str) -> AppResult<Vec<LessonRecord>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE batch_id = ?1 ORDER BY lesson_date, time_slot_id",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([batch_id], |row| LessonRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(LessonRow::into_record).collect()
    }

    pub fn delete_batch(conn: &Connection, batch_id: &str) -> AppResult<usize> {
        Ok(conn.execute("DELETE FROM lessons WHERE batch_id = ?1", [batch_id])?)
    }

    pub fn count_for_class(conn: &Connection, class_id: i64, semester_id: i64) -> AppResult<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM lessons WHERE class_id = ?1 AND semester_id = ?2",
            [class_id, semester_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
