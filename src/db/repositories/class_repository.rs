use rusqlite::{named_params, Connection, OptionalExtension};

use crate::error::AppResult;
use crate::models::schedule::ClassRoster;

/// Subjects, classes, lecturers, students and enrollments.
pub struct ClassRepository;

impl ClassRepository {
    pub fn insert_subject(conn: &Connection, name: &str, required_lesson_count: usize) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO subjects (name, required_lesson_count) VALUES (:name, :required)",
            named_params! {
                ":name": name,
                ":required": required_lesson_count as i64,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_class(conn: &Connection, name: &str, subject_id: i64) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO classes (name, subject_id) VALUES (:name, :subject_id)",
            named_params! {
                ":name": name,
                ":subject_id": subject_id,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_lecturer(conn: &Connection, full_name: &str, title: Option<&str>) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO lecturers (full_name, title) VALUES (:full_name, :title)",
            named_params! {
                ":full_name": full_name,
                ":title": title,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_student(conn: &Connection, full_name: &str) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO students (full_name) VALUES (?1)",
            [full_name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn enroll(conn: &Connection, class_id: i64, student_id: i64) -> AppResult<()> {
        conn.execute(
            "INSERT OR IGNORE INTO enrollments (class_id, student_id) VALUES (?1, ?2)",
            [class_id, student_id],
        )?;
        Ok(())
    }

    pub fn find_roster(conn: &Connection, class_id: i64) -> AppResult<Option<ClassRoster>> {
        let header = conn
            .query_row(
                r#"
                SELECT c.name, s.required_lesson_count
                FROM classes c
                JOIN subjects s ON s.id = c.subject_id
                WHERE c.id = ?1
                "#,
                [class_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((class_name, required)) = header else {
            return Ok(None);
        };

        Ok(Some(ClassRoster {
            class_id,
            class_name,
            student_ids: Self::list_student_ids(conn, class_id)?,
            required_lesson_count: usize::try_from(required).unwrap_or(0),
        }))
    }

    pub fn list_student_ids(conn: &Connection, class_id: i64) -> AppResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT student_id FROM enrollments WHERE class_id = ?1 ORDER BY student_id",
        )?;
        let ids = stmt
            .query_map([class_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn lecturer_exists(conn: &Connection, lecturer_id: i64) -> AppResult<bool> {
        let found = conn
            .query_row("SELECT 1 FROM lecturers WHERE id = ?1", [lecturer_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }
}
