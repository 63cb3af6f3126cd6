use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::catalog_repository::CatalogRepository;
use crate::db::repositories::class_repository::ClassRepository;
use crate::db::repositories::lesson_repository::{LessonRepository, NewLesson};
use crate::db::repositories::semester_repository::SemesterRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::lesson::{LessonRecord, SemesterLesson};
use crate::models::schedule::{
    ClassRoster, CreateScheduleRequest, CreateScheduleResult, ScheduleBoundary, ScheduleCatalog,
    StudentScheduleCache,
};
use crate::models::semester::Holiday;
use crate::services::schedule_snapshot::ScheduleSnapshot;
use crate::services::schedule_validator::{self, ScheduleValidator};

/// SQLite side of the scheduling boundary. `create_schedule` is the
/// authoritative conflict check: it re-derives dates and re-checks them
/// inside one immediate transaction.
#[derive(Clone)]
pub struct SqliteScheduleStore {
    db: DbPool,
}

impl SqliteScheduleStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    async fn blocking<F, T>(&self, task: F) -> AppResult<T>
    where
        F: FnOnce(&DbPool) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || task(&db))
            .await
            .map_err(|err| AppError::other(format!("database task failed: {err}")))?
    }

    /// Removes every lesson created by one `create_schedule` call.
    pub async fn delete_batch(&self, batch_id: String) -> AppResult<usize> {
        self.blocking(move |db| {
            db.with_transaction(|tx| {
                let removed = LessonRepository::delete_batch(tx, &batch_id)?;
                if removed == 0 {
                    return Err(AppError::not_found());
                }
                info!(target: "app::db", %batch_id, removed, "lesson batch deleted");
                Ok(removed)
            })
        })
        .await
    }

    pub async fn lessons_in_batch(&self, batch_id: String) -> AppResult<Vec<LessonRecord>> {
        self.blocking(move |db| db.with_connection(|conn| LessonRepository::list_by_batch(conn, &batch_id)))
            .await
    }
}

#[async_trait::async_trait]
impl ScheduleBoundary for SqliteScheduleStore {
    async fn get_catalog(&self, semester_id: i64) -> AppResult<ScheduleCatalog> {
        self.blocking(move |db| {
            db.with_connection(|conn| {
                let semester =
                    SemesterRepository::find_by_id(conn, semester_id)?.ok_or_else(AppError::not_found)?;
                Ok(ScheduleCatalog {
                    semester,
                    rooms: CatalogRepository::list_rooms(conn)?,
                    time_slots: CatalogRepository::list_time_slots(conn)?,
                })
            })
        })
        .await
    }

    async fn get_semester_lessons(&self, semester_id: i64) -> AppResult<Vec<SemesterLesson>> {
        self.blocking(move |db| {
            db.with_connection(|conn| LessonRepository::list_semester_lessons(conn, semester_id))
        })
        .await
    }

    async fn get_holidays(&self, semester_id: i64) -> AppResult<Vec<Holiday>> {
        self.blocking(move |db| {
            db.with_connection(|conn| SemesterRepository::list_holidays(conn, semester_id))
        })
        .await
    }

    async fn get_student_schedule_cache(
        &self,
        class_id: i64,
        semester_id: i64,
    ) -> AppResult<StudentScheduleCache> {
        self.blocking(move |db| {
            db.with_connection(|conn| {
                LessonRepository::student_schedule_cache(conn, class_id, semester_id)
            })
        })
        .await
    }

    async fn get_class_roster(&self, class_id: i64) -> AppResult<ClassRoster> {
        self.blocking(move |db| {
            db.with_connection(|conn| {
                ClassRepository::find_roster(conn, class_id)?.ok_or_else(AppError::not_found)
            })
        })
        .await
    }

    async fn create_schedule(
        &self,
        request: CreateScheduleRequest,
    ) -> AppResult<CreateScheduleResult> {
        self.blocking(move |db| db.with_transaction(|tx| commit_schedule(tx, &request)))
            .await
    }
}

fn commit_schedule(
    conn: &rusqlite::Connection,
    request: &CreateScheduleRequest,
) -> AppResult<CreateScheduleResult> {
    if request.patterns.is_empty() {
        return Err(AppError::validation("schedule request has no patterns"));
    }
    schedule_validator::ensure_unique(&request.patterns)?;

    let semester =
        SemesterRepository::find_by_id(conn, request.semester_id)?.ok_or_else(AppError::not_found)?;
    if ClassRepository::find_roster(conn, request.class_id)?.is_none() {
        return Err(AppError::not_found());
    }
    if !ClassRepository::lecturer_exists(conn, request.lecturer_id)? {
        return Err(AppError::not_found());
    }

    let catalog = ScheduleCatalog {
        semester: semester.clone(),
        rooms: CatalogRepository::list_rooms(conn)?,
        time_slots: CatalogRepository::list_time_slots(conn)?,
    };
    let snapshot = ScheduleSnapshot::new(
        &semester,
        request.class_id,
        &SemesterRepository::list_holidays(conn, semester.id)?,
        &LessonRepository::list_semester_lessons(conn, semester.id)?,
        &LessonRepository::student_schedule_cache(conn, request.class_id, semester.id)?,
    )?;

    let validator =
        ScheduleValidator::new(&snapshot, &catalog, request.class_id, request.lecturer_id);
    let plan = validator.plan_commit(&request.patterns, request.required_lesson_count);

    if !plan.blocked.is_empty() {
        warn!(
            target: "app::db",
            class_id = request.class_id,
            blocked = plan.blocked.len(),
            "schedule rejected by authoritative conflict check"
        );
        return Err(AppError::conflict_with_details(
            format!("{} pattern(s) have no conflict-free date left", plan.blocked.len()),
            json!({ "patterns": plan.blocked }),
        ));
    }

    let batch_id = Uuid::new_v4().to_string();
    for lesson in &plan.lessons {
        LessonRepository::insert(
            conn,
            &NewLesson {
                batch_id: &batch_id,
                semester_id: semester.id,
                class_id: request.class_id,
                lecturer_id: request.lecturer_id,
                room_id: lesson.room_id,
                time_slot_id: lesson.time_slot_id,
                lesson_date: lesson.date,
            },
        )?;
    }

    let result = CreateScheduleResult {
        lessons_created_count: plan.lessons.len(),
        lessons_skipped_count: plan.skipped,
        batch_id,
    };
    debug!(
        target: "app::db",
        class_id = request.class_id,
        created = result.lessons_created_count,
        skipped = result.lessons_skipped_count,
        batch_id = %result.batch_id,
        "lessons inserted"
    );
    Ok(result)
}
