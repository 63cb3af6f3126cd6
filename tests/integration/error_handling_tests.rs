// Error handling and edge case tests for the command surface

mod common;

use academic_scheduler_lib::commands::schedule::{
    schedule_batch_delete, schedule_options, schedule_pattern_add, schedule_pattern_remove,
    schedule_preview, schedule_session_close, schedule_session_open, schedule_submit,
    schedule_validate,
};
use academic_scheduler_lib::commands::{AppState, CommandError};
use academic_scheduler_lib::config::AppConfig;
use academic_scheduler_lib::db::repositories::class_repository::ClassRepository;
use academic_scheduler_lib::error::AppError;
use academic_scheduler_lib::models::access::{Actor, Role};
use academic_scheduler_lib::models::pattern::WeeklyPattern;
use academic_scheduler_lib::models::schedule::{OptionSelection, ScheduleSelection};
use academic_scheduler_lib::models::weekday::DayOfWeek;
use common::{setup_campus, Campus};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

fn setup_state() -> (AppState, Campus, TempDir) {
    let (campus, dir) = setup_campus();
    let state = AppState::new(campus.pool.clone(), &AppConfig::default()).expect("app state");
    (state, campus, dir)
}

async fn open(state: &AppState, campus: &Campus, class_id: i64, lecturer_id: i64) -> String {
    schedule_session_open(state, campus.selection(class_id, lecturer_id))
        .await
        .expect("open session")
        .session_id
}

#[tokio::test]
async fn test_missing_selection_is_reported_per_field() {
    let (state, campus, _dir) = setup_state();

    let selection = ScheduleSelection {
        semester_id: Some(campus.semester_id),
        class_id: None,
        lecturer_id: Some(campus.lecturer_an),
    };
    let err = schedule_session_open(&state, selection)
        .await
        .expect_err("class missing");
    assert_eq!(err.code, "MISSING_SELECTION");
    assert_eq!(
        err.details.as_ref().and_then(|d| d["field"].as_str()),
        Some("class")
    );

    let err = schedule_session_open(&state, ScheduleSelection::default())
        .await
        .expect_err("nothing selected");
    assert_eq!(
        err.details.as_ref().and_then(|d| d["field"].as_str()),
        Some("semester")
    );
}

#[tokio::test]
async fn test_unknown_records_map_to_not_found() {
    let (state, campus, _dir) = setup_state();

    let selection = ScheduleSelection {
        semester_id: Some(999),
        class_id: Some(campus.class_cs),
        lecturer_id: Some(campus.lecturer_an),
    };
    let err = schedule_session_open(&state, selection)
        .await
        .expect_err("unknown semester");
    assert_eq!(err.code, "NOT_FOUND");

    let err = schedule_preview(&state, "no-such-session".to_string(), false)
        .await
        .expect_err("unknown session");
    assert_eq!(err.code, "NOT_FOUND");

    let session_id = open(&state, &campus, campus.class_cs, campus.lecturer_an).await;
    let err = schedule_pattern_remove(&state, session_id, DayOfWeek::MONDAY, campus.morning)
        .await
        .expect_err("nothing to remove");
    assert_eq!(err.code, "NOT_FOUND");
}

#[tokio::test]
async fn test_duplicate_weekday_and_slot_rejected() {
    let (state, campus, _dir) = setup_state();
    let session_id = open(&state, &campus, campus.class_cs, campus.lecturer_an).await;

    let patterns = schedule_pattern_add(
        &state,
        session_id.clone(),
        WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a),
    )
    .await
    .expect("first pattern");
    assert_eq!(patterns.len(), 1);

    let err = schedule_pattern_add(
        &state,
        session_id.clone(),
        WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_b),
    )
    .await
    .expect_err("same weekday and slot");
    assert_eq!(err.code, "DUPLICATE_PATTERN");
    let details = err.details.expect("duplicate details");
    assert_eq!(details["timeSlotId"].as_i64(), Some(campus.morning));

    let patterns = schedule_pattern_add(
        &state,
        session_id,
        WeeklyPattern::new(DayOfWeek::MONDAY, campus.midday, campus.room_b),
    )
    .await
    .expect("different slot");
    assert_eq!(patterns.len(), 2);
}

#[tokio::test]
async fn test_inactive_room_is_a_validation_error() {
    let (state, campus, _dir) = setup_state();
    let session_id = open(&state, &campus, campus.class_cs, campus.lecturer_an).await;

    let err = schedule_pattern_add(
        &state,
        session_id,
        WeeklyPattern::new(DayOfWeek::TUESDAY, campus.morning, campus.room_closed),
    )
    .await
    .expect_err("inactive room");
    assert_eq!(err.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_insufficient_lessons_reports_counts() {
    let (state, campus, _dir) = setup_state();
    let thesis = campus
        .pool
        .with_connection(|conn| {
            let subject = ClassRepository::insert_subject(conn, "Thesis seminar", 20)?;
            ClassRepository::insert_class(conn, "TS900", subject)
        })
        .expect("thesis class");

    let session_id = open(&state, &campus, thesis, campus.lecturer_binh).await;
    schedule_pattern_add(
        &state,
        session_id.clone(),
        WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a),
    )
    .await
    .expect("pattern");

    let report = schedule_validate(&state, session_id.clone())
        .await
        .expect("validate");
    assert_eq!(report.required_lessons, 20);
    assert_eq!(report.generated_lessons, 12);
    assert!(report.conflicts.is_empty());

    let err = schedule_submit(&state, session_id, Actor::new(Role::Admin, 1))
        .await
        .expect_err("too few lessons");
    assert_eq!(err.code, "INSUFFICIENT_LESSONS");
    let details = err.details.expect("count details");
    assert_eq!(details["required"].as_u64(), Some(20));
    assert_eq!(details["generated"].as_u64(), Some(12));
}

#[tokio::test]
async fn test_blocked_pattern_reports_no_available_date() {
    let (state, campus, _dir) = setup_state();
    let office = Actor::new(Role::AcademicOffice, 1);

    let cs = open(&state, &campus, campus.class_cs, campus.lecturer_an).await;
    schedule_pattern_add(
        &state,
        cs.clone(),
        WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a),
    )
    .await
    .expect("cs pattern");
    schedule_submit(&state, cs, office).await.expect("cs schedule");

    let math = open(&state, &campus, campus.class_math, campus.lecturer_binh).await;
    let options = schedule_options(
        &state,
        math.clone(),
        OptionSelection {
            weekday: Some(DayOfWeek::MONDAY),
            time_slot_id: Some(campus.morning),
            room_id: Some(campus.room_a),
        },
    )
    .await
    .expect("options");
    assert!(options.weekdays.is_empty());
    assert!(options.room_ids.is_empty());

    schedule_pattern_add(
        &state,
        math.clone(),
        WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a),
    )
    .await
    .expect("pattern is accepted");
    let err = schedule_submit(&state, math, office)
        .await
        .expect_err("room booked all semester");
    assert_eq!(err.code, "NO_AVAILABLE_DATE");
    let details = err.details.expect("conflict details");
    let patterns = details["patterns"].as_array().expect("pattern list");
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0]["roomName"].as_str(), Some("A101"));
}

#[tokio::test]
async fn test_roles_are_checked_before_commit() {
    let (state, campus, _dir) = setup_state();
    let session_id = open(&state, &campus, campus.class_cs, campus.lecturer_an).await;
    schedule_pattern_add(
        &state,
        session_id.clone(),
        WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a),
    )
    .await
    .expect("pattern");

    let err = schedule_submit(&state, session_id.clone(), Actor::new(Role::Student, 7))
        .await
        .expect_err("students cannot schedule");
    assert_eq!(err.code, "PERMISSION_DENIED");

    let err = schedule_submit(
        &state,
        session_id.clone(),
        Actor::new(Role::Lecturer, campus.lecturer_binh),
    )
    .await
    .expect_err("lecturers schedule only themselves");
    assert_eq!(err.code, "PERMISSION_DENIED");

    let result = schedule_submit(
        &state,
        session_id.clone(),
        Actor::new(Role::Lecturer, campus.lecturer_an),
    )
    .await
    .expect("own schedule");
    assert_eq!(result.lessons_created_count, 12);

    let err = schedule_batch_delete(
        &state,
        Actor::new(Role::Lecturer, campus.lecturer_an),
        result.batch_id.clone(),
    )
    .await
    .expect_err("lecturers cannot delete batches");
    assert_eq!(err.code, "PERMISSION_DENIED");

    let removed = schedule_batch_delete(&state, Actor::new(Role::Admin, 1), result.batch_id)
        .await
        .expect("admin deletes batch");
    assert_eq!(removed, 12);

    assert!(schedule_session_close(&state, session_id.clone())
        .await
        .expect("close"));
    assert!(!schedule_session_close(&state, session_id)
        .await
        .expect("close twice"));
}

#[tokio::test]
async fn test_busy_session_does_not_block_other_sessions() {
    let (state, campus, _dir) = setup_state();
    let busy = open(&state, &campus, campus.class_cs, campus.lecturer_an).await;
    let handle = state
        .sessions()
        .lock()
        .await
        .get(&busy)
        .cloned()
        .expect("registered session");
    // Stands in for a submit that is waiting on the database.
    let held = handle.lock().await;

    let other = timeout(
        Duration::from_secs(5),
        open(&state, &campus, campus.class_math, campus.lecturer_binh),
    )
    .await
    .expect("registry is free while a session is busy");
    let preview = timeout(Duration::from_secs(5), schedule_preview(&state, other, false))
        .await
        .expect("other sessions are free")
        .expect("preview");
    assert!(preview.is_empty());

    let blocked = timeout(
        Duration::from_millis(50),
        schedule_preview(&state, busy.clone(), false),
    )
    .await;
    assert!(blocked.is_err());

    drop(held);
    let preview = schedule_preview(&state, busy, false).await.expect("preview");
    assert!(preview.is_empty());
}

#[tokio::test]
async fn test_empty_pattern_list_cannot_be_submitted() {
    let (state, campus, _dir) = setup_state();
    let session_id = open(&state, &campus, campus.class_cs, campus.lecturer_an).await;

    let err = schedule_submit(&state, session_id, Actor::new(Role::Admin, 1))
        .await
        .expect_err("no patterns");
    assert_eq!(err.code, "VALIDATION_ERROR");
}

#[test]
fn test_invalid_weekday_config_fails_state_creation() {
    let (campus, _dir) = setup_campus();
    let config = AppConfig::from_yaml("weekdays: [2, 9]").expect("parse config");

    let result = AppState::new(campus.pool.clone(), &config);
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn test_internal_errors_are_opaque_to_callers() {
    let err = CommandError::from(AppError::config("missing data dir"));
    assert_eq!(err.code, "UNKNOWN");
    assert!(err.details.is_none());

    let err = CommandError::from(AppError::database("disk I/O error"));
    assert_eq!(err.code, "UNKNOWN");

    let err = CommandError::from(AppError::conflict("room already booked"));
    assert_eq!(err.code, "CONFLICT");
}
