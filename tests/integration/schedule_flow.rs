// End-to-end scheduling against a seeded SQLite campus

mod common;

use academic_scheduler_lib::db::repositories::lesson_repository::{LessonRepository, NewLesson};
use academic_scheduler_lib::db::repositories::semester_repository::SemesterRepository;
use academic_scheduler_lib::error::AppError;
use academic_scheduler_lib::models::access::{Actor, Role};
use academic_scheduler_lib::models::pattern::WeeklyPattern;
use academic_scheduler_lib::models::schedule::{
    CreateScheduleRequest, OptionSelection, ScheduleBoundary,
};
use academic_scheduler_lib::models::weekday::DayOfWeek;
use academic_scheduler_lib::services::availability::AvailabilityFilter;
use common::{date, setup_campus, Campus};

fn office() -> Actor {
    Actor::new(Role::AcademicOffice, 1)
}

/// Books `room_id` in the morning slot for CS101 on the given dates.
fn book_cs_mornings(
    campus: &Campus,
    semester_id: i64,
    room_id: i64,
    dates: &[chrono::NaiveDate],
) {
    campus
        .pool
        .with_transaction(|tx| {
            for &lesson_date in dates {
                LessonRepository::insert(
                    tx,
                    &NewLesson {
                        batch_id: "manual",
                        semester_id,
                        class_id: campus.class_cs,
                        lecturer_id: campus.lecturer_an,
                        room_id,
                        time_slot_id: campus.morning,
                        lesson_date,
                    },
                )?;
            }
            Ok(())
        })
        .expect("manual booking");
}

#[tokio::test]
async fn test_full_schedule_flow_commits_capped_batch() {
    let (campus, _dir) = setup_campus();
    let store = campus.store();
    let mut session = campus
        .open_session(&store, campus.class_cs, campus.lecturer_an)
        .await
        .expect("open session");

    assert_eq!(session.roster().class_name, "CS101");
    assert_eq!(session.roster().required_lesson_count, 12);
    assert_eq!(session.roster().student_ids.len(), 2);

    session
        .add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a))
        .expect("monday pattern");

    let mondays = session.preview(false);
    assert_eq!(mondays.len(), 12);
    assert!(mondays.iter().all(|lesson| lesson.date != date(2, 12)));
    assert!(mondays.iter().all(|lesson| lesson.is_preview));

    session
        .add_pattern(WeeklyPattern::new(DayOfWeek::WEDNESDAY, campus.morning, campus.room_a))
        .expect("wednesday pattern");

    assert_eq!(session.preview(false).len(), 25);
    let capped = session.preview(true);
    assert_eq!(capped.len(), 12);
    assert_eq!(capped.first().map(|l| l.date), Some(date(1, 1)));
    assert_eq!(capped.get(1).map(|l| l.date), Some(date(1, 3)));
    assert_eq!(capped.last().map(|l| l.date), Some(date(2, 7)));

    let options = session.options(&OptionSelection {
        weekday: Some(DayOfWeek::MONDAY),
        ..OptionSelection::default()
    });
    assert_eq!(options.weekdays, vec![DayOfWeek::MONDAY]);
    assert_eq!(options.time_slot_ids, vec![campus.midday]);
    assert_eq!(options.room_ids, vec![campus.room_a, campus.room_b]);

    let report = session.validate();
    assert!(report.is_clean());
    assert_eq!(report.required_lessons, 12);
    assert_eq!(report.generated_lessons, 25);

    let result = session.submit(&office()).await.expect("submit schedule");
    assert_eq!(result.lessons_created_count, 12);
    assert_eq!(result.lessons_skipped_count, 0);
    assert!(session.patterns().is_empty());
    assert_eq!(session.snapshot().conflicts.len(), 12);

    let batch = store
        .lessons_in_batch(result.batch_id.clone())
        .await
        .expect("batch lessons");
    assert_eq!(batch.len(), 12);
    assert_eq!(batch.first().map(|l| l.lesson_date), Some(date(1, 1)));
    assert_eq!(batch.last().map(|l| l.lesson_date), Some(date(2, 7)));
    assert!(batch
        .iter()
        .all(|l| l.room_id == campus.room_a && l.batch_id.as_deref() == Some(result.batch_id.as_str())));

    let removed = store
        .delete_batch(result.batch_id.clone())
        .await
        .expect("delete batch");
    assert_eq!(removed, 12);

    let remaining = campus
        .pool
        .with_connection(|conn| LessonRepository::count_for_class(conn, campus.class_cs, campus.semester_id))
        .expect("count lessons");
    assert_eq!(remaining, 0);

    let again = store.delete_batch(result.batch_id).await;
    assert!(matches!(again, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_booked_room_blocks_pattern_until_room_changes() {
    let (campus, _dir) = setup_campus();
    let store = campus.store();

    let mut cs = campus
        .open_session(&store, campus.class_cs, campus.lecturer_an)
        .await
        .expect("open cs session");
    cs.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a))
        .expect("cs pattern");
    cs.submit(&office()).await.expect("cs schedule");

    let mut math = campus
        .open_session(&store, campus.class_math, campus.lecturer_binh)
        .await
        .expect("open math session");

    let options = math.options(&OptionSelection {
        weekday: Some(DayOfWeek::MONDAY),
        time_slot_id: Some(campus.morning),
        room_id: None,
    });
    assert_eq!(options.room_ids, vec![campus.room_b]);

    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a))
        .expect("pattern is accepted before validation");

    let report = math.validate();
    assert!(!report.is_clean());
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.conflicts[0]
        .reasons
        .iter()
        .any(|reason| reason == "Room A101 is already booked by class CS101"));

    let err = math.submit(&office()).await.expect_err("blocked pattern");
    match err {
        AppError::NoAvailableDate { details } => {
            assert_eq!(details.len(), 1);
            assert_eq!(details[0].room_name, "A101");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    math.remove_pattern(DayOfWeek::MONDAY, campus.morning)
        .expect("remove pattern");
    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_b))
        .expect("other room");
    let result = math.submit(&office()).await.expect("math schedule");
    assert_eq!(result.lessons_created_count, 6);
}

#[tokio::test]
async fn test_lecturer_cannot_teach_two_classes_at_once() {
    let (campus, _dir) = setup_campus();
    let store = campus.store();

    let mut cs = campus
        .open_session(&store, campus.class_cs, campus.lecturer_an)
        .await
        .expect("open cs session");
    cs.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a))
        .expect("cs pattern");
    cs.submit(&office()).await.expect("cs schedule");

    let mut math = campus
        .open_session(&store, campus.class_math, campus.lecturer_an)
        .await
        .expect("open math session");
    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_b))
        .expect("math pattern");

    let report = math.validate();
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.conflicts[0]
        .reasons
        .iter()
        .any(|reason| reason == "Lecturer Dr. An Nguyen is teaching class CS101 in room A101"));

    let snapshot = math.snapshot();
    let filter = AvailabilityFilter::new(&snapshot, campus.class_math, campus.lecturer_an);
    assert_eq!(
        filter.first_available_date(DayOfWeek::MONDAY, campus.midday, campus.room_b),
        Some(date(1, 1))
    );
    assert!(!filter.has_available_date(DayOfWeek::MONDAY, campus.morning, campus.room_b));
}

#[tokio::test]
async fn test_shared_student_blocks_overlapping_slot() {
    let (campus, _dir) = setup_campus();
    campus
        .enroll(campus.class_math, campus.student_shared)
        .expect("enroll shared student");
    let store = campus.store();

    let mut cs = campus
        .open_session(&store, campus.class_cs, campus.lecturer_an)
        .await
        .expect("open cs session");
    cs.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a))
        .expect("cs pattern");
    cs.submit(&office()).await.expect("cs schedule");

    let mut math = campus
        .open_session(&store, campus.class_math, campus.lecturer_binh)
        .await
        .expect("open math session");

    let snapshot = math.snapshot();
    assert_eq!(
        snapshot.students.busy_students(date(1, 1), campus.morning),
        &[campus.student_shared]
    );
    assert!(!snapshot.students.has_conflict(date(1, 1), campus.midday));

    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_b))
        .expect("math pattern");
    let report = math.validate();
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].student_clash_dates, 12);
    assert!(report.conflicts[0]
        .reasons
        .iter()
        .any(|reason| reason == "Enrolled students are already busy on 12 date(s)"));

    math.remove_pattern(DayOfWeek::MONDAY, campus.morning)
        .expect("remove pattern");
    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.midday, campus.room_b))
        .expect("midday pattern");
    assert!(math.validate().is_clean());
    let result = math.submit(&office()).await.expect("math schedule");
    assert_eq!(result.lessons_created_count, 6);
}

#[tokio::test]
async fn test_changing_class_resets_patterns_and_roster() {
    let (campus, _dir) = setup_campus();
    let store = campus.store();
    let mut session = campus
        .open_session(&store, campus.class_cs, campus.lecturer_an)
        .await
        .expect("open session");

    session
        .add_pattern(WeeklyPattern::new(DayOfWeek::FRIDAY, campus.midday, campus.room_b))
        .expect("pattern");
    session
        .change_class(campus.class_math)
        .await
        .expect("change class");

    assert!(session.patterns().is_empty());
    assert_eq!(session.roster().class_name, "MA201");
    assert_eq!(session.roster().required_lesson_count, 6);
    assert_eq!(session.scope().class_id, campus.class_math);
    assert_eq!(session.snapshot().class_id, campus.class_math);

    session.change_lecturer(campus.lecturer_binh);
    assert_eq!(session.scope().lecturer_id, campus.lecturer_binh);
}

#[tokio::test]
async fn test_inactive_room_is_never_offered() {
    let (campus, _dir) = setup_campus();
    let store = campus.store();
    let mut session = campus
        .open_session(&store, campus.class_cs, campus.lecturer_an)
        .await
        .expect("open session");

    let options = session.options(&OptionSelection::default());
    assert_eq!(options.weekdays, DayOfWeek::ALL.to_vec());
    assert!(!options.room_ids.contains(&campus.room_closed));

    let err = session
        .add_pattern(WeeklyPattern::new(DayOfWeek::TUESDAY, campus.morning, campus.room_closed))
        .expect_err("inactive room");
    assert!(matches!(err, AppError::Validation { .. }));
    assert!(session.patterns().is_empty());
}

#[tokio::test]
async fn test_pattern_blocked_inside_capped_window_is_reported() {
    let (campus, _dir) = setup_campus();
    // Wednesday Jan 24 onwards stays free, but MA201 needs only six
    // lessons, all of which land by Wednesday Jan 17.
    book_cs_mornings(
        &campus,
        campus.semester_id,
        campus.room_a,
        &[date(1, 3), date(1, 10), date(1, 17)],
    );
    let store = campus.store();

    let mut math = campus
        .open_session(&store, campus.class_math, campus.lecturer_binh)
        .await
        .expect("open math session");
    let monday = WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a);
    let wednesday = WeeklyPattern::new(DayOfWeek::WEDNESDAY, campus.morning, campus.room_a);
    math.add_pattern(monday).expect("monday pattern");
    math.add_pattern(wednesday).expect("wednesday pattern");

    let snapshot = math.snapshot();
    let filter = AvailabilityFilter::new(&snapshot, campus.class_math, campus.lecturer_binh);
    assert_eq!(
        filter.first_available_date(DayOfWeek::WEDNESDAY, campus.morning, campus.room_a),
        Some(date(1, 24))
    );

    let report = math.validate();
    assert!(!report.is_clean());
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].weekday, DayOfWeek::WEDNESDAY);
    assert!(report.conflicts[0]
        .reasons
        .iter()
        .any(|reason| reason == "Room A101 is already booked by class CS101"));

    let err = math.submit(&office()).await.expect_err("wednesday is blocked");
    assert!(matches!(err, AppError::NoAvailableDate { ref details } if details.len() == 1));

    let rejected = store
        .create_schedule(CreateScheduleRequest {
            semester_id: campus.semester_id,
            class_id: campus.class_math,
            lecturer_id: campus.lecturer_binh,
            patterns: vec![monday, wednesday],
            required_lesson_count: 6,
        })
        .await
        .expect_err("store agrees");
    match rejected {
        AppError::Conflict { details, .. } => {
            let details = details.expect("conflict details");
            assert_eq!(details["patterns"].as_array().map(Vec::len), Some(1));
            assert_eq!(details["patterns"][0]["roomName"].as_str(), Some("A101"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    math.remove_pattern(DayOfWeek::WEDNESDAY, campus.morning)
        .expect("remove wednesday");
    math.add_pattern(WeeklyPattern::new(DayOfWeek::WEDNESDAY, campus.midday, campus.room_a))
        .expect("midday wednesday");
    assert!(math.validate().is_clean());
    let result = math.submit(&office()).await.expect("math schedule");
    assert_eq!(result.lessons_created_count, 6);
    assert_eq!(result.lessons_skipped_count, 0);
}

#[tokio::test]
async fn test_changing_semester_reloads_calendar_and_bookings() {
    let (campus, _dir) = setup_campus();
    // Summer 2024 runs Mon 2024-04-01 to Sun 2024-04-28 with Mon 2024-04-08 off.
    let summer = campus
        .pool
        .with_connection(|conn| {
            let id = SemesterRepository::insert(conn, "Summer 2024", date(4, 1), date(4, 28))?;
            SemesterRepository::insert_holiday(conn, id, date(4, 8), "Hung Kings Festival")?;
            Ok(id)
        })
        .expect("summer semester");
    book_cs_mornings(&campus, summer, campus.room_a, &[date(4, 1), date(4, 15), date(4, 22)]);
    let store = campus.store();

    let mut math = campus
        .open_session(&store, campus.class_math, campus.lecturer_binh)
        .await
        .expect("open math session");
    let monday_morning = OptionSelection {
        weekday: Some(DayOfWeek::MONDAY),
        time_slot_id: Some(campus.morning),
        room_id: None,
    };
    assert_eq!(
        math.options(&monday_morning).room_ids,
        vec![campus.room_a, campus.room_b]
    );
    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_b))
        .expect("spring pattern");
    assert_eq!(math.preview(false).len(), 12);

    math.change_semester(summer).await.expect("change semester");

    assert!(math.patterns().is_empty());
    assert_eq!(math.scope().semester_id, summer);
    assert_eq!(math.catalog().semester.id, summer);
    assert_eq!(math.snapshot().range.start, date(4, 1));
    assert_eq!(math.snapshot().conflicts.len(), 3);

    assert_eq!(math.options(&monday_morning).room_ids, vec![campus.room_b]);

    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_b))
        .expect("summer pattern");
    let dates: Vec<_> = math.preview(false).into_iter().map(|l| l.date).collect();
    assert_eq!(dates, vec![date(4, 1), date(4, 15), date(4, 22)]);

    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.midday, campus.room_a))
        .expect("midday pattern");
    assert!(math.validate().conflicts.is_empty());
    math.remove_pattern(DayOfWeek::MONDAY, campus.midday)
        .expect("remove midday");
    math.add_pattern(WeeklyPattern::new(DayOfWeek::TUESDAY, campus.morning, campus.room_a))
        .expect("tuesday pattern");
    let report = math.validate();
    assert_eq!(report.generated_lessons, 7);
    assert!(report.conflicts.is_empty());

    math.remove_pattern(DayOfWeek::MONDAY, campus.morning)
        .expect("remove monday");
    math.add_pattern(WeeklyPattern::new(DayOfWeek::MONDAY, campus.morning, campus.room_a))
        .expect("booked room");
    let report = math.validate();
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.conflicts[0]
        .reasons
        .iter()
        .any(|reason| reason == "Room A101 is already booked by class CS101"));
}
