use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::lesson::PreviewLesson;
use crate::models::pattern::WeeklyPattern;
use crate::models::schedule::{ConflictDetail, ScheduleCatalog};
use crate::models::weekday::DayOfWeek;
use crate::services::availability::AvailabilityFilter;
use crate::services::calendar;
use crate::services::conflict_index::ConflictCandidate;
use crate::services::pattern_expander::PatternExpander;
use crate::services::schedule_snapshot::ScheduleSnapshot;

/// Outcome of the pre-submission gate. Every problem is collected before
/// anything is turned into an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub required_lessons: usize,
    pub generated_lessons: usize,
    pub conflicts: Vec<ConflictDetail>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.generated_lessons >= self.required_lessons && self.conflicts.is_empty()
    }

    /// Lesson shortfall is reported before per-pattern conflicts.
    pub fn into_result(self) -> AppResult<Self> {
        if self.generated_lessons < self.required_lessons {
            return Err(AppError::insufficient_lessons(
                self.required_lessons,
                self.generated_lessons,
            ));
        }
        if !self.conflicts.is_empty() {
            return Err(AppError::no_available_date(self.conflicts));
        }
        Ok(self)
    }
}

pub struct ScheduleValidator<'a> {
    snapshot: &'a ScheduleSnapshot,
    catalog: &'a ScheduleCatalog,
    class_id: i64,
    lecturer_id: i64,
}

impl<'a> ScheduleValidator<'a> {
    pub fn new(
        snapshot: &'a ScheduleSnapshot,
        catalog: &'a ScheduleCatalog,
        class_id: i64,
        lecturer_id: i64,
    ) -> Self {
        Self {
            snapshot,
            catalog,
            class_id,
            lecturer_id,
        }
    }

    /// One detail per pattern with no conflict-free date; empty when clean.
    pub fn validate(&self, patterns: &[WeeklyPattern]) -> Vec<ConflictDetail> {
        let filter = AvailabilityFilter::new(self.snapshot, self.class_id, self.lecturer_id);
        let details: Vec<ConflictDetail> = patterns
            .iter()
            .filter(|p| !filter.has_available_date(p.weekday, p.time_slot_id, p.room_id))
            .map(|p| self.explain(p))
            .collect();

        debug!(
            target: "app::schedule",
            class_id = self.class_id,
            patterns = patterns.len(),
            failing = details.len(),
            "patterns validated"
        );
        details
    }

    /// Lessons a commit would insert: the capped, front-loaded expansion
    /// minus conflicting dates. A pattern that emits lessons inside the cap
    /// but keeps none of them is blocked. A required count of zero leaves
    /// the expansion uncapped.
    pub fn plan_commit(&self, patterns: &[WeeklyPattern], required: usize) -> CommitPlan {
        let cap = (required > 0).then_some(required);
        let expanded =
            PatternExpander::expand(patterns, &self.snapshot.range, &self.snapshot.holidays, cap);
        let filter = AvailabilityFilter::new(self.snapshot, self.class_id, self.lecturer_id);

        let mut emitted: HashMap<(DayOfWeek, i64), Vec<NaiveDate>> = HashMap::new();
        let mut kept: HashSet<(DayOfWeek, i64)> = HashSet::new();
        let mut lessons = Vec::with_capacity(expanded.len());

        for lesson in &expanded {
            let key = (lesson.weekday, lesson.time_slot_id);
            emitted.entry(key).or_default().push(lesson.date);
            if filter.is_free(lesson.date, lesson.time_slot_id, lesson.room_id) {
                kept.insert(key);
                lessons.push(*lesson);
            }
        }

        let blocked = patterns
            .iter()
            .filter_map(|p| {
                let key = (p.weekday, p.time_slot_id);
                let dates = emitted.get(&key)?;
                (!kept.contains(&key)).then(|| self.explain_window(p, dates, required))
            })
            .collect::<Vec<_>>();

        CommitPlan {
            skipped: expanded.len() - lessons.len(),
            lessons,
            blocked,
        }
    }

    /// Semester-wide availability plus the capped window the commit uses,
    /// so a clean report is one the boundary will accept against the same
    /// snapshot.
    pub fn report(&self, patterns: &[WeeklyPattern], required: usize) -> ValidationReport {
        let generated_lessons =
            PatternExpander::count(patterns, &self.snapshot.range, &self.snapshot.holidays);
        let mut conflicts = self.validate(patterns);
        for detail in self.plan_commit(patterns, required).blocked {
            let listed = conflicts
                .iter()
                .any(|c| c.weekday == detail.weekday && c.time_slot_id == detail.time_slot_id);
            if !listed {
                conflicts.push(detail);
            }
        }

        let report = ValidationReport {
            required_lessons: required,
            generated_lessons,
            conflicts,
        };
        info!(
            target: "app::schedule",
            class_id = self.class_id,
            required,
            generated = generated_lessons,
            conflicts = report.conflicts.len(),
            "validation report built"
        );
        report
    }

    /// Room, class, lecturer and student clashes of `pattern` over every
    /// teaching date of the semester.
    pub fn explain(&self, pattern: &WeeklyPattern) -> ConflictDetail {
        let dates = self.teaching_dates(pattern.weekday);
        let mut detail = self.describe(
            pattern,
            &dates,
            "has no conflict-free date this semester".to_string(),
        );
        if dates.is_empty() {
            detail.reasons.push(format!(
                "No teaching day falls on {} in this semester",
                pattern.weekday.label()
            ));
        }
        detail
    }

    fn explain_window(
        &self,
        pattern: &WeeklyPattern,
        dates: &[NaiveDate],
        required: usize,
    ) -> ConflictDetail {
        let outcome = match required {
            0 => "has no conflict-free date this semester".to_string(),
            cap => format!("has no conflict-free date among the first {cap} lessons"),
        };
        self.describe(pattern, dates, outcome)
    }

    fn teaching_dates(&self, weekday: DayOfWeek) -> Vec<NaiveDate> {
        let range = &self.snapshot.range;
        let mut dates = Vec::new();
        let mut next = if range.is_empty() {
            None
        } else {
            calendar::first_on_or_after(range.start, weekday)
        };
        while let Some(date) = next.filter(|date| *date <= range.end) {
            next = calendar::shift(date, 7);
            if !self.snapshot.holidays.is_holiday(date) {
                dates.push(date);
            }
        }
        dates
    }

    fn describe(
        &self,
        pattern: &WeeklyPattern,
        dates: &[NaiveDate],
        outcome: String,
    ) -> ConflictDetail {
        let filter = AvailabilityFilter::new(self.snapshot, self.class_id, self.lecturer_id);
        let mut reasons: Vec<String> = Vec::new();
        let mut student_clash_dates = 0usize;

        for &date in dates {
            let check = self.snapshot.conflicts.check(&ConflictCandidate {
                date,
                time_slot_id: pattern.time_slot_id,
                room_id: pattern.room_id,
                class_id: self.class_id,
                lecturer_id: self.lecturer_id,
            });
            for reason in check.reasons {
                if !reasons.contains(&reason) {
                    reasons.push(reason);
                }
            }
            if !check.has_conflict && !filter.is_free(date, pattern.time_slot_id, pattern.room_id) {
                student_clash_dates += 1;
            }
        }
        if student_clash_dates > 0 {
            reasons.push(format!(
                "Enrolled students are already busy on {student_clash_dates} date(s)"
            ));
        }

        let room_name = self.catalog.room_name(pattern.room_id);
        let time_slot_label = self.catalog.time_slot_label(pattern.time_slot_id);
        let message = format!(
            "{} {} in {} {}",
            pattern.weekday.label(),
            time_slot_label,
            room_name,
            outcome
        );

        ConflictDetail {
            weekday: pattern.weekday,
            time_slot_id: pattern.time_slot_id,
            room_id: pattern.room_id,
            time_slot_label,
            room_name,
            reasons,
            student_clash_dates,
            message,
        }
    }
}

/// What a commit over one snapshot would do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPlan {
    pub lessons: Vec<PreviewLesson>,
    pub skipped: usize,
    pub blocked: Vec<ConflictDetail>,
}

/// Patterns that repeat an earlier weekday+slot, in declaration order.
pub fn find_duplicates(patterns: &[WeeklyPattern]) -> Vec<WeeklyPattern> {
    let mut seen: HashSet<(DayOfWeek, i64)> = HashSet::new();
    patterns
        .iter()
        .filter(|p| !seen.insert((p.weekday, p.time_slot_id)))
        .copied()
        .collect()
}

pub fn ensure_unique(patterns: &[WeeklyPattern]) -> AppResult<()> {
    match find_duplicates(patterns).first() {
        Some(duplicate) => Err(AppError::duplicate_pattern(
            duplicate.weekday,
            duplicate.time_slot_id,
        )),
        None => Ok(()),
    }
}
