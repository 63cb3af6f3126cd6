use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::access::{Actor, SchedulePermissions};
use crate::models::lesson::PreviewLesson;
use crate::models::pattern::{PatternSet, WeeklyPattern};
use crate::models::schedule::{
    AvailableOptions, ClassRoster, ConflictDetail, CreateScheduleRequest, CreateScheduleResult,
    OptionSelection, ScheduleBoundary, ScheduleCatalog, ScheduleScope, ScheduleSelection,
};
use crate::models::weekday::DayOfWeek;
use crate::services::availability::{AvailabilityFilter, OptionDomain};
use crate::services::pattern_expander::PatternExpander;
use crate::services::schedule_snapshot::ScheduleSnapshot;
use crate::services::schedule_validator::{ScheduleValidator, ValidationReport};

/// One user's "Create Schedule" workflow for a class. Interactions are
/// serialized by the caller; snapshots are swapped wholesale on refresh.
pub struct SchedulingSession {
    boundary: Arc<dyn ScheduleBoundary>,
    scope: ScheduleScope,
    catalog: ScheduleCatalog,
    roster: ClassRoster,
    patterns: PatternSet,
    snapshot: Arc<ScheduleSnapshot>,
    weekdays: Vec<DayOfWeek>,
}

impl SchedulingSession {
    pub async fn open(
        boundary: Arc<dyn ScheduleBoundary>,
        selection: ScheduleSelection,
        weekdays: Vec<DayOfWeek>,
    ) -> AppResult<Self> {
        let scope = selection.require()?;
        let (catalog, roster) = tokio::try_join!(
            boundary.get_catalog(scope.semester_id),
            boundary.get_class_roster(scope.class_id),
        )?;
        let snapshot =
            ScheduleSnapshot::load(boundary.as_ref(), &catalog.semester, scope.class_id).await?;

        info!(
            target: "app::schedule",
            semester_id = scope.semester_id,
            class_id = scope.class_id,
            lecturer_id = scope.lecturer_id,
            required = roster.required_lesson_count,
            "scheduling session opened"
        );

        Ok(Self {
            boundary,
            scope,
            catalog,
            roster,
            patterns: PatternSet::new(),
            snapshot: Arc::new(snapshot),
            weekdays,
        })
    }

    pub fn scope(&self) -> ScheduleScope {
        self.scope
    }

    pub fn catalog(&self) -> &ScheduleCatalog {
        &self.catalog
    }

    pub fn roster(&self) -> &ClassRoster {
        &self.roster
    }

    pub fn snapshot(&self) -> Arc<ScheduleSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn add_pattern(&mut self, pattern: WeeklyPattern) -> AppResult<()> {
        match self.catalog.room(pattern.room_id) {
            Some(room) if room.is_active => {}
            Some(_) => {
                return Err(AppError::validation(format!(
                    "room {} is not active",
                    pattern.room_id
                )))
            }
            None => {
                return Err(AppError::validation(format!(
                    "unknown room {}",
                    pattern.room_id
                )))
            }
        }
        if self.catalog.time_slot(pattern.time_slot_id).is_none() {
            return Err(AppError::validation(format!(
                "unknown time slot {}",
                pattern.time_slot_id
            )));
        }
        self.patterns.add(pattern)
    }

    pub fn remove_pattern(
        &mut self,
        weekday: DayOfWeek,
        time_slot_id: i64,
    ) -> AppResult<WeeklyPattern> {
        self.patterns
            .remove(weekday, time_slot_id)
            .ok_or_else(AppError::not_found)
    }

    /// Dates the current patterns would produce. With `capped`, only the
    /// first required-count lessons are kept, as the boundary will do.
    pub fn preview(&self, capped: bool) -> Vec<PreviewLesson> {
        let cap = capped
            .then_some(self.roster.required_lesson_count)
            .filter(|count| *count > 0);
        PatternExpander::expand(
            self.patterns.as_slice(),
            &self.snapshot.range,
            &self.snapshot.holidays,
            cap,
        )
    }

    pub fn options(&self, selection: &OptionSelection) -> AvailableOptions {
        self.options_task(*selection).run()
    }

    /// Detached option computation over the current snapshot, so callers
    /// can run the weekday x slot x room sweep off the async executor.
    pub fn options_task(&self, selection: OptionSelection) -> OptionsTask {
        OptionsTask {
            snapshot: Arc::clone(&self.snapshot),
            selection,
            domain: OptionDomain {
                weekdays: self.weekdays.clone(),
                time_slot_ids: self.catalog.time_slots.iter().map(|slot| slot.id).collect(),
                room_ids: self.catalog.active_rooms().map(|room| room.id).collect(),
            },
            taken: self.patterns.clone(),
            class_id: self.scope.class_id,
            lecturer_id: self.scope.lecturer_id,
        }
    }

    pub fn validate(&self) -> ValidationReport {
        self.validator()
            .report(self.patterns.as_slice(), self.roster.required_lesson_count)
    }

    /// Validates locally, then asks the boundary to commit. A boundary
    /// conflict means the snapshot went stale: it is reloaded, patterns are
    /// re-validated, and the fresh details come back as `StaleConflict`
    /// together with any the boundary reported itself.
    pub async fn submit(&mut self, actor: &Actor) -> AppResult<CreateScheduleResult> {
        if !actor.may_create_schedule(self.scope.class_id, self.scope.lecturer_id) {
            return Err(AppError::permission_denied(
                actor.role.as_str(),
                "create schedules for this lecturer",
            ));
        }
        if self.patterns.is_empty() {
            return Err(AppError::validation("add at least one pattern before submitting"));
        }
        self.validate().into_result()?;

        let request = CreateScheduleRequest {
            semester_id: self.scope.semester_id,
            class_id: self.scope.class_id,
            lecturer_id: self.scope.lecturer_id,
            patterns: self.patterns.as_slice().to_vec(),
            required_lesson_count: self.roster.required_lesson_count,
        };

        match self.boundary.create_schedule(request).await {
            Ok(result) => {
                info!(
                    target: "app::schedule",
                    class_id = self.scope.class_id,
                    created = result.lessons_created_count,
                    skipped = result.lessons_skipped_count,
                    batch_id = %result.batch_id,
                    "schedule committed"
                );
                self.patterns.clear();
                self.refresh().await?;
                Ok(result)
            }
            Err(AppError::Conflict { message, details }) => {
                warn!(
                    target: "app::schedule",
                    class_id = self.scope.class_id,
                    %message,
                    "boundary rejected schedule, refreshing snapshot"
                );
                self.refresh().await?;
                let mut conflicts = self.validate().conflicts;
                for detail in boundary_details(details) {
                    let listed = conflicts.iter().any(|c| {
                        c.weekday == detail.weekday && c.time_slot_id == detail.time_slot_id
                    });
                    if !listed {
                        conflicts.push(detail);
                    }
                }
                Err(AppError::stale_conflict(message, conflicts))
            }
            Err(error) => Err(error),
        }
    }

    pub async fn refresh(&mut self) -> AppResult<()> {
        let snapshot = ScheduleSnapshot::load(
            self.boundary.as_ref(),
            &self.catalog.semester,
            self.scope.class_id,
        )
        .await?;
        self.snapshot = Arc::new(snapshot);
        Ok(())
    }

    /// Patterns belong to a class, so they are dropped along with the old
    /// roster and snapshot.
    pub async fn change_class(&mut self, class_id: i64) -> AppResult<()> {
        let roster = self.boundary.get_class_roster(class_id).await?;
        let snapshot =
            ScheduleSnapshot::load(self.boundary.as_ref(), &self.catalog.semester, class_id)
                .await?;
        self.scope.class_id = class_id;
        self.roster = roster;
        self.snapshot = Arc::new(snapshot);
        self.patterns.clear();
        Ok(())
    }

    pub async fn change_semester(&mut self, semester_id: i64) -> AppResult<()> {
        let catalog = self.boundary.get_catalog(semester_id).await?;
        let snapshot =
            ScheduleSnapshot::load(self.boundary.as_ref(), &catalog.semester, self.scope.class_id)
                .await?;
        self.scope.semester_id = semester_id;
        self.catalog = catalog;
        self.snapshot = Arc::new(snapshot);
        self.patterns.clear();
        Ok(())
    }

    pub fn change_lecturer(&mut self, lecturer_id: i64) {
        self.scope.lecturer_id = lecturer_id;
    }

    fn validator(&self) -> ScheduleValidator<'_> {
        ScheduleValidator::new(
            &self.snapshot,
            &self.catalog,
            self.scope.class_id,
            self.scope.lecturer_id,
        )
    }
}

/// Per-pattern details a boundary attaches to a conflict as
/// `{"patterns": [...]}`. Anything else yields none.
fn boundary_details(details: Option<JsonValue>) -> Vec<ConflictDetail> {
    details
        .and_then(|mut value| value.get_mut("patterns").map(JsonValue::take))
        .and_then(|patterns| serde_json::from_value(patterns).ok())
        .unwrap_or_default()
}

pub struct OptionsTask {
    snapshot: Arc<ScheduleSnapshot>,
    selection: OptionSelection,
    domain: OptionDomain,
    taken: PatternSet,
    class_id: i64,
    lecturer_id: i64,
}

impl OptionsTask {
    pub fn run(self) -> AvailableOptions {
        AvailabilityFilter::new(&self.snapshot, self.class_id, self.lecturer_id).options(
            &self.selection,
            &self.domain,
            &self.taken,
        )
    }
}
