use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::pattern::PatternSet;
use crate::models::schedule::{AvailableOptions, OptionSelection};
use crate::models::weekday::DayOfWeek;
use crate::services::calendar;
use crate::services::conflict_index::ConflictCandidate;
use crate::services::schedule_snapshot::ScheduleSnapshot;

/// Values each dimension of the pattern form may take before filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionDomain {
    pub weekdays: Vec<DayOfWeek>,
    pub time_slot_ids: Vec<i64>,
    pub room_ids: Vec<i64>,
}

/// Answers "does this weekday/slot/room still have a free date" for one
/// class and lecturer against an immutable snapshot.
pub struct AvailabilityFilter<'a> {
    snapshot: &'a ScheduleSnapshot,
    class_id: i64,
    lecturer_id: i64,
}

impl<'a> AvailabilityFilter<'a> {
    pub fn new(snapshot: &'a ScheduleSnapshot, class_id: i64, lecturer_id: i64) -> Self {
        Self {
            snapshot,
            class_id,
            lecturer_id,
        }
    }

    /// Walks every occurrence of `weekday` in the semester and returns the
    /// first date that is not a holiday, passes the room, class and lecturer
    /// rules, and has no busy student.
    pub fn first_available_date(
        &self,
        weekday: DayOfWeek,
        time_slot_id: i64,
        room_id: i64,
    ) -> Option<NaiveDate> {
        let range = &self.snapshot.range;
        if range.is_empty() {
            return None;
        }

        let mut date = calendar::first_on_or_after(range.start, weekday)?;
        while date <= range.end {
            if !self.snapshot.holidays.is_holiday(date) && self.is_free(date, time_slot_id, room_id)
            {
                return Some(date);
            }
            date = calendar::shift(date, 7)?;
        }
        None
    }

    pub fn has_available_date(&self, weekday: DayOfWeek, time_slot_id: i64, room_id: i64) -> bool {
        self.first_available_date(weekday, time_slot_id, room_id)
            .is_some()
    }

    pub(crate) fn is_free(&self, date: NaiveDate, time_slot_id: i64, room_id: i64) -> bool {
        let candidate = ConflictCandidate {
            date,
            time_slot_id,
            room_id,
            class_id: self.class_id,
            lecturer_id: self.lecturer_id,
        };
        !self.snapshot.conflicts.has_conflict(&candidate)
            && !self.snapshot.students.has_conflict(date, time_slot_id)
    }

    /// Narrows every dimension to the values that appear in at least one
    /// available weekday/slot/room cell consistent with `selection`.
    /// Weekday+slot pairs already held by `taken` are never offered again.
    /// A chosen value is echoed back only when it is still feasible.
    pub fn options(
        &self,
        selection: &OptionSelection,
        domain: &OptionDomain,
        taken: &PatternSet,
    ) -> AvailableOptions {
        let weekdays = narrow(&domain.weekdays, selection.weekday);
        let slots = narrow(&domain.time_slot_ids, selection.time_slot_id);
        let rooms = narrow(&domain.room_ids, selection.room_id);

        let mut open_weekdays = HashSet::new();
        let mut open_slots = HashSet::new();
        let mut open_rooms = HashSet::new();
        let mut evaluated = 0usize;

        for &weekday in &weekdays {
            for &slot in &slots {
                if taken.takes(weekday, slot) {
                    continue;
                }
                for &room in &rooms {
                    evaluated += 1;
                    if self.has_available_date(weekday, slot, room) {
                        open_weekdays.insert(weekday);
                        open_slots.insert(slot);
                        open_rooms.insert(room);
                    }
                }
            }
        }

        debug!(
            target: "app::availability",
            class_id = self.class_id,
            lecturer_id = self.lecturer_id,
            evaluated,
            weekdays = open_weekdays.len(),
            slots = open_slots.len(),
            rooms = open_rooms.len(),
            "availability options computed"
        );

        AvailableOptions {
            weekdays: weekdays
                .into_iter()
                .filter(|day| open_weekdays.contains(day))
                .collect(),
            time_slot_ids: slots
                .into_iter()
                .filter(|slot| open_slots.contains(slot))
                .collect(),
            room_ids: rooms
                .into_iter()
                .filter(|room| open_rooms.contains(room))
                .collect(),
        }
    }
}

fn narrow<T: Copy + PartialEq>(domain: &[T], chosen: Option<T>) -> Vec<T> {
    match chosen {
        Some(value) if domain.contains(&value) => vec![value],
        Some(_) => Vec::new(),
        None => domain.to_vec(),
    }
}
