use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::lesson::SemesterLesson;
use crate::models::slot_key::{DateSlotKey, SlotKey};

/// One occupant of a (date, time slot, room) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEntry {
    pub class_id: i64,
    pub lecturer_id: i64,
    pub room_id: i64,
    pub room_name: String,
    pub class_name: String,
    pub lecturer_label: String,
}

impl From<&SemesterLesson> for ConflictEntry {
    fn from(lesson: &SemesterLesson) -> Self {
        Self {
            class_id: lesson.class_id,
            lecturer_id: lesson.lecturer_id,
            room_id: lesson.room_id,
            room_name: lesson.room_name.clone(),
            class_name: lesson.class_name.clone(),
            lecturer_label: lesson.lecturer_label.clone(),
        }
    }
}

/// A proposed lesson checked against the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictCandidate {
    pub date: NaiveDate,
    pub time_slot_id: i64,
    pub room_id: i64,
    pub class_id: i64,
    pub lecturer_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictKind {
    Room,
    Class,
    Lecturer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheck {
    pub has_conflict: bool,
    pub kinds: Vec<ConflictKind>,
    pub reasons: Vec<String>,
}

impl ConflictCheck {
    fn record(&mut self, kind: ConflictKind, reason: String) {
        self.has_conflict = true;
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

/// Occupancy of every committed lesson in a semester, keyed by its own
/// (date, time slot, room). Built once per snapshot and never patched.
#[derive(Debug, Clone, Default)]
pub struct ConflictIndex {
    entries: HashMap<SlotKey, Vec<ConflictEntry>>,
    rooms_by_time: HashMap<DateSlotKey, Vec<i64>>,
    lesson_count: usize,
}

impl ConflictIndex {
    pub fn build(lessons: &[SemesterLesson]) -> Self {
        let mut index = Self::default();
        for lesson in lessons {
            let key = SlotKey::new(lesson.date, lesson.time_slot_id, lesson.room_id);
            let bucket = index.entries.entry(key).or_default();
            if bucket.is_empty() {
                index
                    .rooms_by_time
                    .entry(key.time())
                    .or_default()
                    .push(lesson.room_id);
            }
            bucket.push(ConflictEntry::from(lesson));
            index.lesson_count += 1;
        }

        debug!(
            target: "app::schedule",
            lessons = index.lesson_count,
            buckets = index.entries.len(),
            "conflict index built"
        );
        index
    }

    pub fn lookup(&self, date: NaiveDate, time_slot_id: i64, room_id: i64) -> &[ConflictEntry] {
        self.entries
            .get(&SlotKey::new(date, time_slot_id, room_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every occupant at this date and time slot, in any room.
    pub fn lookup_by_date_time(&self, date: NaiveDate, time_slot_id: i64) -> Vec<&ConflictEntry> {
        let Some(rooms) = self.rooms_by_time.get(&DateSlotKey::new(date, time_slot_id)) else {
            return Vec::new();
        };
        rooms
            .iter()
            .flat_map(|room_id| self.lookup(date, time_slot_id, *room_id))
            .collect()
    }

    /// Applies the room, class and lecturer rules and renders one reason per
    /// distinct offender.
    pub fn check(&self, candidate: &ConflictCandidate) -> ConflictCheck {
        let mut check = ConflictCheck::default();

        for entry in self.lookup(candidate.date, candidate.time_slot_id, candidate.room_id) {
            if entry.class_id != candidate.class_id {
                check.record(
                    ConflictKind::Room,
                    format!(
                        "Room {} is already booked by class {}",
                        entry.room_name, entry.class_name
                    ),
                );
            }
        }

        let occupants = self.lookup_by_date_time(candidate.date, candidate.time_slot_id);
        for entry in &occupants {
            if entry.class_id == candidate.class_id {
                check.record(
                    ConflictKind::Class,
                    format!(
                        "Class {} already has a lesson in room {}",
                        entry.class_name, entry.room_name
                    ),
                );
            }
        }
        for entry in &occupants {
            if entry.lecturer_id == candidate.lecturer_id && entry.class_id != candidate.class_id {
                check.record(
                    ConflictKind::Lecturer,
                    format!(
                        "Lecturer {} is teaching class {} in room {}",
                        entry.lecturer_label, entry.class_name, entry.room_name
                    ),
                );
            }
        }

        check
    }

    /// Same rules as [`ConflictIndex::check`] without building reasons.
    pub fn has_conflict(&self, candidate: &ConflictCandidate) -> bool {
        let room_taken = self
            .lookup(candidate.date, candidate.time_slot_id, candidate.room_id)
            .iter()
            .any(|entry| entry.class_id != candidate.class_id);
        if room_taken {
            return true;
        }

        self.lookup_by_date_time(candidate.date, candidate.time_slot_id)
            .iter()
            .any(|entry| {
                entry.class_id == candidate.class_id || entry.lecturer_id == candidate.lecturer_id
            })
    }

    pub fn len(&self) -> usize {
        self.lesson_count
    }

    pub fn is_empty(&self) -> bool {
        self.lesson_count == 0
    }
}
