use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::error::AppResult;
use crate::models::schedule::StudentScheduleCache;
use crate::models::slot_key::DateSlotKey;

/// Times at which at least one student of the target class is already
/// committed to a lesson, in any of their classes.
#[derive(Debug, Clone, Default)]
pub struct StudentOccupancy {
    student_ids: Vec<i64>,
    busy: HashMap<DateSlotKey, Vec<i64>>,
}

impl StudentOccupancy {
    /// Parses the boundary snapshot into typed keys. Only students listed in
    /// the roster part of the cache count; stray map entries are ignored.
    pub fn build(cache: &StudentScheduleCache) -> AppResult<Self> {
        let roster: HashSet<i64> = cache.student_ids.iter().copied().collect();
        let mut busy: HashMap<DateSlotKey, Vec<i64>> = HashMap::new();

        for (student_id, times) in &cache.student_time_map {
            if !roster.contains(student_id) {
                continue;
            }
            for raw in times {
                let key = DateSlotKey::parse_wire(raw)?;
                let students = busy.entry(key).or_default();
                if !students.contains(student_id) {
                    students.push(*student_id);
                }
            }
        }
        for students in busy.values_mut() {
            students.sort_unstable();
        }

        debug!(
            target: "app::schedule",
            students = cache.student_ids.len(),
            busy_times = busy.len(),
            "student occupancy built"
        );

        Ok(Self {
            student_ids: cache.student_ids.clone(),
            busy,
        })
    }

    pub fn has_conflict(&self, date: NaiveDate, time_slot_id: i64) -> bool {
        self.busy
            .contains_key(&DateSlotKey::new(date, time_slot_id))
    }

    /// Roster students already busy at this time, ascending.
    pub fn busy_students(&self, date: NaiveDate, time_slot_id: i64) -> &[i64] {
        self.busy
            .get(&DateSlotKey::new(date, time_slot_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn student_ids(&self) -> &[i64] {
        &self.student_ids
    }

    pub fn busy_time_count(&self) -> usize {
        self.busy.len()
    }
}
