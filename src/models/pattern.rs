use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::weekday::DayOfWeek;

/// Recurring weekly placement proposed for one class and lecturer.
/// Patterns carry no date; dates are derived by the pattern expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPattern {
    pub weekday: DayOfWeek,
    pub time_slot_id: i64,
    pub room_id: i64,
}

impl WeeklyPattern {
    pub fn new(weekday: DayOfWeek, time_slot_id: i64, room_id: i64) -> Self {
        Self {
            weekday,
            time_slot_id,
            room_id,
        }
    }

    pub fn occupies(&self, weekday: DayOfWeek, time_slot_id: i64) -> bool {
        self.weekday == weekday && self.time_slot_id == time_slot_id
    }
}

/// Ordered set of patterns for one class. Declaration order is kept because
/// the expander's capping policy depends on it; at most one pattern exists
/// per weekday and time slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternSet {
    patterns: Vec<WeeklyPattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_patterns<I>(patterns: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = WeeklyPattern>,
    {
        let mut set = Self::new();
        for pattern in patterns {
            set.add(pattern)?;
        }
        Ok(set)
    }

    pub fn add(&mut self, pattern: WeeklyPattern) -> AppResult<()> {
        if self.takes(pattern.weekday, pattern.time_slot_id) {
            return Err(AppError::duplicate_pattern(
                pattern.weekday,
                pattern.time_slot_id,
            ));
        }
        self.patterns.push(pattern);
        Ok(())
    }

    pub fn remove(&mut self, weekday: DayOfWeek, time_slot_id: i64) -> Option<WeeklyPattern> {
        let index = self
            .patterns
            .iter()
            .position(|pattern| pattern.occupies(weekday, time_slot_id))?;
        Some(self.patterns.remove(index))
    }

    pub fn takes(&self, weekday: DayOfWeek, time_slot_id: i64) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.occupies(weekday, time_slot_id))
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }

    pub fn as_slice(&self) -> &[WeeklyPattern] {
        &self.patterns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WeeklyPattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl<'a> IntoIterator for &'a PatternSet {
    type Item = &'a WeeklyPattern;
    type IntoIter = std::slice::Iter<'a, WeeklyPattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}
