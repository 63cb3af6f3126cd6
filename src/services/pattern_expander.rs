use tracing::debug;

use crate::models::lesson::PreviewLesson;
use crate::models::pattern::WeeklyPattern;
use crate::models::semester::{HolidayCalendar, SemesterRange};
use crate::models::weekday::DayOfWeek;
use crate::services::calendar;

/// Expands weekly patterns into concrete lesson dates.
///
/// Dates are walked week by week from the Monday on or before the semester
/// start, Monday to Sunday inside each week, and every pattern matching the
/// day emits one lesson in declaration order. With a cap, the first
/// `max_count` chronological lessons win (front-loading). The persistence
/// boundary re-derives lessons with the same routine, so the order here is
/// part of the contract.
pub struct PatternExpander;

impl PatternExpander {
    pub fn expand(
        patterns: &[WeeklyPattern],
        range: &SemesterRange,
        holidays: &HolidayCalendar,
        max_count: Option<usize>,
    ) -> Vec<PreviewLesson> {
        let mut lessons = Vec::new();
        if patterns.is_empty() || range.is_empty() || max_count == Some(0) {
            return lessons;
        }

        let mut week = calendar::week_start(range.start);
        'weeks: loop {
            for offset in 0..7 {
                let Some(date) = calendar::shift(week, offset) else {
                    break 'weeks;
                };
                if date < range.start {
                    continue;
                }
                if date > range.end {
                    break 'weeks;
                }
                if holidays.is_holiday(date) {
                    continue;
                }

                let weekday = DayOfWeek::of(date);
                for pattern in patterns.iter().filter(|p| p.weekday == weekday) {
                    lessons.push(PreviewLesson {
                        date,
                        weekday,
                        time_slot_id: pattern.time_slot_id,
                        room_id: pattern.room_id,
                        is_preview: true,
                    });
                    if max_count.is_some_and(|cap| lessons.len() >= cap) {
                        break 'weeks;
                    }
                }
            }

            match calendar::shift(week, 7) {
                Some(next) => week = next,
                None => break,
            }
        }

        debug!(
            target: "app::schedule",
            patterns = patterns.len(),
            lessons = lessons.len(),
            capped = max_count.is_some(),
            "patterns expanded"
        );
        lessons
    }

    /// Number of lessons the patterns generate over the whole semester, uncapped.
    pub fn count(
        patterns: &[WeeklyPattern],
        range: &SemesterRange,
        holidays: &HolidayCalendar,
    ) -> usize {
        Self::expand(patterns, range, holidays, None).len()
    }

    /// Patterns that contributed no lesson to `lessons`, typically because
    /// the cap was exhausted before their weekday came around.
    pub fn unused_patterns(
        patterns: &[WeeklyPattern],
        lessons: &[PreviewLesson],
    ) -> Vec<WeeklyPattern> {
        patterns
            .iter()
            .filter(|pattern| {
                !lessons.iter().any(|lesson| {
                    lesson.weekday == pattern.weekday
                        && lesson.time_slot_id == pattern.time_slot_id
                        && lesson.room_id == pattern.room_id
                })
            })
            .copied()
            .collect()
    }
}
