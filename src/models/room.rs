use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

/// A teaching period. The engine only uses the id; slots are assumed to be
/// non-overlapping, so no time arithmetic happens between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: i64,
    pub label: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimeSlot {
    pub fn display_label(&self) -> String {
        format!(
            "{} ({}-{})",
            self.label,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}
