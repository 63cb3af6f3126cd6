pub mod access;
pub mod lesson;
pub mod pattern;
pub mod room;
pub mod schedule;
pub mod semester;
pub mod slot_key;
pub mod weekday;
