pub mod availability;
pub mod calendar;
pub mod conflict_index;
pub mod pattern_expander;
pub mod schedule_snapshot;
pub mod schedule_store;
pub mod schedule_validator;
pub mod scheduling_session;
pub mod student_occupancy;
