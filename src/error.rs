use rusqlite;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::schedule::ConflictDetail;
use crate::models::weekday::DayOfWeek;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {message}")]
    Database { message: String },

    #[error("record not found")]
    NotFound,

    #[error("record conflict: {message}")]
    Conflict {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        details: Option<JsonValue>,
    },

    #[error("a pattern for {weekday} in time slot {time_slot_id} already exists")]
    DuplicatePattern {
        weekday: DayOfWeek,
        time_slot_id: i64,
    },

    #[error("{} pattern(s) have no conflict-free date in the semester", details.len())]
    NoAvailableDate { details: Vec<ConflictDetail> },

    #[error("patterns generate {generated} lessons but the subject requires {required}")]
    InsufficientLessons { required: usize, generated: usize },

    #[error("schedule changed since it was validated: {message}")]
    StaleConflict {
        message: String,
        details: Vec<ConflictDetail>,
    },

    #[error("no {field} selected")]
    MissingSelection { field: &'static str },

    #[error("role {role} may not {action}")]
    PermissionDenied { role: String, action: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            source: None,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            source: None,
            details: Some(details),
        }
    }

    pub fn duplicate_pattern(weekday: DayOfWeek, time_slot_id: i64) -> Self {
        warn!(target: "app::schedule", weekday = weekday.number(), time_slot_id, "duplicate pattern rejected");
        AppError::DuplicatePattern {
            weekday,
            time_slot_id,
        }
    }

    pub fn no_available_date(details: Vec<ConflictDetail>) -> Self {
        warn!(target: "app::schedule", patterns = details.len(), "patterns without available dates");
        AppError::NoAvailableDate { details }
    }

    pub fn insufficient_lessons(required: usize, generated: usize) -> Self {
        warn!(target: "app::schedule", required, generated, "pattern set under-generates lessons");
        AppError::InsufficientLessons {
            required,
            generated,
        }
    }

    pub fn stale_conflict(message: impl Into<String>, details: Vec<ConflictDetail>) -> Self {
        let message = message.into();
        warn!(target: "app::schedule", %message, patterns = details.len(), "boundary rejected a validated schedule");
        AppError::StaleConflict { message, details }
    }

    pub fn missing_selection(field: &'static str) -> Self {
        warn!(target: "app::schedule", field, "missing selection");
        AppError::MissingSelection { field }
    }

    pub fn permission_denied(role: impl Into<String>, action: impl Into<String>) -> Self {
        let role = role.into();
        let action = action.into();
        warn!(target: "app::access", %role, %action, "permission denied");
        AppError::PermissionDenied { role, action }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::conflict", %message, "conflict error");
        AppError::Conflict {
            message,
            details: None,
        }
    }

    pub fn conflict_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::conflict", %message, details = %details, "conflict error with details");
        AppError::Conflict {
            message,
            details: Some(details),
        }
    }

    pub fn not_found() -> Self {
        warn!(target: "app::database", "resource not found");
        AppError::NotFound
    }

    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::database", %message, "database error");
        AppError::Database { message }
    }

    pub fn config(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::config", %message, "configuration error");
        AppError::Config(message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }

    /// Scheduling errors the user can correct and retry without restarting
    /// the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::DuplicatePattern { .. }
                | AppError::NoAvailableDate { .. }
                | AppError::InsufficientLessons { .. }
                | AppError::StaleConflict { .. }
                | AppError::MissingSelection { .. }
                | AppError::Validation { .. }
                | AppError::Conflict { .. }
        )
    }

    pub fn conflict_details(&self) -> &[ConflictDetail] {
        match self {
            AppError::NoAvailableDate { details } | AppError::StaleConflict { details, .. } => {
                details
            }
            _ => &[],
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::Error::{QueryReturnedNoRows, SqliteFailure};
        use rusqlite::ErrorCode;

        match &error {
            QueryReturnedNoRows => AppError::not_found(),
            SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                AppError::conflict("unique or foreign key constraint violated")
            }
            _ => {
                error!(target: "app::database", error = ?error, "sqlite error");
                AppError::database(error.to_string())
            }
        }
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(error: serde_yaml::Error) -> Self {
        AppError::config(format!("invalid configuration file: {error}"))
    }
}
