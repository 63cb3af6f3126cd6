pub mod schedule;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::weekday::DayOfWeek;
use crate::services::schedule_store::SqliteScheduleStore;
use crate::services::scheduling_session::SchedulingSession;

/// Each session sits behind its own lock; the registry lock only guards
/// lookups and is released before a session does any work.
pub type SharedSession = Arc<Mutex<SchedulingSession>>;
pub type SessionRegistry = Mutex<HashMap<String, SharedSession>>;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    store: Arc<SqliteScheduleStore>,
    sessions: Arc<SessionRegistry>,
    weekdays: Vec<DayOfWeek>,
}

impl AppState {
    pub fn new(db_pool: DbPool, config: &AppConfig) -> AppResult<Self> {
        let store = Arc::new(SqliteScheduleStore::new(db_pool.clone()));
        Ok(Self {
            db_pool,
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            weekdays: config.weekday_list()?,
        })
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    pub fn store(&self) -> Arc<SqliteScheduleStore> {
        Arc::clone(&self.store)
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.sessions)
    }

    pub fn weekdays(&self) -> Vec<DayOfWeek> {
        self.weekdays.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        let message = error.to_string();
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => CommandError::new("NOT_FOUND", "requested record does not exist", None),
            AppError::Conflict { message, details } => CommandError::new("CONFLICT", message, details),
            AppError::DuplicatePattern {
                weekday,
                time_slot_id,
            } => CommandError::new(
                "DUPLICATE_PATTERN",
                message,
                Some(json!({ "weekday": weekday, "timeSlotId": time_slot_id })),
            ),
            AppError::NoAvailableDate { details } => CommandError::new(
                "NO_AVAILABLE_DATE",
                message,
                Some(json!({ "patterns": details })),
            ),
            AppError::InsufficientLessons {
                required,
                generated,
            } => CommandError::new(
                "INSUFFICIENT_LESSONS",
                message,
                Some(json!({ "required": required, "generated": generated })),
            ),
            AppError::StaleConflict { details, .. } => CommandError::new(
                "STALE_CONFLICT",
                message,
                Some(json!({ "patterns": details })),
            ),
            AppError::MissingSelection { field } => CommandError::new(
                "MISSING_SELECTION",
                message,
                Some(json!({ "field": field })),
            ),
            AppError::PermissionDenied { role, action } => {
                warn!(target: "app::command", %role, %action, "permission denied in command");
                CommandError::new(
                    "PERMISSION_DENIED",
                    message,
                    Some(json!({ "role": role, "action": action })),
                )
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Config(message) => {
                error!(target: "app::command", %message, "configuration error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("task execution failed: {err}"), None))?
        .map_err(CommandError::from)
}
