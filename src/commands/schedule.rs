use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::access::{Actor, SchedulePermissions};
use crate::models::lesson::PreviewLesson;
use crate::models::pattern::WeeklyPattern;
use crate::models::schedule::{
    AvailableOptions, ClassRoster, CreateScheduleResult, OptionSelection, ScheduleBoundary,
    ScheduleCatalog, ScheduleSelection,
};
use crate::models::weekday::DayOfWeek;
use crate::services::schedule_validator::ValidationReport;
use crate::services::scheduling_session::SchedulingSession;

use super::{run_blocking, AppState, CommandError, CommandResult, SharedSession};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOpened {
    pub session_id: String,
    pub catalog: ScheduleCatalog,
    pub roster: ClassRoster,
}

fn unknown_session(session_id: &str) -> CommandError {
    CommandError::new(
        "NOT_FOUND",
        format!("scheduling session {session_id} does not exist"),
        None,
    )
}

async fn session_handle(state: &AppState, session_id: &str) -> CommandResult<SharedSession> {
    let sessions = state.sessions();
    let sessions = sessions.lock().await;
    sessions
        .get(session_id)
        .map(Arc::clone)
        .ok_or_else(|| unknown_session(session_id))
}

pub async fn schedule_session_open(
    state: &AppState,
    selection: ScheduleSelection,
) -> CommandResult<SessionOpened> {
    let boundary: Arc<dyn ScheduleBoundary> = state.store();
    let session = SchedulingSession::open(boundary, selection, state.weekdays()).await?;

    let session_id = Uuid::new_v4().to_string();
    let opened = SessionOpened {
        session_id: session_id.clone(),
        catalog: session.catalog().clone(),
        roster: session.roster().clone(),
    };
    state
        .sessions()
        .lock()
        .await
        .insert(session_id.clone(), Arc::new(Mutex::new(session)));
    info!(target: "app::command", %session_id, "scheduling session registered");
    Ok(opened)
}

pub async fn schedule_session_close(state: &AppState, session_id: String) -> CommandResult<bool> {
    let removed = state.sessions().lock().await.remove(&session_id).is_some();
    debug!(target: "app::command", %session_id, removed, "scheduling session closed");
    Ok(removed)
}

pub async fn schedule_pattern_add(
    state: &AppState,
    session_id: String,
    pattern: WeeklyPattern,
) -> CommandResult<Vec<WeeklyPattern>> {
    let handle = session_handle(state, &session_id).await?;
    let mut session = handle.lock().await;
    session.add_pattern(pattern)?;
    Ok(session.patterns().as_slice().to_vec())
}

pub async fn schedule_pattern_remove(
    state: &AppState,
    session_id: String,
    weekday: DayOfWeek,
    time_slot_id: i64,
) -> CommandResult<Vec<WeeklyPattern>> {
    let handle = session_handle(state, &session_id).await?;
    let mut session = handle.lock().await;
    session.remove_pattern(weekday, time_slot_id)?;
    Ok(session.patterns().as_slice().to_vec())
}

pub async fn schedule_preview(
    state: &AppState,
    session_id: String,
    capped: bool,
) -> CommandResult<Vec<PreviewLesson>> {
    let handle = session_handle(state, &session_id).await?;
    let session = handle.lock().await;
    Ok(session.preview(capped))
}

pub async fn schedule_options(
    state: &AppState,
    session_id: String,
    selection: OptionSelection,
) -> CommandResult<AvailableOptions> {
    let handle = session_handle(state, &session_id).await?;
    let task = handle.lock().await.options_task(selection);
    run_blocking(move || Ok(task.run())).await
}

pub async fn schedule_validate(
    state: &AppState,
    session_id: String,
) -> CommandResult<ValidationReport> {
    let handle = session_handle(state, &session_id).await?;
    let session = handle.lock().await;
    Ok(session.validate())
}

pub async fn schedule_submit(
    state: &AppState,
    session_id: String,
    actor: Actor,
) -> CommandResult<CreateScheduleResult> {
    let handle = session_handle(state, &session_id).await?;
    let mut session = handle.lock().await;
    Ok(session.submit(&actor).await?)
}

pub async fn schedule_batch_delete(
    state: &AppState,
    actor: Actor,
    batch_id: String,
) -> CommandResult<usize> {
    if !actor.may_delete_batch() {
        return Err(AppError::permission_denied(actor.role.as_str(), "delete lesson batches").into());
    }
    Ok(state.store().delete_batch(batch_id).await?)
}
