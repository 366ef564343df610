//! Import task status and cancellation

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::ImportTask;

use crate::core::ServerState;
use crate::db::repository::import_task;

#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: ImportTask,
    /// A run for this task is active in this process
    pub running: bool,
}

fn task_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::ImportTaskNotFound, format!("Import task {id} not found"))
        .with_detail("task_id", id)
}

/// `GET /api/import/tasks/{id}`
pub async fn get_task(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TaskView>>, AppError> {
    let task = import_task::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| task_not_found(id))?;
    Ok(Json(ApiResponse::success(TaskView {
        running: state.jobs.is_running(id),
        task,
    })))
}

/// `POST /api/import/tasks/{id}/cancel`
pub async fn cancel_task(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if state.jobs.cancel(id) {
        tracing::info!(task_id = id, "Import cancellation requested");
        return Ok(Json(ApiResponse::ok()));
    }
    match import_task::find_by_id(&state.pool, id).await? {
        Some(task) => Err(AppError::with_message(
            ErrorCode::ImportTaskNotRunning,
            format!("Import task {id} is {}", task.status),
        )),
        None => Err(task_not_found(id)),
    }
}
