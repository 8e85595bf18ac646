// rest/routes/tasks.rs — Task CRUD, duplication, and stats routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::tasks::model::{
    CreateTaskRequest, NewTask, StatusRequest, TaskPatch, TaskWithGenre,
};
use crate::tasks::{TaskError, TaskPriority, TaskStatus};
use crate::AppContext;

type ApiError = (StatusCode, Json<Value>);

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Task not found" })),
    )
}

fn error_response(err: TaskError) -> ApiError {
    match err {
        TaskError::NotFound => not_found(),
        TaskError::Validation(msg) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": msg })),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": other.to_string() })),
        ),
    }
}

/// Ids are extracted as raw strings: a non-numeric or out-of-range path
/// segment resolves to no task, so it yields the same 404 as an unknown id
/// instead of an extractor-level 400.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| not_found())
}

fn task_json(t: &TaskWithGenre) -> Value {
    json!({
        "id": t.id,
        "name": t.name,
        "explanation": t.explanation,
        "status": t.status,
        "priority": t.priority,
        "deadlineDate": t.deadline_date,
        "genreId": t.genre_id,
        "genre": { "id": t.genre_id, "name": t.genre_name },
    })
}

/// Every read and every mutation responds with the full listing — the
/// client refreshes its whole task board from any call.
async fn all_tasks(ctx: &AppContext) -> Result<Json<Value>, ApiError> {
    let rows = ctx
        .task_storage
        .list_with_genre()
        .await
        .map_err(error_response)?;
    Ok(Json(Value::Array(rows.iter().map(task_json).collect())))
}

pub async fn list_tasks(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    all_tasks(&ctx).await
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let new = NewTask {
        name: body.name,
        explanation: body.explanation.unwrap_or_default(),
        status: body.status.unwrap_or(TaskStatus::NotStarted),
        priority: body.priority.unwrap_or(TaskPriority::Low),
        genre_id: body.genre_id,
        deadline_date: body.deadline_date,
    };
    let id = ctx.task_storage.create(&new).await.map_err(error_response)?;
    debug!(task_id = id, "task created");
    all_tasks(&ctx).await
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    ctx.task_storage
        .update(id, patch)
        .await
        .map_err(error_response)?;
    debug!(task_id = id, "task updated");
    all_tasks(&ctx).await
}

pub async fn update_status(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    ctx.task_storage
        .set_status(id, body.status)
        .await
        .map_err(error_response)?;
    debug!(task_id = id, status = body.status.as_str(), "status set");
    all_tasks(&ctx).await
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    ctx.task_storage.delete(id).await.map_err(error_response)?;
    debug!(task_id = id, "task deleted");
    all_tasks(&ctx).await
}

pub async fn duplicate_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let clone_id = ctx
        .task_storage
        .duplicate(id)
        .await
        .map_err(error_response)?;
    debug!(task_id = id, clone_id, "task duplicated");
    all_tasks(&ctx).await
}

/// Stats view shape — camelCase keys, rate at 2 decimal places.
pub async fn stats(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    let stats = ctx.task_storage.stats().await.map_err(error_response)?;
    Ok(Json(json!({
        "totalCount": stats.total_count,
        "statusCounts": {
            "notStarted": stats.status_counts.not_started,
            "inProgress": stats.status_counts.in_progress,
            "completed": stats.status_counts.completed,
        },
        "completionRate": stats.completion_rate,
    })))
}

/// Report shape — same computation, `countByStatus` key and a 1-decimal rate.
pub async fn report(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    let stats = ctx.task_storage.stats().await.map_err(error_response)?;
    Ok(Json(json!({
        "totalCount": stats.total_count,
        "countByStatus": {
            "notStarted": stats.status_counts.not_started,
            "inProgress": stats.status_counts.in_progress,
            "completed": stats.status_counts.completed,
        },
        "completionRate": stats.report_rate(),
    })))
}
