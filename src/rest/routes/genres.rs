// rest/routes/genres.rs — Genre lookup routes. Tasks cannot exist without a
// genre, so the client needs a way to list and add them.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::tasks::TaskError;
use crate::AppContext;

type ApiError = (StatusCode, Json<Value>);

fn error_response(err: TaskError) -> ApiError {
    match err {
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

async fn all_genres(ctx: &AppContext) -> Result<Json<Value>, ApiError> {
    let genres = ctx.task_storage.list_genres().await.map_err(error_response)?;
    let list: Vec<Value> = genres
        .iter()
        .map(|g| json!({ "id": g.id, "name": g.name }))
        .collect();
    Ok(Json(Value::Array(list)))
}

pub async fn list_genres(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    all_genres(&ctx).await
}

pub async fn create_genre(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<crate::tasks::model::CreateGenreRequest>,
) -> Result<Json<Value>, ApiError> {
    ctx.task_storage
        .create_genre(&body.name)
        .await
        .map_err(error_response)?;
    all_genres(&ctx).await
}
