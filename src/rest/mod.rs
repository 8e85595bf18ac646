// rest/mod.rs — Public REST API server.
//
// Axum HTTP server mapping the task-tracking API onto storage.
//
// Endpoints:
//   GET    /tasks
//   POST   /tasks
//   PATCH  /tasks/{id}
//   DELETE /tasks/{id}
//   PATCH  /tasks/{id}/status
//   POST   /tasks/{id}/duplicate
//   GET    /tasks/stats
//   GET    /tasks/report
//   GET    /genres
//   POST   /genres
//   GET    /health

pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/health", get(routes::health::health))
        // Tasks
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/tasks/stats", get(routes::tasks::stats))
        .route("/tasks/report", get(routes::tasks::report))
        .route(
            "/tasks/{id}",
            patch(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/tasks/{id}/status", patch(routes::tasks::update_status))
        .route("/tasks/{id}/duplicate", post(routes::tasks::duplicate_task))
        // Genres
        .route(
            "/genres",
            get(routes::genres::list_genres).post(routes::genres::create_genre),
        )
        // Browser clients talk cross-origin; the API carries no credentials.
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
