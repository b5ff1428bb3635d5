use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, scrape, tasks};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness and introspection
        .route("/", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/stats", get(handlers::get_stats))
        .route("/metrics", get(handlers::get_metrics))
        // Synchronous pipeline
        .route("/scrape", get(scrape::scrape).post(scrape::scrape))
        // Background tasks
        .route("/tasks", post(tasks::create_task))
        .route("/status/{id}", get(tasks::get_task_status))
        .route("/result/{id}", get(tasks::get_task_result))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
