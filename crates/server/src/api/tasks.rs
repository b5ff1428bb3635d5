//! Background task endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use pagescope_core::{ScrapeResult, TaskRecord, TaskStatus};

use super::handlers::{api_error, ApiError};
use super::scrape::{pipeline_error, requested_url, UrlQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TaskCreatedResponse {
    pub task_id: String,
    pub status: TaskStatus,
}

#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub url: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TaskRecord> for TaskStatusResponse {
    fn from(record: TaskRecord) -> Self {
        Self {
            task_id: record.id,
            status: record.status,
            url: record.url,
            created_at: record.created_at.to_rfc3339(),
            error: record.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResultResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub url: String,
    pub result: ScrapeResult,
}

/// Returned with 202 while a task has no result to show.
#[derive(Debug, Serialize)]
pub struct TaskNotReadyResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub url: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn task_not_found(id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("task not found: {}", id))
}

/// `POST /tasks`: queue a pipeline run and return its id immediately.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<TaskCreatedResponse>), ApiError> {
    let url = requested_url(query, &body)?;

    match state.orchestrator().create_task(&url).await {
        Ok(task_id) => {
            info!(task_id = %task_id, url = %url, "Task submitted");
            Ok((
                StatusCode::ACCEPTED,
                Json(TaskCreatedResponse {
                    task_id,
                    status: TaskStatus::Pending,
                }),
            ))
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Task rejected");
            Err(pipeline_error(e))
        }
    }
}

/// `GET /status/{id}`
pub async fn get_task_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    state
        .orchestrator()
        .task_status(&id)
        .await
        .map(|record| Json(TaskStatusResponse::from(record)))
        .ok_or_else(|| task_not_found(&id))
}

/// `GET /result/{id}`: 200 with the result once completed, 202 otherwise.
pub async fn get_task_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .orchestrator()
        .task_result(&id)
        .await
        .ok_or_else(|| task_not_found(&id))?;

    match (record.status, record.result) {
        (TaskStatus::Completed, Some(result)) => Ok(Json(TaskResultResponse {
            task_id: record.id,
            status: TaskStatus::Completed,
            url: record.url,
            result,
        })
        .into_response()),
        (status, _) => {
            let message = if status == TaskStatus::Failed {
                "task failed, no result available".to_string()
            } else {
                format!("task is {}, result not ready", status)
            };
            Ok((
                StatusCode::ACCEPTED,
                Json(TaskNotReadyResponse {
                    task_id: record.id,
                    status,
                    url: record.url,
                    message,
                    error: record.error,
                }),
            )
                .into_response())
        }
    }
}
