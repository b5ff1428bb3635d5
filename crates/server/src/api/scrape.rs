//! Synchronous scraping endpoint.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use pagescope_core::{FetchError, PipelineError, ScrapeResult};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UrlBody {
    url: Option<String>,
}

/// Pick the target URL from the query string, falling back to a JSON body.
pub(crate) fn requested_url(query: UrlQuery, body: &Bytes) -> Result<String, ApiError> {
    if let Some(url) = query.url {
        return Ok(url);
    }

    if !body.is_empty() {
        let parsed: UrlBody = serde_json::from_slice(body).map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, format!("invalid JSON body: {}", e))
        })?;
        if let Some(url) = parsed.url {
            return Ok(url);
        }
    }

    Err(api_error(
        StatusCode::BAD_REQUEST,
        "missing required parameter: url",
    ))
}

/// HTTP status for a pipeline failure.
pub fn error_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        PipelineError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        PipelineError::Fetch(FetchError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        PipelineError::Fetch(_) => StatusCode::BAD_GATEWAY,
        PipelineError::GateClosed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn pipeline_error(err: PipelineError) -> ApiError {
    api_error(error_status(&err), err.to_string())
}

/// `GET|POST /scrape`: run the whole pipeline and return its result.
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
    body: Bytes,
) -> Result<Json<ScrapeResult>, ApiError> {
    let url = requested_url(query, &body)?;

    match state.orchestrator().run_pipeline(&url).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            warn!(url = %url, error = %e, "Scrape failed");
            Err(pipeline_error(e))
        }
    }
}
