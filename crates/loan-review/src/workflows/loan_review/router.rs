use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::service::{LoanReviewService, ReviewQuery, ReviewServiceError};
use super::source::ApplicationSource;

pub const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    limit: Option<usize>,
}

/// Router builder exposing application listing and review endpoints.
pub fn review_router<S>(service: Arc<LoanReviewService<S>>) -> Router
where
    S: ApplicationSource + 'static,
{
    Router::new()
        .route("/applications", get(list_handler::<S>))
        .route("/review/:application_id", get(review_handler::<S>))
        .with_state(service)
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<LoanReviewService<S>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: ApplicationSource + 'static,
{
    match service.list(query.limit.unwrap_or(DEFAULT_LIST_LIMIT)) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => {
            error!(error = %err, "failed to list applications");
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn review_handler<S>(
    State(service): State<Arc<LoanReviewService<S>>>,
    Path(application_id): Path<String>,
    Query(query): Query<ReviewQuery>,
) -> Response
where
    S: ApplicationSource + 'static,
{
    let lookup = application_id.clone();
    let outcome = tokio::task::spawn_blocking(move || service.review(&lookup, &query)).await;

    match outcome {
        Ok(Ok(record)) => (StatusCode::OK, axum::Json(record)).into_response(),
        Ok(Err(ReviewServiceError::NotFound(_))) => {
            let payload = json!({
                "application_id": application_id,
                "error": "application not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Ok(Err(ReviewServiceError::InvalidInput(err))) => {
            let payload = json!({
                "application_id": application_id,
                "error": err.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Ok(Err(other)) => {
            error!(error = %other, %application_id, "review failed");
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
        Err(join_error) => {
            error!(error = %join_error, %application_id, "review worker panicked");
            let payload = json!({ "error": "review worker failed" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
