use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::AllocationRequest;
use super::repository::{AllocationRepository, NoticePublisher, RepositoryError, RunId};
use super::service::{AllocationService, AllocationServiceError};

const DEFAULT_RECENT_LIMIT: usize = 20;

/// Router exposing allocation runs over HTTP.
pub fn allocation_router<R, N>(service: Arc<AllocationService<R, N>>) -> Router
where
    R: AllocationRepository + 'static,
    N: NoticePublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/allocations",
            post(run_handler::<R, N>).get(recent_handler::<R, N>),
        )
        .route("/api/v1/allocations/:run_id", get(record_handler::<R, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentQuery {
    limit: Option<usize>,
}

pub(crate) async fn run_handler<R, N>(
    State(service): State<Arc<AllocationService<R, N>>>,
    axum::Json(request): axum::Json<AllocationRequest>,
) -> Response
where
    R: AllocationRepository + 'static,
    N: NoticePublisher + 'static,
{
    match service.run(request) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(AllocationServiceError::Setup(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(AllocationServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({
                "error": "allocation run already exists",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn record_handler<R, N>(
    State(service): State<Arc<AllocationService<R, N>>>,
    Path(run_id): Path<String>,
) -> Response
where
    R: AllocationRepository + 'static,
    N: NoticePublisher + 'static,
{
    let id = RunId(run_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(AllocationServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "run_id": id.0,
                "error": "allocation run not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn recent_handler<R, N>(
    State(service): State<Arc<AllocationService<R, N>>>,
    Query(query): Query<RecentQuery>,
) -> Response
where
    R: AllocationRepository + 'static,
    N: NoticePublisher + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    match service.recent(limit) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
