use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{DomainId, LineItemId, OrderId};
use super::gateway::CommitError;
use super::repository::{DomainAnalysisSource, LineItemSource, OrderGateway, SourceError};
use super::service::{AssignmentService, AssignmentServiceError};

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub domain_ids: Vec<DomainId>,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub domain_id: DomainId,
}

/// Router exposing the operator commands for an order's assignment session.
pub fn assignment_router<L, D, G>(service: Arc<AssignmentService<L, D, G>>) -> Router
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/orders/:order_id/assignments",
            post(open_handler::<L, D, G>).get(view_handler::<L, D, G>),
        )
        .route(
            "/api/v1/orders/:order_id/assignments/regenerate",
            post(regenerate_handler::<L, D, G>),
        )
        .route(
            "/api/v1/orders/:order_id/assignments/commit",
            post(commit_handler::<L, D, G>),
        )
        .route(
            "/api/v1/orders/:order_id/assignments/:line_item_id",
            put(reassign_handler::<L, D, G>).delete(unassign_handler::<L, D, G>),
        )
        .with_state(service)
}

pub(crate) async fn open_handler<L, D, G>(
    State(service): State<Arc<AssignmentService<L, D, G>>>,
    Path(order_id): Path<String>,
    axum::Json(request): axum::Json<OpenSessionRequest>,
) -> Response
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
{
    let outcome = run_blocking(service, move |service| {
        service.open(&OrderId(order_id), &request.domain_ids)
    });
    match outcome.await {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn view_handler<L, D, G>(
    State(service): State<Arc<AssignmentService<L, D, G>>>,
    Path(order_id): Path<String>,
) -> Response
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
{
    match run_blocking(service, move |service| service.view(&OrderId(order_id))).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn regenerate_handler<L, D, G>(
    State(service): State<Arc<AssignmentService<L, D, G>>>,
    Path(order_id): Path<String>,
) -> Response
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
{
    match run_blocking(service, move |service| service.regenerate(&OrderId(order_id))).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn reassign_handler<L, D, G>(
    State(service): State<Arc<AssignmentService<L, D, G>>>,
    Path((order_id, line_item_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<ReassignRequest>,
) -> Response
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
{
    let outcome = run_blocking(service, move |service| {
        service.reassign(
            &OrderId(order_id),
            &LineItemId(line_item_id),
            &request.domain_id,
        )
    });
    match outcome.await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn unassign_handler<L, D, G>(
    State(service): State<Arc<AssignmentService<L, D, G>>>,
    Path((order_id, line_item_id)): Path<(String, String)>,
) -> Response
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
{
    let outcome = run_blocking(service, move |service| {
        service.unassign(&OrderId(order_id), &LineItemId(line_item_id))
    });
    match outcome.await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn commit_handler<L, D, G>(
    State(service): State<Arc<AssignmentService<L, D, G>>>,
    Path(order_id): Path<String>,
) -> Response
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
{
    match run_blocking(service, move |service| service.commit(&OrderId(order_id))).await {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(response) => response,
    }
}

/// Runs a service command on the blocking pool. Collaborator calls are
/// synchronous and a session lock may be held across one.
async fn run_blocking<L, D, G, T, F>(
    service: Arc<AssignmentService<L, D, G>>,
    command: F,
) -> Result<T, Response>
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
    T: Send + 'static,
    F: FnOnce(&AssignmentService<L, D, G>) -> Result<T, AssignmentServiceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || command(&service)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(error_response(error)),
        Err(join_error) => {
            error!(error = %join_error, "assignment command aborted");
            let payload = json!({ "error": "assignment command aborted" });
            Err((StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response())
        }
    }
}

fn error_response(error: AssignmentServiceError) -> Response {
    let status = match &error {
        AssignmentServiceError::SessionNotFound(_)
        | AssignmentServiceError::Source(SourceError::OrderNotFound(_)) => StatusCode::NOT_FOUND,
        AssignmentServiceError::Session(_) | AssignmentServiceError::NothingToCommit(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AssignmentServiceError::Source(SourceError::Unavailable(_))
        | AssignmentServiceError::Commit(CommitError::Gateway(_)) => StatusCode::BAD_GATEWAY,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
