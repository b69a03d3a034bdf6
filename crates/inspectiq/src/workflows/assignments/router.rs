use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{NewWorkItem, WorkItemFilter, WorkItemId, WorkItemPatch};
use super::repository::WorkItemRepository;
use super::service::AssignmentLifecycle;
use crate::workflows::Actor;

/// Router builder exposing the administrative work-item endpoints.
pub fn assignment_router<R>(service: Arc<AssignmentLifecycle<R>>) -> Router
where
    R: WorkItemRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/assignments",
            post(create_handler::<R>).get(list_handler::<R>),
        )
        .route(
            "/api/v1/assignments/:work_item_id",
            get(get_handler::<R>)
                .put(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<AssignmentLifecycle<R>>>,
    actor: Actor,
    Json(request): Json<NewWorkItem>,
) -> Response
where
    R: WorkItemRepository + 'static,
{
    tracing::debug!(actor = %actor.id, "create work item");
    match service.create(request) {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<AssignmentLifecycle<R>>>,
    _actor: Actor,
    Query(filter): Query<WorkItemFilter>,
) -> Response
where
    R: WorkItemRepository + 'static,
{
    match service.list(&filter) {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<AssignmentLifecycle<R>>>,
    _actor: Actor,
    Path(work_item_id): Path<String>,
) -> Response
where
    R: WorkItemRepository + 'static,
{
    match service.get(&WorkItemId(work_item_id)) {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<AssignmentLifecycle<R>>>,
    _actor: Actor,
    Path(work_item_id): Path<String>,
    Json(patch): Json<WorkItemPatch>,
) -> Response
where
    R: WorkItemRepository + 'static,
{
    match service.update(&WorkItemId(work_item_id), patch) {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<AssignmentLifecycle<R>>>,
    actor: Actor,
    Path(work_item_id): Path<String>,
) -> Response
where
    R: WorkItemRepository + 'static,
{
    let id = WorkItemId(work_item_id);
    match service.delete(&id) {
        Ok(()) => {
            tracing::info!(actor = %actor.id, work_item = %id.0, "work item removed by administrator");
            (StatusCode::OK, Json(json!({ "msg": "Assignment removed" }))).into_response()
        }
        Err(error) => error.into_response(),
    }
}
