use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{InspectionDraft, InspectionId, InspectionView, ReportFilter, Tier1Decision};
use super::repository::InspectionRepository;
use super::service::InspectionReviewService;
use crate::workflows::approvals::TicketStatusSource;
use crate::workflows::assignments::{ReviewVerdict, WorkItemRepository};
use crate::workflows::notify::NotificationDispatcher;
use crate::workflows::{Actor, EvidenceRef};

type SharedReview<R, W, T, N> = Arc<InspectionReviewService<R, W, T, N>>;

/// Reviewer action carried by `PUT /api/v1/inspections/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewAction {
    Tier1 {
        decision: Tier1Decision,
        signature: EvidenceRef,
    },
    Tier2 {
        verdict: ReviewVerdict,
    },
    Reschedule {
        remarks: String,
    },
}

/// Router builder exposing submission, review decisions, and the reconciliation sweep.
pub fn inspection_router<R, W, T, N>(service: SharedReview<R, W, T, N>) -> Router
where
    R: InspectionRepository + 'static,
    W: WorkItemRepository + 'static,
    T: TicketStatusSource,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/inspections",
            post(submit_handler::<R, W, T, N>).get(list_handler::<R, W, T, N>),
        )
        .route(
            "/api/v1/inspections/reconcile",
            post(reconcile_handler::<R, W, T, N>),
        )
        .route(
            "/api/v1/inspections/:inspection_id",
            get(get_handler::<R, W, T, N>).put(decide_handler::<R, W, T, N>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R, W, T, N>(
    State(service): State<SharedReview<R, W, T, N>>,
    actor: Actor,
    Json(draft): Json<InspectionDraft>,
) -> Response
where
    R: InspectionRepository + 'static,
    W: WorkItemRepository + 'static,
    T: TicketStatusSource,
    N: NotificationDispatcher + 'static,
{
    match service.submit(draft, &actor) {
        Ok(report) => (StatusCode::CREATED, Json(report.view())).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_handler<R, W, T, N>(
    State(service): State<SharedReview<R, W, T, N>>,
    _actor: Actor,
    Query(filter): Query<ReportFilter>,
) -> Response
where
    R: InspectionRepository + 'static,
    W: WorkItemRepository + 'static,
    T: TicketStatusSource,
    N: NotificationDispatcher + 'static,
{
    match service.list(&filter) {
        Ok(reports) => {
            let views: Vec<InspectionView> = reports.iter().map(|report| report.view()).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn get_handler<R, W, T, N>(
    State(service): State<SharedReview<R, W, T, N>>,
    _actor: Actor,
    Path(inspection_id): Path<String>,
) -> Response
where
    R: InspectionRepository + 'static,
    W: WorkItemRepository + 'static,
    T: TicketStatusSource,
    N: NotificationDispatcher + 'static,
{
    match service.get(&InspectionId(inspection_id)) {
        Ok(report) => (StatusCode::OK, Json(report.view())).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn decide_handler<R, W, T, N>(
    State(service): State<SharedReview<R, W, T, N>>,
    actor: Actor,
    Path(inspection_id): Path<String>,
    Json(action): Json<ReviewAction>,
) -> Response
where
    R: InspectionRepository + 'static,
    W: WorkItemRepository + 'static,
    T: TicketStatusSource,
    N: NotificationDispatcher + 'static,
{
    let id = InspectionId(inspection_id);
    let outcome = match action {
        ReviewAction::Tier1 {
            decision,
            signature,
        } => service.tier1_decide(&id, decision, &actor, signature),
        ReviewAction::Tier2 { verdict } => service.tier2_decide(&id, verdict, &actor),
        ReviewAction::Reschedule { remarks } => service.request_reschedule(&id, &actor, &remarks),
    };

    match outcome {
        Ok(report) => (StatusCode::OK, Json(report.view())).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn reconcile_handler<R, W, T, N>(
    State(service): State<SharedReview<R, W, T, N>>,
    actor: Actor,
) -> Response
where
    R: InspectionRepository + 'static,
    W: WorkItemRepository + 'static,
    T: TicketStatusSource,
    N: NotificationDispatcher + 'static,
{
    tracing::info!(actor = %actor.id, "reconciliation sweep requested");
    match service.reconcile() {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error.into_response(),
    }
}
