use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{DispatchMetadata, TicketId, TicketRequest, VerifyOutcome};
use super::repository::TicketRepository;
use super::service::ApprovalTicketService;
use crate::workflows::assignments::WorkItemId;
use crate::workflows::notify::{escape_html, NotificationDispatcher};
use crate::workflows::{Actor, WorkflowError};

/// Router builder exposing the consent handshake, including the public verification page.
pub fn approval_router<R, N>(service: Arc<ApprovalTicketService<R, N>>) -> Router
where
    R: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/approvals", post(request_handler::<R, N>))
        .route("/api/v1/approvals/status", get(status_handler::<R, N>))
        .route("/api/v1/approvals/simulate", post(simulate_handler::<R, N>))
        .route("/api/v1/approvals/:ticket_id", put(dispatch_handler::<R, N>))
        .route("/approvals/verify", get(verify_handler::<R, N>))
        .with_state(service)
}

/// Query parameters use the link's camelCase names; both are optional so the handlers can
/// answer a missing pair with a readable error instead of a bare extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PairQuery {
    #[serde(rename = "workItemId", default)]
    work_item_id: Option<String>,
    #[serde(rename = "siteId", default)]
    site_id: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

impl PairQuery {
    fn pair(&self) -> Option<(WorkItemId, &str)> {
        let work_item_id = self.work_item_id.as_deref().filter(|id| !id.is_empty())?;
        let site_id = self.site_id.as_deref().filter(|id| !id.is_empty())?;
        Some((WorkItemId(work_item_id.to_string()), site_id))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimulateRequest {
    work_item_id: WorkItemId,
    site_id: String,
}

pub(crate) async fn request_handler<R, N>(
    State(service): State<Arc<ApprovalTicketService<R, N>>>,
    actor: Actor,
    Json(request): Json<TicketRequest>,
) -> Response
where
    R: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.request_ticket(request, &actor) {
        Ok(grant) => {
            let status = if grant.newly_created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            let payload = json!({
                "ticket": grant.ticket.status_view(),
                "verification_url": grant.verification_url,
                "newly_created": grant.newly_created,
            });
            (status, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<ApprovalTicketService<R, N>>>,
    _actor: Actor,
    Query(query): Query<PairQuery>,
) -> Response
where
    R: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some((work_item_id, site_id)) = query.pair() else {
        let payload = json!({ "error": "workItemId and siteId are required" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    };

    match service.poll_status(&work_item_id, site_id) {
        Ok(ticket) => (StatusCode::OK, Json(ticket.status_view())).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn simulate_handler<R, N>(
    State(service): State<Arc<ApprovalTicketService<R, N>>>,
    actor: Actor,
    Json(request): Json<SimulateRequest>,
) -> Response
where
    R: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.simulate_approval(&request.work_item_id, &request.site_id) {
        Ok(ticket) => {
            tracing::info!(actor = %actor.id, ticket = %ticket.id.0, "approval simulated by operator");
            (StatusCode::OK, Json(ticket.status_view())).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn dispatch_handler<R, N>(
    State(service): State<Arc<ApprovalTicketService<R, N>>>,
    _actor: Actor,
    Path(ticket_id): Path<String>,
    Json(dispatch): Json<DispatchMetadata>,
) -> Response
where
    R: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.record_dispatch(&TicketId(ticket_id), dispatch) {
        Ok(ticket) => (StatusCode::OK, Json(ticket.status_view())).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Public page the site principal lands on from the e-mail link. No session required.
pub(crate) async fn verify_handler<R, N>(
    State(service): State<Arc<ApprovalTicketService<R, N>>>,
    Query(query): Query<PairQuery>,
) -> Response
where
    R: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let token = query.token.as_deref().filter(|token| !token.is_empty());
    let (Some(token), Some((work_item_id, site_id))) = (token, query.pair()) else {
        return page(
            StatusCode::BAD_REQUEST,
            "Missing Parameters",
            "The approval link is incomplete. Please use the full link from the e-mail.",
        );
    };

    match service.verify(token, &work_item_id, site_id) {
        Ok(VerifyOutcome::Approved(ticket)) => page(
            StatusCode::OK,
            "Inspection Approved",
            &format!(
                "Thank you. The inspection of {} has been approved and the inspector has been notified.",
                ticket.contact.site_name
            ),
        ),
        Ok(VerifyOutcome::AlreadyApproved(ticket)) => page(
            StatusCode::OK,
            "Already Approved",
            &format!(
                "The inspection of {} was already approved. No further action is needed.",
                ticket.contact.site_name
            ),
        ),
        Err(WorkflowError::NotFound { .. }) => page(
            StatusCode::NOT_FOUND,
            "Invalid or Expired Approval Link",
            "This approval link is not valid. Please contact the inspector for a new request.",
        ),
        Err(error) => {
            tracing::warn!(%error, "approval link verification failed");
            page(
                error.status_code(),
                "Approval Unavailable",
                "The approval could not be recorded right now. Please try the link again later.",
            )
        }
    }
}

fn page(status: StatusCode, title: &str, message: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{message}</p></body></html>",
        title = escape_html(title),
        message = escape_html(message),
    );
    (status, Html(body)).into_response()
}
