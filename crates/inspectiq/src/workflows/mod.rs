//! Workflow modules: assignments, the consent handshake, and inspection review, plus the
//! collaborator seams they share.

pub mod approvals;
pub mod assignments;
pub mod clock;
pub mod error;
pub mod evidence;
pub mod identity;
pub mod inspections;
pub mod memory;
pub mod notify;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{RepositoryError, WorkflowError};
pub use evidence::{EvidenceError, EvidenceRef, EvidenceStore};
pub use identity::Actor;
pub use notify::{DispatchError, DispatchReceipt, Notification, NotificationDispatcher};

use approvals::{approval_router, ApprovalTicketService, TicketRepository, TicketStatusSource};
use assignments::{assignment_router, AssignmentLifecycle, WorkItemRepository};
use inspections::{inspection_router, InspectionRepository, InspectionReviewService};

/// Every workflow endpoint on one router.
pub fn workflow_router<W, T, N, R, S>(
    assignments: Arc<AssignmentLifecycle<W>>,
    approvals: Arc<ApprovalTicketService<T, N>>,
    review: Arc<InspectionReviewService<R, W, S, N>>,
) -> Router
where
    W: WorkItemRepository + 'static,
    T: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
    R: InspectionRepository + 'static,
    S: TicketStatusSource,
{
    assignment_router(assignments)
        .merge(approval_router(approvals))
        .merge(inspection_router(review))
}
