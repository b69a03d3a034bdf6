use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::ApprovalToken;
use crate::workflows::assignments::WorkItemId;

/// Identifier wrapper for consent tickets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Approved,
}

impl TicketStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Approved => "approved",
        }
    }
}

/// How a ticket reached `approved`; kept for audit so overrides stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMethod {
    LinkClick,
    ManualSimulation,
}

/// Who is being asked to consent, copied from the site record when the ticket is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteContact {
    pub site_name: String,
    pub approver_name: String,
    pub approver_email: String,
}

/// Inspector-side request for a consent ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub work_item_id: WorkItemId,
    pub site_id: String,
    #[serde(flatten)]
    pub contact: SiteContact,
}

/// Informational e-mail dispatch record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMetadata {
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_response: Option<String>,
}

/// Pending third-party consent request, unique per (work item, site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTicket {
    pub id: TicketId,
    pub work_item_id: WorkItemId,
    pub site_id: String,
    pub contact: SiteContact,
    pub requester_id: String,
    pub requester_name: String,
    pub requester_role: String,
    pub approved: bool,
    pub status: TicketStatus,
    pub token: ApprovalToken,
    pub requested_at: DateTime<Utc>,
    pub dispatch: DispatchMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_method: Option<ApprovalMethod>,
    pub updated_at: DateTime<Utc>,
    pub revision: u64,
}

impl ApprovalTicket {
    /// Status fields without the token, for polling clients.
    pub fn status_view(&self) -> TicketStatusView {
        TicketStatusView {
            ticket_id: self.id.clone(),
            work_item_id: self.work_item_id.clone(),
            site_id: self.site_id.clone(),
            approved: self.approved,
            status: self.status.label(),
            approved_at: self.approved_at,
            approved_by: self.approved_by.clone(),
            approval_method: self.approval_method,
            email_sent: self.dispatch.sent,
        }
    }
}

/// Result of a fresh or repeated ticket request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketGrant {
    pub ticket: ApprovalTicket,
    pub verification_url: String,
    pub newly_created: bool,
}

/// Outcome of a verification link click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Approved(ApprovalTicket),
    AlreadyApproved(ApprovalTicket),
}

impl VerifyOutcome {
    pub fn ticket(&self) -> &ApprovalTicket {
        match self {
            VerifyOutcome::Approved(ticket) | VerifyOutcome::AlreadyApproved(ticket) => ticket,
        }
    }
}

/// Sanitized ticket state returned to polling clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketStatusView {
    pub ticket_id: TicketId,
    pub work_item_id: WorkItemId,
    pub site_id: String,
    pub approved: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_method: Option<ApprovalMethod>,
    pub email_sent: bool,
}
