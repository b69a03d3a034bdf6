use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::domain::{
    ApprovalMethod, ApprovalTicket, DispatchMetadata, TicketGrant, TicketId, TicketRequest,
    TicketStatus, VerifyOutcome,
};
use super::repository::TicketRepository;
use super::token::ApprovalToken;
use crate::workflows::assignments::WorkItemId;
use crate::workflows::notify::{escape_html, Notification, NotificationDispatcher};
use crate::workflows::{Actor, Clock, RepositoryError, WorkflowError};

const ENTITY: &str = "approval ticket";
const LINK_APPROVER: &str = "Email Link (Principal)";
const SIMULATED_APPROVER: &str = "principal_simulation";

static TICKET_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_ticket_id() -> TicketId {
    let id = TICKET_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TicketId(format!("appr-{id:06}"))
}

/// Identifiers end up unescaped in the verification link, so keep them to a safe alphabet.
fn validate_link_component(field: &str, value: &str) -> Result<(), WorkflowError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(WorkflowError::validation(format!(
            "{field} must be non-empty and contain only letters, digits, '-', '_' or '.'"
        )))
    }
}

fn pair_label(work_item_id: &WorkItemId, site_id: &str) -> String {
    format!("{}/{}", work_item_id.0, site_id)
}

/// Runs the out-of-band consent handshake between inspector and site principal.
pub struct ApprovalTicketService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    public_base_url: String,
}

impl<R, N> ApprovalTicketService<R, N>
where
    R: TicketRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            notifier,
            clock,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn verification_url(&self, ticket: &ApprovalTicket) -> String {
        format!(
            "{}/approvals/verify?token={}&workItemId={}&siteId={}",
            self.public_base_url,
            ticket.token.as_str(),
            ticket.work_item_id.0,
            ticket.site_id
        )
    }

    /// Create-or-fetch. A repeated request returns the existing ticket and sends no e-mail.
    pub fn request_ticket(
        &self,
        request: TicketRequest,
        requester: &Actor,
    ) -> Result<TicketGrant, WorkflowError> {
        validate_link_component("work_item_id", &request.work_item_id.0)?;
        validate_link_component("site_id", &request.site_id)?;
        if request.contact.site_name.trim().is_empty() {
            return Err(WorkflowError::validation("site_name is required"));
        }
        if !request.contact.approver_email.contains('@') {
            return Err(WorkflowError::validation(
                "approver_email must be an e-mail address",
            ));
        }

        if let Some(existing) = self.find(&request.work_item_id, &request.site_id)? {
            debug!(ticket = %existing.id.0, "consent ticket already requested");
            return Ok(self.grant(existing, false));
        }

        let now = self.clock.now();
        let work_item_id = request.work_item_id.clone();
        let site_id = request.site_id.clone();
        let ticket = ApprovalTicket {
            id: next_ticket_id(),
            work_item_id: request.work_item_id,
            site_id: request.site_id,
            contact: request.contact,
            requester_id: requester.id.clone(),
            requester_name: requester.name.clone(),
            requester_role: requester.role.clone(),
            approved: false,
            status: TicketStatus::Pending,
            token: ApprovalToken::mint(),
            requested_at: now,
            dispatch: DispatchMetadata::default(),
            approved_at: None,
            approved_by: None,
            approval_method: None,
            updated_at: now,
            revision: 0,
        };

        let stored = match self.repository.insert(ticket) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                // A concurrent first request for the same pair won the insert.
                let existing = self.find(&work_item_id, &site_id)?.ok_or_else(|| {
                    WorkflowError::Conflict {
                        entity: ENTITY,
                        id: pair_label(&work_item_id, &site_id),
                    }
                })?;
                return Ok(self.grant(existing, false));
            }
            Err(other) => {
                return Err(WorkflowError::from_repository(
                    other,
                    ENTITY,
                    &pair_label(&work_item_id, &site_id),
                ))
            }
        };

        info!(ticket = %stored.id.0, work_item = %stored.work_item_id.0, site = %stored.site_id, "consent ticket issued");
        let stored = self.send_request_email(stored);
        Ok(self.grant(stored, true))
    }

    /// Public link handler. The token is the credential; no session is required.
    pub fn verify(
        &self,
        token: &str,
        work_item_id: &WorkItemId,
        site_id: &str,
    ) -> Result<VerifyOutcome, WorkflowError> {
        let ticket = self
            .find(work_item_id, site_id)?
            .filter(|ticket| ticket.token.matches(token))
            .ok_or_else(|| WorkflowError::not_found("approval link", pair_label(work_item_id, site_id)))?;

        self.approve(ticket, ApprovalMethod::LinkClick, LINK_APPROVER)
    }

    /// Read-only status fetch for polling clients.
    pub fn poll_status(
        &self,
        work_item_id: &WorkItemId,
        site_id: &str,
    ) -> Result<ApprovalTicket, WorkflowError> {
        self.find(work_item_id, site_id)?
            .ok_or_else(|| WorkflowError::not_found(ENTITY, pair_label(work_item_id, site_id)))
    }

    /// Operator override that unblocks a stuck handshake without the e-mail round trip.
    pub fn simulate_approval(
        &self,
        work_item_id: &WorkItemId,
        site_id: &str,
    ) -> Result<ApprovalTicket, WorkflowError> {
        let ticket = self.poll_status(work_item_id, site_id)?;
        let outcome = self.approve(ticket, ApprovalMethod::ManualSimulation, SIMULATED_APPROVER)?;
        if let VerifyOutcome::Approved(ticket) = &outcome {
            warn!(ticket = %ticket.id.0, "consent ticket approved by manual simulation");
        }
        Ok(outcome.ticket().clone())
    }

    /// Patch the informational e-mail metadata. Approval fields and the token stay untouched.
    pub fn record_dispatch(
        &self,
        ticket_id: &TicketId,
        dispatch: DispatchMetadata,
    ) -> Result<ApprovalTicket, WorkflowError> {
        let mut ticket = self
            .repository
            .fetch(ticket_id)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, &ticket_id.0))?
            .ok_or_else(|| WorkflowError::not_found(ENTITY, ticket_id.0.as_str()))?;

        ticket.dispatch = dispatch;
        ticket.updated_at = self.clock.now();
        self.write(ticket)
    }

    fn approve(
        &self,
        mut ticket: ApprovalTicket,
        method: ApprovalMethod,
        approved_by: &str,
    ) -> Result<VerifyOutcome, WorkflowError> {
        if ticket.approved {
            return Ok(VerifyOutcome::AlreadyApproved(ticket));
        }

        let now = self.clock.now();
        let id = ticket.id.clone();
        ticket.approved = true;
        ticket.status = TicketStatus::Approved;
        ticket.approved_at = Some(now);
        ticket.approved_by = Some(approved_by.to_string());
        ticket.approval_method = Some(method);
        ticket.updated_at = now;

        match self.write(ticket) {
            Ok(stored) => {
                info!(ticket = %stored.id.0, method = ?method, "consent ticket approved");
                Ok(VerifyOutcome::Approved(stored))
            }
            // Two clicks racing: whoever landed first approved it, which is all we need.
            Err(WorkflowError::Conflict { .. }) => {
                let current = self
                    .repository
                    .fetch(&id)
                    .map_err(|err| WorkflowError::from_repository(err, ENTITY, &id.0))?
                    .ok_or_else(|| WorkflowError::not_found(ENTITY, id.0.as_str()))?;
                if current.approved {
                    Ok(VerifyOutcome::AlreadyApproved(current))
                } else {
                    Err(WorkflowError::Conflict {
                        entity: ENTITY,
                        id: id.0,
                    })
                }
            }
            Err(other) => Err(other),
        }
    }

    fn send_request_email(&self, ticket: ApprovalTicket) -> ApprovalTicket {
        let link = self.verification_url(&ticket);
        let notification = approval_request_notification(&ticket, &link);

        let receipt = match self.notifier.dispatch(notification) {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(ticket = %ticket.id.0, %error, "consent e-mail dispatch failed");
                return ticket;
            }
        };

        let dispatch = DispatchMetadata {
            sent: true,
            sent_at: Some(self.clock.now()),
            provider: Some(receipt.provider),
            provider_response: Some(receipt.response),
        };
        let fallback = ticket.clone();
        match self.record_dispatch(&ticket.id, dispatch) {
            Ok(updated) => updated,
            Err(error) => {
                warn!(ticket = %fallback.id.0, %error, "failed to record consent e-mail metadata");
                fallback
            }
        }
    }

    fn grant(&self, ticket: ApprovalTicket, newly_created: bool) -> TicketGrant {
        TicketGrant {
            verification_url: self.verification_url(&ticket),
            ticket,
            newly_created,
        }
    }

    fn find(
        &self,
        work_item_id: &WorkItemId,
        site_id: &str,
    ) -> Result<Option<ApprovalTicket>, WorkflowError> {
        self.repository
            .find_by_pair(work_item_id, site_id)
            .map_err(|err| {
                WorkflowError::from_repository(err, ENTITY, &pair_label(work_item_id, site_id))
            })
    }

    fn write(&self, ticket: ApprovalTicket) -> Result<ApprovalTicket, WorkflowError> {
        let id = ticket.id.clone();
        let expected = ticket.revision;
        self.repository
            .update(ticket, expected)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, &id.0))
    }
}

fn approval_request_notification(ticket: &ApprovalTicket, link: &str) -> Notification {
    let site = &ticket.contact.site_name;
    let html_body = format!(
        "<html><body><h1>Approval Needed</h1>\
         <p>{inspector} ({role}) requests your consent for the inspection of <strong>{site}</strong>.</p>\
         <p><a href=\"{link}\">Approve</a></p></body></html>",
        inspector = escape_html(&ticket.requester_name),
        role = escape_html(&ticket.requester_role),
        site = escape_html(site),
        link = escape_html(link),
    );
    let text_body = format!(
        "{} ({}) requests your consent for the inspection of {}. Approve: {}",
        ticket.requester_name, ticket.requester_role, site, link
    );

    Notification {
        template: "site_consent_request".to_string(),
        recipient: ticket.contact.approver_email.clone(),
        recipient_name: ticket.contact.approver_name.clone(),
        subject: format!("Inspection approval required - {site}"),
        html_body,
        text_body,
    }
}
