//! Third-party consent handshake: a single-use ticket per (work item, site), a public
//! verification link carrying an unguessable token, and client-side status polling.

pub mod domain;
pub mod poller;
pub mod repository;
pub mod router;
pub mod service;
mod token;

pub use domain::{
    ApprovalMethod, ApprovalTicket, DispatchMetadata, SiteContact, TicketGrant, TicketId,
    TicketRequest, TicketStatus, TicketStatusView, VerifyOutcome,
};
pub use poller::{ApprovalPoller, PollHandle, PollOutcome, PollSettings, TicketStatusSource};
pub use repository::TicketRepository;
pub use router::approval_router;
pub use service::ApprovalTicketService;
pub use token::ApprovalToken;
