use super::domain::{ApprovalTicket, TicketId};
use crate::workflows::assignments::WorkItemId;
use crate::workflows::RepositoryError;

/// Storage abstraction for consent tickets.
///
/// Implementations enforce the (work item, site) uniqueness themselves: `insert` fails with
/// [`RepositoryError::Conflict`] when a ticket for the pair already exists, so concurrent
/// first requests cannot both land. `update` is revision-checked like the other stores.
pub trait TicketRepository: Send + Sync {
    fn insert(&self, ticket: ApprovalTicket) -> Result<ApprovalTicket, RepositoryError>;
    fn update(
        &self,
        ticket: ApprovalTicket,
        expected_revision: u64,
    ) -> Result<ApprovalTicket, RepositoryError>;
    fn fetch(&self, id: &TicketId) -> Result<Option<ApprovalTicket>, RepositoryError>;
    fn find_by_pair(
        &self,
        work_item_id: &WorkItemId,
        site_id: &str,
    ) -> Result<Option<ApprovalTicket>, RepositoryError>;
}
