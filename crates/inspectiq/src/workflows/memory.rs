//! Mutex-guarded in-memory stores standing in for a durable keyed document store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::approvals::{ApprovalTicket, TicketId, TicketRepository};
use super::assignments::{WorkItem, WorkItemFilter, WorkItemId, WorkItemReferences, WorkItemRepository};
use super::inspections::{InspectionId, InspectionReport, InspectionRepository, ReportFilter};
use super::RepositoryError;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
}

/// Shared compare-and-set: bump the revision when the caller saw the stored one.
fn swap_checked<K, V>(
    records: &mut HashMap<K, V>,
    key: K,
    mut record: V,
    expected_revision: u64,
    revision: impl Fn(&mut V) -> &mut u64,
) -> Result<V, RepositoryError>
where
    K: std::hash::Hash + Eq,
    V: Clone,
{
    let stored = records.get_mut(&key).ok_or(RepositoryError::NotFound)?;
    if *revision(&mut *stored) != expected_revision {
        return Err(RepositoryError::StaleRevision);
    }
    *revision(&mut record) = expected_revision + 1;
    *stored = record.clone();
    Ok(record)
}

#[derive(Debug, Default, Clone)]
pub struct MemoryWorkItemStore {
    records: Arc<Mutex<HashMap<WorkItemId, WorkItem>>>,
}

impl WorkItemRepository for MemoryWorkItemStore {
    fn insert(&self, item: WorkItem) -> Result<WorkItem, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&item.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn update(&self, item: WorkItem, expected_revision: u64) -> Result<WorkItem, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let key = item.id.clone();
        swap_checked(&mut *guard, key, item, expected_revision, |item| &mut item.revision)
    }

    fn fetch(&self, id: &WorkItemId) -> Result<Option<WorkItem>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn list(&self, filter: &WorkItemFilter) -> Result<Vec<WorkItem>, RepositoryError> {
        let mut items: Vec<WorkItem> = lock(&self.records)?
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        items.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(items)
    }

    fn delete(&self, id: &WorkItemId) -> Result<(), RepositoryError> {
        lock(&self.records)?
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// Ticket store; the pair index makes `insert` reject a second ticket for the same pair.
#[derive(Debug, Default, Clone)]
pub struct MemoryTicketStore {
    inner: Arc<Mutex<TicketTables>>,
}

#[derive(Debug, Default)]
struct TicketTables {
    tickets: HashMap<TicketId, ApprovalTicket>,
    by_pair: HashMap<(WorkItemId, String), TicketId>,
}

impl TicketRepository for MemoryTicketStore {
    fn insert(&self, ticket: ApprovalTicket) -> Result<ApprovalTicket, RepositoryError> {
        let mut guard = lock(&self.inner)?;
        let pair = (ticket.work_item_id.clone(), ticket.site_id.clone());
        if guard.by_pair.contains_key(&pair) || guard.tickets.contains_key(&ticket.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.by_pair.insert(pair, ticket.id.clone());
        guard.tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(ticket)
    }

    fn update(
        &self,
        ticket: ApprovalTicket,
        expected_revision: u64,
    ) -> Result<ApprovalTicket, RepositoryError> {
        let mut guard = lock(&self.inner)?;
        let key = ticket.id.clone();
        swap_checked(&mut guard.tickets, key, ticket, expected_revision, |ticket| {
            &mut ticket.revision
        })
    }

    fn fetch(&self, id: &TicketId) -> Result<Option<ApprovalTicket>, RepositoryError> {
        Ok(lock(&self.inner)?.tickets.get(id).cloned())
    }

    fn find_by_pair(
        &self,
        work_item_id: &WorkItemId,
        site_id: &str,
    ) -> Result<Option<ApprovalTicket>, RepositoryError> {
        let guard = lock(&self.inner)?;
        let pair = (work_item_id.clone(), site_id.to_string());
        Ok(guard
            .by_pair
            .get(&pair)
            .and_then(|id| guard.tickets.get(id))
            .cloned())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryInspectionStore {
    records: Arc<Mutex<HashMap<InspectionId, InspectionReport>>>,
}

impl InspectionRepository for MemoryInspectionStore {
    fn insert(&self, report: InspectionReport) -> Result<InspectionReport, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&report.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(report.id.clone(), report.clone());
        Ok(report)
    }

    fn update(
        &self,
        report: InspectionReport,
        expected_revision: u64,
    ) -> Result<InspectionReport, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let key = report.id.clone();
        swap_checked(&mut *guard, key, report, expected_revision, |report| {
            &mut report.revision
        })
    }

    fn fetch(&self, id: &InspectionId) -> Result<Option<InspectionReport>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn list(&self, filter: &ReportFilter) -> Result<Vec<InspectionReport>, RepositoryError> {
        let mut reports: Vec<InspectionReport> = lock(&self.records)?
            .values()
            .filter(|report| filter.matches(report))
            .cloned()
            .collect();
        reports.sort_by(|left, right| {
            right
                .submitted_at
                .cmp(&left.submitted_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(reports)
    }
}

impl WorkItemReferences for MemoryInspectionStore {
    fn is_referenced(&self, id: &WorkItemId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.records)?
            .values()
            .any(|report| report.work_item_id.as_ref() == Some(id)))
    }
}
