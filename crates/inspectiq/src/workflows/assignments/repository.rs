use super::domain::{WorkItem, WorkItemFilter, WorkItemId};
use crate::workflows::RepositoryError;

/// Storage abstraction for work items.
///
/// `update` is a compare-and-set: the write lands only when the stored revision still equals
/// `expected_revision`, and the stored copy comes back with the revision bumped.
pub trait WorkItemRepository: Send + Sync {
    fn insert(&self, item: WorkItem) -> Result<WorkItem, RepositoryError>;
    fn update(&self, item: WorkItem, expected_revision: u64) -> Result<WorkItem, RepositoryError>;
    fn fetch(&self, id: &WorkItemId) -> Result<Option<WorkItem>, RepositoryError>;
    /// Matching items, most recently created first.
    fn list(&self, filter: &WorkItemFilter) -> Result<Vec<WorkItem>, RepositoryError>;
    fn delete(&self, id: &WorkItemId) -> Result<(), RepositoryError>;
}

/// Directory lookup for the site and assignee references on new work items.
pub trait ReferenceResolver: Send + Sync {
    fn site_exists(&self, site_id: &str) -> bool;
    fn assignee_exists(&self, assignee_id: &str) -> bool;
}

/// Resolver used when no site/user directory is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenDirectory;

impl ReferenceResolver for OpenDirectory {
    fn site_exists(&self, _site_id: &str) -> bool {
        true
    }

    fn assignee_exists(&self, _assignee_id: &str) -> bool {
        true
    }
}

/// Reverse lookup answering whether any inspection report still points at a work item.
pub trait WorkItemReferences: Send + Sync {
    fn is_referenced(&self, id: &WorkItemId) -> Result<bool, RepositoryError>;
}
