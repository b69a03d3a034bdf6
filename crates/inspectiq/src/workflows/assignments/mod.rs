//! Assignment lifecycle: work items from creation to second-tier closure.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    NewWorkItem, Priority, ReviewVerdict, WorkItem, WorkItemFilter, WorkItemId, WorkItemPatch,
    WorkItemStatus,
};
pub use repository::{OpenDirectory, ReferenceResolver, WorkItemReferences, WorkItemRepository};
pub use router::assignment_router;
pub use service::AssignmentLifecycle;
