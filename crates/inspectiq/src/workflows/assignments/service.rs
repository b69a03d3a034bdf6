use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::domain::{
    NewWorkItem, ReviewVerdict, WorkItem, WorkItemFilter, WorkItemId, WorkItemPatch,
    WorkItemStatus,
};
use super::repository::{OpenDirectory, ReferenceResolver, WorkItemReferences, WorkItemRepository};
use crate::workflows::{Clock, WorkflowError};

const ENTITY: &str = "work item";

static WORK_ITEM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_work_item_id() -> WorkItemId {
    let id = WORK_ITEM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    WorkItemId(format!("wi-{id:06}"))
}

/// Tracks inspection obligations from creation to second-tier closure.
pub struct AssignmentLifecycle<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    directory: Arc<dyn ReferenceResolver>,
    references: Option<Arc<dyn WorkItemReferences>>,
}

impl<R> AssignmentLifecycle<R>
where
    R: WorkItemRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            directory: Arc::new(OpenDirectory),
            references: None,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn ReferenceResolver>) -> Self {
        self.directory = directory;
        self
    }

    /// Guard deletions against work items that inspection reports still point at.
    pub fn with_references(mut self, references: Arc<dyn WorkItemReferences>) -> Self {
        self.references = Some(references);
        self
    }

    pub fn create(&self, request: NewWorkItem) -> Result<WorkItem, WorkflowError> {
        let now = self.clock.now();
        let site_id = request.site_id.trim().to_string();
        let assignee_id = request.assignee_id.trim().to_string();
        let category = request.category.trim().to_string();

        if site_id.is_empty() || !self.directory.site_exists(&site_id) {
            return Err(WorkflowError::validation(format!(
                "site reference '{site_id}' does not resolve"
            )));
        }
        if assignee_id.is_empty() || !self.directory.assignee_exists(&assignee_id) {
            return Err(WorkflowError::validation(format!(
                "assignee reference '{assignee_id}' does not resolve"
            )));
        }
        if category.is_empty() {
            return Err(WorkflowError::validation("category is required"));
        }
        if request.deadline <= now {
            return Err(WorkflowError::validation(format!(
                "deadline {} must be after {}",
                request.deadline.to_rfc3339(),
                now.to_rfc3339()
            )));
        }

        let item = WorkItem {
            id: next_work_item_id(),
            site_id,
            assignee_id,
            category,
            deadline: request.deadline,
            priority: request.priority,
            instructions: request.instructions.filter(|text| !text.trim().is_empty()),
            status: WorkItemStatus::Pending,
            final_status: None,
            second_tier_reviewed: false,
            second_tier_verdict: None,
            second_tier_reviewed_by: None,
            second_tier_reviewed_at: None,
            completed_by: None,
            completed_at: None,
            created_at: now,
            revision: 0,
        };

        let stored = self
            .repository
            .insert(item)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, "new"))?;
        info!(work_item = %stored.id.0, site = %stored.site_id, assignee = %stored.assignee_id, "work item created");
        Ok(stored)
    }

    pub fn get(&self, id: &WorkItemId) -> Result<WorkItem, WorkflowError> {
        self.repository
            .fetch(id)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, id.as_str()))?
            .ok_or_else(|| WorkflowError::not_found(ENTITY, id.as_str()))
    }

    /// Administrative edit of a still-pending item.
    pub fn update(&self, id: &WorkItemId, patch: WorkItemPatch) -> Result<WorkItem, WorkflowError> {
        if patch.is_empty() {
            return self.get(id);
        }

        let mut item = self.get(id)?;
        if item.status != WorkItemStatus::Pending {
            return Err(WorkflowError::precondition(
                "work item edit",
                item.status.label(),
            ));
        }

        if let Some(deadline) = patch.deadline {
            if deadline <= self.clock.now() {
                return Err(WorkflowError::validation("deadline must be in the future"));
            }
            item.deadline = deadline;
        }
        if let Some(assignee_id) = patch.assignee_id {
            let assignee_id = assignee_id.trim().to_string();
            if assignee_id.is_empty() || !self.directory.assignee_exists(&assignee_id) {
                return Err(WorkflowError::validation(format!(
                    "assignee reference '{assignee_id}' does not resolve"
                )));
            }
            item.assignee_id = assignee_id;
        }
        if let Some(priority) = patch.priority {
            item.priority = priority;
        }
        if let Some(instructions) = patch.instructions {
            item.instructions = Some(instructions).filter(|text| !text.trim().is_empty());
        }

        self.write(item)
    }

    /// Administrative removal; refused while any inspection report references the item.
    pub fn delete(&self, id: &WorkItemId) -> Result<(), WorkflowError> {
        let item = self.get(id)?;
        if let Some(references) = &self.references {
            let referenced = references
                .is_referenced(&item.id)
                .map_err(|err| WorkflowError::from_repository(err, ENTITY, id.as_str()))?;
            if referenced {
                return Err(WorkflowError::precondition(
                    "work item deletion",
                    "referenced by an inspection report",
                ));
            }
        }
        self.repository
            .delete(id)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, id.as_str()))?;
        info!(work_item = %id.0, "work item deleted");
        Ok(())
    }

    /// Close the item. Repeating the call returns the stored record untouched.
    pub fn mark_completed(
        &self,
        id: &WorkItemId,
        completed_by: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<WorkItem, WorkflowError> {
        let mut item = self.get(id)?;
        if item.is_completed() {
            debug!(work_item = %id.0, "work item already completed");
            return Ok(item);
        }

        item.status = WorkItemStatus::Completed;
        item.completed_by = Some(completed_by.to_string());
        item.completed_at = Some(completed_at);

        match self.write(item) {
            Ok(stored) => {
                info!(work_item = %id.0, completed_by, "work item completed");
                Ok(stored)
            }
            // A concurrent retry may have won; accept its result if it completed the item.
            Err(WorkflowError::Conflict { .. }) => {
                let current = self.get(id)?;
                if current.is_completed() {
                    Ok(current)
                } else {
                    Err(WorkflowError::Conflict {
                        entity: ENTITY,
                        id: id.0.clone(),
                    })
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Record the second-tier outcome on a completed item. Set at most once.
    pub fn mark_second_tier_reviewed(
        &self,
        id: &WorkItemId,
        verdict: ReviewVerdict,
        reviewed_by: &str,
        reviewed_at: DateTime<Utc>,
    ) -> Result<WorkItem, WorkflowError> {
        let mut item = self.get(id)?;
        if !item.is_completed() {
            return Err(WorkflowError::precondition(
                "second-tier review",
                item.status.label(),
            ));
        }
        if item.second_tier_reviewed {
            debug!(work_item = %id.0, "work item already second-tier reviewed");
            return Ok(item);
        }

        item.second_tier_reviewed = true;
        item.second_tier_verdict = Some(verdict);
        item.second_tier_reviewed_by = Some(reviewed_by.to_string());
        item.second_tier_reviewed_at = Some(reviewed_at);
        item.final_status = Some("completed".to_string());

        let stored = self.write(item)?;
        info!(work_item = %id.0, verdict = verdict.label(), "work item closed by second-tier review");
        Ok(stored)
    }

    /// Snapshot of matching items, newest first. Iterating the result again restarts it.
    pub fn list(&self, filter: &WorkItemFilter) -> Result<Vec<WorkItem>, WorkflowError> {
        let mut items = self
            .repository
            .list(filter)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, "*"))?;
        items.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(items)
    }

    fn write(&self, item: WorkItem) -> Result<WorkItem, WorkflowError> {
        let id = item.id.clone();
        let expected = item.revision;
        self.repository
            .update(item, expected)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, id.as_str()))
    }
}
