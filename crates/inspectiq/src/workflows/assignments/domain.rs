use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for work items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub String);

impl WorkItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Lifecycle status of an inspection obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkItemStatus {
    Pending,
    Completed,
    UnderReview,
}

impl WorkItemStatus {
    pub const fn label(self) -> &'static str {
        match self {
            WorkItemStatus::Pending => "pending",
            WorkItemStatus::Completed => "completed",
            WorkItemStatus::UnderReview => "under-review",
        }
    }
}

/// Second-tier reviewer's judgement on a completed inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewVerdict {
    Satisfactory,
    NeedsImprovement,
}

impl ReviewVerdict {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewVerdict::Satisfactory => "satisfactory",
            ReviewVerdict::NeedsImprovement => "needs-improvement",
        }
    }
}

/// An obligation to inspect one site by a deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub site_id: String,
    pub assignee_id: String,
    pub category: String,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub status: WorkItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_status: Option<String>,
    pub second_tier_reviewed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_tier_verdict: Option<ReviewVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_tier_reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_tier_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub revision: u64,
}

impl WorkItem {
    pub fn is_completed(&self) -> bool {
        self.status == WorkItemStatus::Completed
    }
}

/// Administrator request to create a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkItem {
    pub site_id: String,
    pub assignee_id: String,
    pub category: String,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Administrative edits; completion fields are only reachable through the lifecycle calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItemPatch {
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl WorkItemPatch {
    pub fn is_empty(&self) -> bool {
        self.assignee_id.is_none()
            && self.deadline.is_none()
            && self.priority.is_none()
            && self.instructions.is_none()
    }
}

/// Listing filter; every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkItemFilter {
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub status: Option<WorkItemStatus>,
}

impl WorkItemFilter {
    pub fn matches(&self, item: &WorkItem) -> bool {
        self.assignee
            .as_deref()
            .map_or(true, |assignee| item.assignee_id == assignee)
            && self
                .category
                .as_deref()
                .map_or(true, |category| item.category.eq_ignore_ascii_case(category))
            && self.site.as_deref().map_or(true, |site| item.site_id == site)
            && self.status.map_or(true, |status| item.status == status)
    }
}
