use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::ReviewState;
use crate::workflows::assignments::{ReviewVerdict, WorkItemId};
use crate::workflows::{Actor, EvidenceRef};

/// Identifier wrapper for inspection reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InspectionId(pub String);

impl InspectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Captured or canonical coordinates. Any field may be missing on partial captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            accuracy: None,
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Site details copied onto the report at submission; later site edits do not touch it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSnapshot {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub site_type: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub principal_name: String,
    #[serde(default)]
    pub principal_phone: String,
}

/// Typed questionnaire answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Boolean(bool),
    Text(String),
    Number(f64),
    Photo(EvidenceRef),
}

impl Answer {
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Boolean(_) => false,
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Number(value) => !value.is_finite(),
            Answer::Photo(reference) => reference.is_blank(),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Answer::Boolean(_) => "boolean",
            Answer::Text(_) => "text",
            Answer::Number(_) => "number",
            Answer::Photo(_) => "photo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoEvidence {
    pub url: EvidenceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub captured_at: DateTime<Utc>,
}

/// Free-text observations. Strengths, improvements, and recommendations are the
/// narrative fields the classifier inspects; remarks are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    #[serde(default)]
    pub strengths: Option<String>,
    #[serde(default)]
    pub improvements: Option<String>,
    #[serde(default)]
    pub recommendations: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl Narrative {
    /// The classifier's narrative fields with their display names, in check order.
    pub fn reviewed_fields(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("Strengths", self.strengths.as_deref()),
            ("Improvements", self.improvements.as_deref()),
            ("Recommendations", self.recommendations.as_deref()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRef {
    pub reference: EvidenceRef,
    pub signed_at: DateTime<Utc>,
}

/// Inspector submission before the classifier runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionDraft {
    pub site_id: String,
    pub site: SiteSnapshot,
    #[serde(default)]
    pub work_item_id: Option<WorkItemId>,
    pub inspection_date: DateTime<Utc>,
    #[serde(default)]
    pub responses: BTreeMap<String, Answer>,
    #[serde(default)]
    pub photos: BTreeMap<String, PhotoEvidence>,
    #[serde(default)]
    pub inspector_location: Option<GeoPoint>,
    #[serde(default)]
    pub site_location: Option<GeoPoint>,
    /// Only consulted for drafts with no work item; linked drafts are checked against the
    /// consent ticket for their (work item, site) pair.
    #[serde(default)]
    pub third_party_approved: bool,
    #[serde(default)]
    pub narrative: Narrative,
    #[serde(default)]
    pub signature: Option<SignatureRef>,
}

/// Overall risk flag. `Pending` only appears when the classifier itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagLevel {
    Green,
    Yellow,
    Red,
    Pending,
}

impl FlagLevel {
    pub const fn label(self) -> &'static str {
        match self {
            FlagLevel::Green => "Green",
            FlagLevel::Yellow => "Yellow",
            FlagLevel::Red => "Red",
            FlagLevel::Pending => "Pending",
        }
    }

    pub const fn needs_attention(self) -> bool {
        matches!(self, FlagLevel::Yellow | FlagLevel::Red)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub flag: FlagLevel,
    pub issues: Vec<String>,
    pub summary: Vec<String>,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier1Decision {
    Approved,
    Rejected,
}

impl Tier1Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Tier1Decision::Approved => "approved",
            Tier1Decision::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier1Record {
    pub decision: Tier1Decision,
    pub signer_id: String,
    pub signer_name: String,
    pub signature: EvidenceRef,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier2Record {
    pub verdict: ReviewVerdict,
    pub reviewer_id: String,
    pub reviewer_name: String,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub requested_by: String,
    pub requested_by_name: String,
    pub remarks: String,
    pub requested_at: DateTime<Utc>,
}

/// Whose queue the report currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingTarget {
    Tier1,
    Tier2,
    Submitter,
    Administrator,
    Closed,
}

impl RoutingTarget {
    pub const fn label(self) -> &'static str {
        match self {
            RoutingTarget::Tier1 => "tier-1",
            RoutingTarget::Tier2 => "tier-2",
            RoutingTarget::Submitter => "submitter",
            RoutingTarget::Administrator => "administrator",
            RoutingTarget::Closed => "closed",
        }
    }
}

/// Stored evidence record for one visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub id: InspectionId,
    pub site_id: String,
    pub site: SiteSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<WorkItemId>,
    pub submitter: Actor,
    pub inspection_date: DateTime<Utc>,
    pub responses: BTreeMap<String, Answer>,
    pub photos: BTreeMap<String, PhotoEvidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspector_location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_location: Option<GeoPoint>,
    pub location_verified: bool,
    pub third_party_approved: bool,
    pub narrative: Narrative,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureRef>,
    pub analysis: AnalysisResult,
    pub state: ReviewState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier1: Option<Tier1Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier2: Option<Tier2Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reschedule: Option<RescheduleRequest>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revision: u64,
}

impl InspectionReport {
    pub fn routing(&self) -> RoutingTarget {
        self.state.routing()
    }

    /// Legacy single-word status kept for older consumers.
    pub fn legacy_status(&self) -> &'static str {
        match self.state {
            ReviewState::Submitted | ReviewState::RescheduleRequested => "submitted",
            ReviewState::Tier1Approved => "approved",
            ReviewState::Tier1Rejected => "rejected",
            ReviewState::Completed { .. } => "reviewed",
        }
    }

    pub fn tier1_status(&self) -> &'static str {
        match self.state {
            ReviewState::Submitted => "pending",
            ReviewState::RescheduleRequested => "reschedule-requested",
            ReviewState::Tier1Rejected => "rejected",
            ReviewState::Tier1Approved | ReviewState::Completed { .. } => "approved",
        }
    }

    pub fn tier2_status(&self) -> &'static str {
        match self.state {
            ReviewState::Tier1Approved => "pending",
            ReviewState::Completed { .. } => "reviewed",
            ReviewState::Submitted
            | ReviewState::RescheduleRequested
            | ReviewState::Tier1Rejected => "none",
        }
    }

    pub fn final_status(&self) -> Option<&'static str> {
        self.state.is_completed().then_some("completed")
    }

    pub fn view(&self) -> InspectionView {
        InspectionView {
            status: self.legacy_status(),
            routing: self.routing(),
            tier1_status: self.tier1_status(),
            tier2_status: self.tier2_status(),
            final_status: self.final_status(),
            report: self.clone(),
        }
    }
}

/// Report plus the read-only projections derived from its review state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionView {
    #[serde(flatten)]
    pub report: InspectionReport,
    pub status: &'static str,
    pub routing: RoutingTarget,
    pub tier1_status: &'static str,
    pub tier2_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_status: Option<&'static str>,
}

/// Listing filter over submitted reports; every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportFilter {
    #[serde(default)]
    pub submitter: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub routing: Option<RoutingTarget>,
    #[serde(default)]
    pub tier1_status: Option<String>,
    #[serde(default)]
    pub tier2_status: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, report: &InspectionReport) -> bool {
        self.submitter
            .as_deref()
            .map_or(true, |submitter| report.submitter.id == submitter)
            && self.category.as_deref().map_or(true, |category| {
                report
                    .submitter
                    .category
                    .as_deref()
                    .is_some_and(|own| own.eq_ignore_ascii_case(category))
            })
            && self.site.as_deref().map_or(true, |site| report.site_id == site)
            && self.routing.map_or(true, |routing| report.routing() == routing)
            && self
                .tier1_status
                .as_deref()
                .map_or(true, |status| report.tier1_status() == status)
            && self
                .tier2_status
                .as_deref()
                .map_or(true, |status| report.tier2_status() == status)
    }
}

/// Outcome of a reconciliation sweep over completed reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub examined: usize,
    pub repaired: usize,
    pub failed: usize,
}
