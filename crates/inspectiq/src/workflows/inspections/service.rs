use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::analysis::RiskClassifier;
use super::domain::{
    FlagLevel, InspectionDraft, InspectionId, InspectionReport, ReconcileSummary, ReportFilter,
    RescheduleRequest, Tier1Decision, Tier1Record, Tier2Record,
};
use super::render::ReportRenderer;
use super::repository::InspectionRepository;
use super::schema::SchemaRegistry;
use super::state::{ReviewEvent, ReviewState};
use crate::workflows::approvals::TicketStatusSource;
use crate::workflows::assignments::{
    AssignmentLifecycle, ReviewVerdict, WorkItem, WorkItemRepository,
};
use crate::workflows::evidence::{EvidenceRef, EvidenceStore};
use crate::workflows::notify::{escape_html, Notification, NotificationDispatcher};
use crate::workflows::{Actor, Clock, WorkflowError};

const ENTITY: &str = "inspection report";
const SUBMISSION: &str = "inspection submission";

static INSPECTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_inspection_id() -> InspectionId {
    let id = INSPECTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InspectionId(format!("insp-{id:06}"))
}

/// Orchestrates submission, automatic analysis, and the two review tiers, and closes the
/// linked work item once the second tier has acted.
pub struct InspectionReviewService<R, W, T, N> {
    reports: Arc<R>,
    assignments: Arc<AssignmentLifecycle<W>>,
    approvals: Arc<T>,
    notifier: Arc<N>,
    evidence: Arc<dyn EvidenceStore>,
    renderer: Option<Arc<dyn ReportRenderer>>,
    classifier: RiskClassifier,
    schema: SchemaRegistry,
    clock: Arc<dyn Clock>,
}

impl<R, W, T, N> InspectionReviewService<R, W, T, N>
where
    R: InspectionRepository + 'static,
    W: WorkItemRepository + 'static,
    T: TicketStatusSource,
    N: NotificationDispatcher + 'static,
{
    pub fn new(
        reports: Arc<R>,
        assignments: Arc<AssignmentLifecycle<W>>,
        approvals: Arc<T>,
        notifier: Arc<N>,
        evidence: Arc<dyn EvidenceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reports,
            assignments,
            approvals,
            notifier,
            evidence,
            renderer: None,
            classifier: RiskClassifier::default(),
            schema: SchemaRegistry::default(),
            clock,
        }
    }

    pub fn with_classifier(mut self, classifier: RiskClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_schema(mut self, schema: SchemaRegistry) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Store a new report after consent, schema, and classifier checks. The work item is
    /// left alone until the second tier acts.
    pub fn submit(
        &self,
        draft: InspectionDraft,
        submitter: &Actor,
    ) -> Result<InspectionReport, WorkflowError> {
        let site_id = draft.site_id.trim().to_string();
        if site_id.is_empty() {
            return Err(WorkflowError::validation("site_id is required"));
        }
        if draft.site.name.trim().is_empty() {
            return Err(WorkflowError::validation("site name is required"));
        }
        if draft
            .signature
            .as_ref()
            .is_some_and(|signature| signature.reference.is_blank())
        {
            return Err(WorkflowError::validation(
                "signature reference must not be blank",
            ));
        }

        self.ensure_third_party_approval(&draft, &site_id)?;
        self.schema.validate(&draft.responses)?;

        let now = self.clock.now();
        let analysis = self.classifier.assess(&draft, now);
        let report = InspectionReport {
            id: next_inspection_id(),
            site_id,
            site: draft.site,
            work_item_id: draft.work_item_id,
            submitter: submitter.clone(),
            inspection_date: draft.inspection_date,
            responses: draft.responses,
            photos: draft.photos,
            inspector_location: draft.inspector_location,
            site_location: draft.site_location,
            location_verified: analysis.flag == FlagLevel::Green,
            third_party_approved: true,
            narrative: draft.narrative,
            signature: draft.signature,
            analysis,
            state: ReviewState::Submitted,
            tier1: None,
            tier2: None,
            reschedule: None,
            submitted_at: now,
            updated_at: now,
            revision: 0,
        };

        let stored = self
            .reports
            .insert(report)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, "new"))?;
        info!(
            report = %stored.id.0,
            site = %stored.site_id,
            flag = stored.analysis.flag.label(),
            issues = stored.analysis.issues.len(),
            "inspection report submitted"
        );
        Ok(stored)
    }

    pub fn tier1_decide(
        &self,
        id: &InspectionId,
        decision: Tier1Decision,
        signer: &Actor,
        signature: EvidenceRef,
    ) -> Result<InspectionReport, WorkflowError> {
        if signature.is_blank() {
            return Err(WorkflowError::validation(
                "a tier-1 decision requires a captured signature",
            ));
        }

        let mut report = self.get(id)?;
        let next = report.state.apply(ReviewEvent::Tier1(decision))?;

        match self.evidence.resolves(&signature) {
            Ok(true) => {}
            Ok(false) => {
                return Err(WorkflowError::validation(format!(
                    "signature reference '{}' is not known to the evidence store",
                    signature.as_str()
                )))
            }
            Err(err) => {
                return Err(WorkflowError::Dependency {
                    dependency: "evidence store",
                    detail: err.to_string(),
                })
            }
        }

        let now = self.clock.now();
        report.state = next;
        report.tier1 = Some(Tier1Record {
            decision,
            signer_id: signer.id.clone(),
            signer_name: signer.name.clone(),
            signature,
            decided_at: now,
        });
        report.updated_at = now;

        let stored = self.write(report)?;
        info!(
            report = %stored.id.0,
            decision = decision.label(),
            routing = stored.routing().label(),
            "tier-1 decision recorded"
        );
        Ok(stored)
    }

    /// Escalate a flagged report to an administrator instead of deciding on it.
    pub fn request_reschedule(
        &self,
        id: &InspectionId,
        requester: &Actor,
        remarks: &str,
    ) -> Result<InspectionReport, WorkflowError> {
        let remarks = remarks.trim();
        if remarks.is_empty() {
            return Err(WorkflowError::validation(
                "a reschedule request needs remarks",
            ));
        }

        let mut report = self.get(id)?;
        let next = report.state.apply(ReviewEvent::Reschedule)?;
        if !report.analysis.flag.needs_attention() {
            return Err(WorkflowError::precondition(
                "reschedule request",
                format!("flagged {}", report.analysis.flag.label()),
            ));
        }

        let now = self.clock.now();
        report.state = next;
        report.reschedule = Some(RescheduleRequest {
            requested_by: requester.id.clone(),
            requested_by_name: requester.name.clone(),
            remarks: remarks.to_string(),
            requested_at: now,
        });
        report.updated_at = now;

        let stored = self.write(report)?;
        info!(report = %stored.id.0, requested_by = %requester.id, "reschedule requested");
        Ok(stored)
    }

    /// Final review. The report write comes first; closing the work item, notifying the
    /// submitter, and rendering the artifact are best effort afterwards.
    pub fn tier2_decide(
        &self,
        id: &InspectionId,
        verdict: ReviewVerdict,
        reviewer: &Actor,
    ) -> Result<InspectionReport, WorkflowError> {
        let mut report = self.get(id)?;
        let next = report.state.apply(ReviewEvent::Tier2(verdict))?;

        let now = self.clock.now();
        report.state = next;
        report.tier2 = Some(Tier2Record {
            verdict,
            reviewer_id: reviewer.id.clone(),
            reviewer_name: reviewer.name.clone(),
            decided_at: now,
        });
        report.updated_at = now;

        let stored = self.write(report)?;
        info!(report = %stored.id.0, verdict = verdict.label(), "tier-2 decision recorded");

        if let Err(error) = self.close_work_item(&stored) {
            warn!(
                report = %stored.id.0,
                %error,
                "work item closure failed; left for reconciliation"
            );
        }
        self.notify_completion(&stored);
        self.render(&stored);

        Ok(stored)
    }

    pub fn get(&self, id: &InspectionId) -> Result<InspectionReport, WorkflowError> {
        self.reports
            .fetch(id)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, id.as_str()))?
            .ok_or_else(|| WorkflowError::not_found(ENTITY, id.as_str()))
    }

    /// Matching reports, newest submission first.
    pub fn list(&self, filter: &ReportFilter) -> Result<Vec<InspectionReport>, WorkflowError> {
        let mut reports = self
            .reports
            .list(filter)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, "*"))?;
        reports.sort_by(|left, right| right.submitted_at.cmp(&left.submitted_at));
        Ok(reports)
    }

    /// Re-run the work-item closure for every completed report whose work item missed it.
    pub fn reconcile(&self) -> Result<ReconcileSummary, WorkflowError> {
        let reports = self
            .reports
            .list(&ReportFilter::default())
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, "*"))?;

        let mut summary = ReconcileSummary::default();
        for report in reports
            .iter()
            .filter(|report| report.state.is_completed() && report.work_item_id.is_some())
        {
            summary.examined += 1;
            match self.close_work_item(report) {
                Ok(true) => summary.repaired += 1,
                Ok(false) => {}
                Err(error) => {
                    summary.failed += 1;
                    warn!(report = %report.id.0, %error, "reconciliation could not close work item");
                }
            }
        }

        info!(
            examined = summary.examined,
            repaired = summary.repaired,
            failed = summary.failed,
            "reconciliation sweep finished"
        );
        Ok(summary)
    }

    fn ensure_third_party_approval(
        &self,
        draft: &InspectionDraft,
        site_id: &str,
    ) -> Result<(), WorkflowError> {
        let Some(work_item_id) = &draft.work_item_id else {
            return if draft.third_party_approved {
                Ok(())
            } else {
                Err(WorkflowError::precondition(
                    SUBMISSION,
                    "awaiting third-party approval",
                ))
            };
        };

        let item = self.assignments.get(work_item_id).map_err(|err| match err {
            WorkflowError::NotFound { .. } => WorkflowError::validation(format!(
                "work item reference '{}' does not resolve",
                work_item_id.as_str()
            )),
            other => other,
        })?;
        if item.site_id != site_id {
            return Err(WorkflowError::validation(format!(
                "work item '{}' is for site '{}', not '{site_id}'",
                item.id.as_str(),
                item.site_id
            )));
        }

        match self.approvals.is_approved(work_item_id, site_id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(WorkflowError::precondition(
                SUBMISSION,
                "awaiting third-party approval",
            )),
            Err(WorkflowError::NotFound { .. }) => Err(WorkflowError::precondition(
                SUBMISSION,
                "missing a third-party approval request",
            )),
            Err(other) => Err(other),
        }
    }

    /// Returns whether the work item needed any change.
    fn close_work_item(&self, report: &InspectionReport) -> Result<bool, WorkflowError> {
        let (Some(work_item_id), Some(tier2)) = (&report.work_item_id, &report.tier2) else {
            return Ok(false);
        };

        let before: WorkItem = self.assignments.get(work_item_id)?;
        if before.is_completed() && before.second_tier_reviewed {
            debug!(work_item = %work_item_id.0, "work item already closed");
            return Ok(false);
        }

        self.assignments
            .mark_completed(work_item_id, &report.submitter.id, report.submitted_at)?;
        self.assignments.mark_second_tier_reviewed(
            work_item_id,
            tier2.verdict,
            &tier2.reviewer_id,
            tier2.decided_at,
        )?;
        Ok(true)
    }

    fn notify_completion(&self, report: &InspectionReport) {
        let Some(tier2) = &report.tier2 else {
            return;
        };
        let site = &report.site.name;
        let notification = Notification {
            template: "inspection_completed".to_string(),
            recipient: report.submitter.id.clone(),
            recipient_name: report.submitter.name.clone(),
            subject: format!("Inspection review completed - {site}"),
            html_body: format!(
                "<p>Your inspection of <strong>{}</strong> was reviewed by {} and marked {}.</p>",
                escape_html(site),
                escape_html(&tier2.reviewer_name),
                tier2.verdict.label()
            ),
            text_body: format!(
                "Your inspection of {site} was reviewed by {} and marked {}.",
                tier2.reviewer_name,
                tier2.verdict.label()
            ),
        };

        if let Err(error) = self.notifier.dispatch(notification) {
            warn!(report = %report.id.0, %error, "completion notification failed");
        }
    }

    fn render(&self, report: &InspectionReport) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        match renderer.render(report) {
            Ok(artifact) => info!(
                report = %report.id.0,
                file = %artifact.file_name,
                bytes = artifact.bytes.len(),
                "inspection report rendered"
            ),
            Err(error) => warn!(report = %report.id.0, %error, "inspection report rendering failed"),
        }
    }

    fn write(&self, report: InspectionReport) -> Result<InspectionReport, WorkflowError> {
        let id = report.id.clone();
        let expected = report.revision;
        self.reports
            .update(report, expected)
            .map_err(|err| WorkflowError::from_repository(err, ENTITY, id.as_str()))
    }
}
