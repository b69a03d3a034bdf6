use std::fmt::Write as _;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use inspectiq::config::{AppConfig, ApprovalConfig};
use inspectiq::workflows::approvals::ApprovalTicketService;
use inspectiq::workflows::assignments::AssignmentLifecycle;
use inspectiq::workflows::inspections::{
    AnalysisConfig, InspectionReport, InspectionReviewService, RenderError, RenderedReport,
    ReportRenderer, RiskClassifier,
};
use inspectiq::workflows::memory::{MemoryInspectionStore, MemoryTicketStore, MemoryWorkItemStore};
use inspectiq::workflows::{
    Clock, DispatchError, DispatchReceipt, EvidenceError, EvidenceRef, EvidenceStore,
    Notification, NotificationDispatcher,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in for the e-mail gateway: logs each message and keeps it in an outbox.
#[derive(Debug, Default, Clone)]
pub(crate) struct LoggingDispatcher {
    outbox: Arc<Mutex<Vec<Notification>>>,
}

impl LoggingDispatcher {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

impl NotificationDispatcher for LoggingDispatcher {
    fn dispatch(&self, notification: Notification) -> Result<DispatchReceipt, DispatchError> {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            subject = %notification.subject,
            "notification queued"
        );
        self.outbox
            .lock()
            .map_err(|_| DispatchError::Transport("outbox lock poisoned".to_string()))?
            .push(notification);
        Ok(DispatchReceipt {
            provider: "log".to_string(),
            response: "queued".to_string(),
        })
    }
}

/// Accepts references under the configured evidence bucket URL.
#[derive(Debug, Clone)]
pub(crate) struct PrefixEvidenceStore {
    base_url: String,
}

impl PrefixEvidenceStore {
    pub(crate) fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl EvidenceStore for PrefixEvidenceStore {
    fn resolves(&self, reference: &EvidenceRef) -> Result<bool, EvidenceError> {
        if self.base_url.is_empty() {
            return Err(EvidenceError::Unavailable(
                "no evidence base url configured".to_string(),
            ));
        }
        Ok(reference.as_str().starts_with(&self.base_url))
    }
}

/// Plain-text summary of a closed report.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TextReportRenderer;

impl ReportRenderer for TextReportRenderer {
    fn render(&self, report: &InspectionReport) -> Result<RenderedReport, RenderError> {
        let mut body = String::new();
        let write = |body: &mut String, line: String| {
            writeln!(body, "{line}").map_err(|err| RenderError::Failed(err.to_string()))
        };

        write(&mut body, format!("Inspection {}", report.id.as_str()))?;
        write(&mut body, format!("Site: {} ({})", report.site.name, report.site_id))?;
        write(
            &mut body,
            format!("Inspector: {} on {}", report.submitter.name, report.inspection_date),
        )?;
        write(&mut body, format!("Risk flag: {}", report.analysis.flag.label()))?;
        for issue in &report.analysis.issues {
            write(&mut body, format!("  - {issue}"))?;
        }
        if let Some(tier1) = &report.tier1 {
            write(
                &mut body,
                format!("Tier 1: {} by {}", tier1.decision.label(), tier1.signer_name),
            )?;
        }
        if let Some(tier2) = &report.tier2 {
            write(
                &mut body,
                format!("Tier 2: {} by {}", tier2.verdict.label(), tier2.reviewer_name),
            )?;
        }

        Ok(RenderedReport {
            file_name: format!("{}.txt", report.id.as_str()),
            content_type: "text/plain; charset=utf-8".to_string(),
            bytes: body.into_bytes(),
        })
    }
}

pub(crate) type Approvals = ApprovalTicketService<MemoryTicketStore, LoggingDispatcher>;
pub(crate) type Review =
    InspectionReviewService<MemoryInspectionStore, MemoryWorkItemStore, Approvals, LoggingDispatcher>;

/// Every workflow service wired over the in-memory stores.
pub(crate) struct Workflows {
    pub(crate) assignments: Arc<AssignmentLifecycle<MemoryWorkItemStore>>,
    pub(crate) approvals: Arc<Approvals>,
    pub(crate) review: Arc<Review>,
    pub(crate) dispatcher: Arc<LoggingDispatcher>,
}

impl Workflows {
    pub(crate) fn in_memory(
        approvals: &ApprovalConfig,
        analysis: AnalysisConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reports = Arc::new(MemoryInspectionStore::default());
        let dispatcher = Arc::new(LoggingDispatcher::default());

        let assignments = Arc::new(
            AssignmentLifecycle::new(Arc::new(MemoryWorkItemStore::default()), clock.clone())
                .with_references(reports.clone()),
        );
        let approval_service = Arc::new(ApprovalTicketService::new(
            Arc::new(MemoryTicketStore::default()),
            dispatcher.clone(),
            clock.clone(),
            approvals.public_base_url.clone(),
        ));
        let review = Arc::new(
            InspectionReviewService::new(
                reports,
                assignments.clone(),
                approval_service.clone(),
                dispatcher.clone(),
                Arc::new(PrefixEvidenceStore::new(approvals.evidence_base_url.clone())),
                clock,
            )
            .with_classifier(RiskClassifier::new(analysis))
            .with_renderer(Arc::new(TextReportRenderer)),
        );

        Self {
            assignments,
            approvals: approval_service,
            review,
            dispatcher,
        }
    }

    pub(crate) fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self::in_memory(&config.approvals, config.analysis.clone(), clock)
    }
}
