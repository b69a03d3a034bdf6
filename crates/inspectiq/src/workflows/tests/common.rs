use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::approvals::{
    ApprovalMethod, ApprovalTicket, ApprovalTicketService, SiteContact, TicketGrant, TicketId,
    TicketRepository, TicketRequest, TicketStatus,
};
use crate::workflows::assignments::{
    AssignmentLifecycle, NewWorkItem, Priority, WorkItem, WorkItemFilter, WorkItemId,
    WorkItemRepository, WorkItemStatus,
};
use crate::workflows::inspections::{
    Answer, GeoPoint, InspectionDraft, InspectionId, InspectionReport, InspectionRepository,
    InspectionReviewService, Narrative, RenderError, RenderedReport, ReportFilter, ReportRenderer,
    SiteSnapshot,
};
use crate::workflows::memory::{MemoryInspectionStore, MemoryTicketStore, MemoryWorkItemStore};
use crate::workflows::{
    workflow_router, Actor, DispatchError, DispatchReceipt, EvidenceError, EvidenceRef,
    EvidenceStore, FixedClock, Notification, NotificationDispatcher, RepositoryError,
};

pub(super) const SITE_ID: &str = "school-042";
pub(super) const SITE_LOCATION: (f64, f64) = (31.5204, 74.3587);
pub(super) const SIGNATURE: &str = "evidence://signatures/tier1-0001.png";

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn inspector() -> Actor {
    Actor::new("inspector-7", "Ayesha Khan", "beo").in_category("education")
}

pub(super) fn tier1_reviewer() -> Actor {
    Actor::new("reviewer-deo", "Imran Malik", "deo").in_category("education")
}

pub(super) fn tier2_reviewer() -> Actor {
    Actor::new("reviewer-ceo", "Sadia Rauf", "ceo").in_category("education")
}

/// Latitude offset that puts a point `meters` due north of the site.
pub(super) fn north_of_site(meters: f64) -> GeoPoint {
    let offset = (meters / 6_371_000.0).to_degrees();
    GeoPoint::new(SITE_LOCATION.0 + offset, SITE_LOCATION.1)
}

pub(super) fn site_point() -> GeoPoint {
    GeoPoint::new(SITE_LOCATION.0, SITE_LOCATION.1)
}

pub(super) fn detailed_narrative() -> Narrative {
    Narrative {
        strengths: Some(
            "Classrooms were clean, well lit, and every teacher on the roster was present."
                .to_string(),
        ),
        improvements: Some(
            "Two washrooms lacked running water and the boundary wall needs repair work."
                .to_string(),
        ),
        recommendations: Some(
            "Schedule plumbing repairs this term and request a boundary wall grant."
                .to_string(),
        ),
        remarks: None,
    }
}

pub(super) fn responses() -> BTreeMap<String, Answer> {
    let mut responses = BTreeMap::new();
    responses.insert("q_toilets".to_string(), Answer::Boolean(true));
    responses.insert("q_enrolled".to_string(), Answer::Number(412.0));
    responses.insert(
        "q_condition".to_string(),
        Answer::Text("Good".to_string()),
    );
    responses
}

/// Clean report: 50 m from the site, dated now, every field filled.
pub(super) fn clean_draft(work_item_id: Option<WorkItemId>) -> InspectionDraft {
    InspectionDraft {
        site_id: SITE_ID.to_string(),
        site: SiteSnapshot {
            name: "Government Girls High School No. 2".to_string(),
            address: "Mall Road, Lahore".to_string(),
            site_type: "public".to_string(),
            level: "high".to_string(),
            principal_name: "Nadia Aslam".to_string(),
            principal_phone: "+92-300-0000000".to_string(),
        },
        work_item_id,
        inspection_date: t0(),
        responses: responses(),
        photos: BTreeMap::new(),
        inspector_location: Some(north_of_site(50.0)),
        site_location: Some(site_point()),
        third_party_approved: false,
        narrative: detailed_narrative(),
        signature: None,
    }
}

pub(super) fn ticket_request(work_item_id: &WorkItemId) -> TicketRequest {
    TicketRequest {
        work_item_id: work_item_id.clone(),
        site_id: SITE_ID.to_string(),
        contact: SiteContact {
            site_name: "Government Girls High School No. 2".to_string(),
            approver_name: "Nadia Aslam".to_string(),
            approver_email: "principal@ggh2.edu.pk".to_string(),
        },
    }
}

#[derive(Default)]
pub(super) struct RecordingDispatcher {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingDispatcher {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("dispatcher mutex poisoned").clone()
    }

    pub(super) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Verification link pulled out of the most recent consent e-mail.
    pub(super) fn last_link(&self) -> String {
        let sent = self.sent();
        let text = &sent.last().expect("an e-mail was sent").text_body;
        let start = text.find("http").expect("link in body");
        text[start..].trim().to_string()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, notification: Notification) -> Result<DispatchReceipt, DispatchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DispatchError::Transport("smtp relay offline".to_string()));
        }
        self.sent
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(notification);
        Ok(DispatchReceipt {
            provider: "recording".to_string(),
            response: "250 queued".to_string(),
        })
    }
}

/// Resolves any reference under `evidence://`; can be switched offline.
#[derive(Default)]
pub(super) struct PrefixEvidence {
    offline: AtomicBool,
}

impl PrefixEvidence {
    pub(super) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl EvidenceStore for PrefixEvidence {
    fn resolves(&self, reference: &EvidenceRef) -> Result<bool, EvidenceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(EvidenceError::Unavailable("blob store timeout".to_string()));
        }
        Ok(reference.as_str().starts_with("evidence://"))
    }
}

#[derive(Default)]
pub(super) struct RecordingRenderer {
    rendered: AtomicUsize,
}

impl RecordingRenderer {
    pub(super) fn rendered(&self) -> usize {
        self.rendered.load(Ordering::SeqCst)
    }
}

impl ReportRenderer for RecordingRenderer {
    fn render(&self, report: &InspectionReport) -> Result<RenderedReport, RenderError> {
        self.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedReport {
            file_name: format!("{}.pdf", report.id.as_str()),
            content_type: "application/pdf".to_string(),
            bytes: vec![0x25, 0x50, 0x44, 0x46],
        })
    }
}

/// Work-item store whose writes can be taken offline to exercise the closure saga.
#[derive(Default)]
pub(super) struct SwitchableWorkItemStore {
    inner: MemoryWorkItemStore,
    offline: AtomicBool,
}

impl SwitchableWorkItemStore {
    pub(super) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("work item store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl WorkItemRepository for SwitchableWorkItemStore {
    fn insert(&self, item: WorkItem) -> Result<WorkItem, RepositoryError> {
        self.check()?;
        self.inner.insert(item)
    }

    fn update(&self, item: WorkItem, expected_revision: u64) -> Result<WorkItem, RepositoryError> {
        self.check()?;
        self.inner.update(item, expected_revision)
    }

    fn fetch(&self, id: &WorkItemId) -> Result<Option<WorkItem>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self, filter: &WorkItemFilter) -> Result<Vec<WorkItem>, RepositoryError> {
        self.inner.list(filter)
    }

    fn delete(&self, id: &WorkItemId) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.delete(id)
    }
}

/// Report store that lets a rival reviewer's write land just before the first update.
#[derive(Default)]
pub(super) struct RacingInspectionStore {
    pub(super) inner: MemoryInspectionStore,
    raced: AtomicBool,
}

impl InspectionRepository for RacingInspectionStore {
    fn insert(&self, report: InspectionReport) -> Result<InspectionReport, RepositoryError> {
        self.inner.insert(report)
    }

    fn update(
        &self,
        report: InspectionReport,
        expected_revision: u64,
    ) -> Result<InspectionReport, RepositoryError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let mut rival = self
                .inner
                .fetch(&report.id)?
                .ok_or(RepositoryError::NotFound)?;
            rival.updated_at = rival.updated_at + Duration::seconds(1);
            self.inner.update(rival, expected_revision)?;
        }
        self.inner.update(report, expected_revision)
    }

    fn fetch(&self, id: &InspectionId) -> Result<Option<InspectionReport>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self, filter: &ReportFilter) -> Result<Vec<InspectionReport>, RepositoryError> {
        self.inner.list(filter)
    }
}

/// Ticket store where a rival first request or link click lands just ahead of the caller.
#[derive(Default)]
pub(super) struct RacingTicketStore {
    pub(super) inner: MemoryTicketStore,
    race_insert: AtomicBool,
    race_approval: AtomicBool,
}

impl RacingTicketStore {
    pub(super) fn arm_insert(&self) {
        self.race_insert.store(true, Ordering::SeqCst);
    }

    pub(super) fn arm_approval(&self) {
        self.race_approval.store(true, Ordering::SeqCst);
    }
}

impl TicketRepository for RacingTicketStore {
    fn insert(&self, ticket: ApprovalTicket) -> Result<ApprovalTicket, RepositoryError> {
        if self.race_insert.swap(false, Ordering::SeqCst) {
            let mut rival = ticket.clone();
            rival.id = TicketId(format!("{}-rival", ticket.id.0));
            rival.requester_id = "inspector-rival".to_string();
            self.inner.insert(rival)?;
        }
        self.inner.insert(ticket)
    }

    fn update(
        &self,
        ticket: ApprovalTicket,
        expected_revision: u64,
    ) -> Result<ApprovalTicket, RepositoryError> {
        if ticket.approved && self.race_approval.swap(false, Ordering::SeqCst) {
            let mut rival = self
                .inner
                .fetch(&ticket.id)?
                .ok_or(RepositoryError::NotFound)?;
            rival.approved = true;
            rival.status = TicketStatus::Approved;
            rival.approved_at = ticket.approved_at.map(|at| at - Duration::seconds(1));
            rival.approved_by = Some("Email Link (Principal)".to_string());
            rival.approval_method = Some(ApprovalMethod::LinkClick);
            self.inner.update(rival, expected_revision)?;
        }
        self.inner.update(ticket, expected_revision)
    }

    fn fetch(&self, id: &TicketId) -> Result<Option<ApprovalTicket>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_by_pair(
        &self,
        work_item_id: &WorkItemId,
        site_id: &str,
    ) -> Result<Option<ApprovalTicket>, RepositoryError> {
        self.inner.find_by_pair(work_item_id, site_id)
    }
}

/// Work-item store where a retried closure lands just before the caller's completion write.
#[derive(Default)]
pub(super) struct RacingWorkItemStore {
    pub(super) inner: MemoryWorkItemStore,
    rival_completes: AtomicBool,
    raced: AtomicBool,
}

impl RacingWorkItemStore {
    /// The rival write only bumps the revision instead of closing the item.
    pub(super) fn with_unrelated_rival() -> Self {
        Self::default()
    }

    pub(super) fn with_completing_rival() -> Self {
        let store = Self::default();
        store.rival_completes.store(true, Ordering::SeqCst);
        store
    }
}

impl WorkItemRepository for RacingWorkItemStore {
    fn insert(&self, item: WorkItem) -> Result<WorkItem, RepositoryError> {
        self.inner.insert(item)
    }

    fn update(&self, item: WorkItem, expected_revision: u64) -> Result<WorkItem, RepositoryError> {
        if item.is_completed() && !self.raced.swap(true, Ordering::SeqCst) {
            let mut rival = self
                .inner
                .fetch(&item.id)?
                .ok_or(RepositoryError::NotFound)?;
            if self.rival_completes.load(Ordering::SeqCst) {
                rival.status = WorkItemStatus::Completed;
                rival.completed_by = Some("reconciler".to_string());
                rival.completed_at = item.completed_at;
            } else {
                rival.instructions = Some("Bring the attendance register.".to_string());
            }
            self.inner.update(rival, expected_revision)?;
        }
        self.inner.update(item, expected_revision)
    }

    fn fetch(&self, id: &WorkItemId) -> Result<Option<WorkItem>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self, filter: &WorkItemFilter) -> Result<Vec<WorkItem>, RepositoryError> {
        self.inner.list(filter)
    }

    fn delete(&self, id: &WorkItemId) -> Result<(), RepositoryError> {
        self.inner.delete(id)
    }
}

pub(super) type Approvals = ApprovalTicketService<MemoryTicketStore, RecordingDispatcher>;
pub(super) type ReviewOver<R> =
    InspectionReviewService<R, SwitchableWorkItemStore, Approvals, RecordingDispatcher>;
pub(super) type Review = ReviewOver<MemoryInspectionStore>;

pub(super) struct Harness {
    pub(super) clock: Arc<FixedClock>,
    pub(super) work_items: Arc<SwitchableWorkItemStore>,
    pub(super) tickets: Arc<MemoryTicketStore>,
    pub(super) reports: Arc<MemoryInspectionStore>,
    pub(super) dispatcher: Arc<RecordingDispatcher>,
    pub(super) evidence: Arc<PrefixEvidence>,
    pub(super) renderer: Arc<RecordingRenderer>,
    pub(super) assignments: Arc<AssignmentLifecycle<SwitchableWorkItemStore>>,
    pub(super) approvals: Arc<Approvals>,
    pub(super) review: Arc<Review>,
}

impl Harness {
    pub(super) fn new() -> Self {
        let clock = Arc::new(FixedClock::new(t0()));
        let work_items = Arc::new(SwitchableWorkItemStore::default());
        let tickets = Arc::new(MemoryTicketStore::default());
        let reports = Arc::new(MemoryInspectionStore::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let evidence = Arc::new(PrefixEvidence::default());
        let renderer = Arc::new(RecordingRenderer::default());

        let assignments = Arc::new(
            AssignmentLifecycle::new(work_items.clone(), clock.clone())
                .with_references(reports.clone()),
        );
        let approvals = Arc::new(ApprovalTicketService::new(
            tickets.clone(),
            dispatcher.clone(),
            clock.clone(),
            "https://inspect.example.gov",
        ));

        let review = Arc::new(
            InspectionReviewService::new(
                reports.clone(),
                assignments.clone(),
                approvals.clone(),
                dispatcher.clone(),
                evidence.clone(),
                clock.clone(),
            )
            .with_renderer(renderer.clone()),
        );

        Self {
            clock,
            work_items,
            tickets,
            reports,
            dispatcher,
            evidence,
            renderer,
            assignments,
            approvals,
            review,
        }
    }

    /// Review service over an arbitrary report store, sharing every other collaborator.
    pub(super) fn review_over<R>(&self, reports: Arc<R>) -> ReviewOver<R>
    where
        R: InspectionRepository + 'static,
    {
        InspectionReviewService::new(
            reports,
            self.assignments.clone(),
            self.approvals.clone(),
            self.dispatcher.clone(),
            self.evidence.clone(),
            self.clock.clone(),
        )
        .with_renderer(self.renderer.clone())
    }

    pub(super) fn create_item(&self) -> WorkItem {
        self.assignments
            .create(NewWorkItem {
                site_id: SITE_ID.to_string(),
                assignee_id: inspector().id,
                category: "education".to_string(),
                deadline: t0() + Duration::days(7),
                priority: Priority::High,
                instructions: Some("Check washrooms and attendance registers.".to_string()),
            })
            .expect("work item created")
    }

    pub(super) fn request_ticket(&self, item: &WorkItem) -> TicketGrant {
        self.approvals
            .request_ticket(ticket_request(&item.id), &inspector())
            .expect("ticket requested")
    }

    pub(super) fn approve_pair(&self, item: &WorkItem) -> ApprovalTicket {
        self.request_ticket(item);
        self.approvals
            .simulate_approval(&item.id, SITE_ID)
            .expect("approval simulated")
    }

    /// Work item with an approved consent ticket and a submitted clean report.
    pub(super) fn submitted(&self) -> (WorkItem, InspectionReport) {
        let item = self.create_item();
        self.approve_pair(&item);
        let report = self
            .review
            .submit(clean_draft(Some(item.id.clone())), &inspector())
            .expect("report submitted");
        (item, report)
    }

    pub(super) fn router(&self) -> axum::Router {
        workflow_router(
            self.assignments.clone(),
            self.approvals.clone(),
            self.review.clone(),
        )
    }
}

pub(super) fn signature() -> EvidenceRef {
    EvidenceRef::new(SIGNATURE)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
