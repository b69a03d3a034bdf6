use crate::infra::Workflows;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Args;
use inspectiq::config::{AppConfig, ApprovalConfig};
use inspectiq::error::AppError;
use inspectiq::workflows::approvals::{
    ApprovalPoller, PollOutcome, PollSettings, SiteContact, TicketRequest,
};
use inspectiq::workflows::assignments::{NewWorkItem, Priority, ReviewVerdict, WorkItem};
use inspectiq::workflows::inspections::{
    AnalysisConfig, Answer, GeoPoint, InspectionDraft, Narrative, RiskClassifier, SiteSnapshot,
    Tier1Decision,
};
use inspectiq::workflows::{Actor, EvidenceRef, SystemClock};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEMO_BASE_URL: &str = "http://127.0.0.1:3000";
const DEMO_EVIDENCE_URL: &str = "https://evidence.demo.local/";
const DEMO_SITE: (f64, f64) = (31.5204, 74.3587);

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Path to an inspection draft JSON document
    #[arg(long)]
    pub(crate) report: PathBuf,
    /// Evaluate as of this RFC 3339 timestamp instead of now
    #[arg(long)]
    pub(crate) now: Option<DateTime<Utc>>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// How far from the site the inspector stands, in meters
    #[arg(long, default_value_t = 40.0)]
    pub(crate) distance_meters: f64,
    /// Stop once the report reaches the second-tier queue
    #[arg(long)]
    pub(crate) stop_at_tier1: bool,
}

/// Classify a draft with the configured thresholds and print the result as JSON.
pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let raw = std::fs::read_to_string(&args.report)?;
    let draft: InspectionDraft = serde_json::from_str(&raw)?;

    let now = args.now.unwrap_or_else(Utc::now);
    let result = RiskClassifier::new(config.analysis).assess(&draft, now);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let polling = PollSettings {
        interval: Duration::from_millis(100),
        timeout: Duration::from_secs(5),
    };
    let workflows = Workflows::in_memory(
        &ApprovalConfig {
            public_base_url: DEMO_BASE_URL.to_string(),
            evidence_base_url: DEMO_EVIDENCE_URL.to_string(),
            polling: polling.clone(),
        },
        AnalysisConfig::default(),
        Arc::new(SystemClock),
    );

    let inspector = Actor::new("beo-demo", "Demo Inspector", "beo").in_category("education");
    let deo = Actor::new("deo-demo", "Demo District Officer", "deo").in_category("education");
    let ceo = Actor::new("ceo-demo", "Demo Chief Officer", "ceo").in_category("education");

    println!("Field inspection review demo");
    let item = workflows.assignments.create(NewWorkItem {
        site_id: "school-demo-01".to_string(),
        assignee_id: inspector.id.clone(),
        category: "education".to_string(),
        deadline: Utc::now() + ChronoDuration::days(7),
        priority: Priority::High,
        instructions: Some("Verify attendance registers and washroom facilities.".to_string()),
    })?;
    println!(
        "- work item {} assigned to {} (deadline {})",
        item.id.as_str(),
        item.assignee_id,
        item.deadline.format("%Y-%m-%d")
    );

    let grant = workflows.approvals.request_ticket(
        TicketRequest {
            work_item_id: item.id.clone(),
            site_id: item.site_id.clone(),
            contact: SiteContact {
                site_name: "Demo Model School".to_string(),
                approver_name: "Demo Principal".to_string(),
                approver_email: "principal@demo.local".to_string(),
            },
        },
        &inspector,
    )?;
    println!(
        "- consent ticket {} issued; e-mail sent: {}",
        grant.ticket.id.0, grant.ticket.dispatch.sent
    );
    println!("  verification link: {}", grant.verification_url);

    let poller = ApprovalPoller::new(workflows.approvals.clone(), polling);
    let handle = poller.start(item.id.clone(), item.site_id.clone());
    workflows
        .approvals
        .verify(grant.ticket.token.as_str(), &item.id, &item.site_id)?;
    match handle.outcome().await {
        PollOutcome::Approved => println!("- principal approved the visit"),
        other => {
            println!("- approval polling ended without approval ({other:?})");
            return Ok(());
        }
    }

    let report = workflows
        .review
        .submit(demo_draft(&item, args.distance_meters), &inspector)?;
    println!(
        "- report {} submitted: flag {}, routed to {}",
        report.id.as_str(),
        report.analysis.flag.label(),
        report.routing().label()
    );
    for issue in &report.analysis.issues {
        println!("    issue: {issue}");
    }

    if report.analysis.flag.needs_attention() {
        let escalated = workflows.review.request_reschedule(
            &report.id,
            &deo,
            "Automatic analysis flagged this visit; please schedule a revisit.",
        )?;
        println!(
            "- tier-1 reviewer requested a reschedule; routed to {}",
            escalated.routing().label()
        );
        return Ok(());
    }

    let signature = EvidenceRef::new(format!("{DEMO_EVIDENCE_URL}signatures/deo-demo.png"));
    let approved = workflows
        .review
        .tier1_decide(&report.id, Tier1Decision::Approved, &deo, signature)?;
    println!(
        "- tier-1 approved by {}; routed to {}",
        deo.name,
        approved.routing().label()
    );
    if args.stop_at_tier1 {
        return Ok(());
    }

    let closed = workflows
        .review
        .tier2_decide(&report.id, ReviewVerdict::Satisfactory, &ceo)?;
    println!(
        "- tier-2 marked the report {}; final status {}",
        ReviewVerdict::Satisfactory.label(),
        closed.final_status().unwrap_or("open")
    );

    let item = workflows.assignments.get(&item.id)?;
    println!(
        "- work item {} is {} (second-tier reviewed: {})",
        item.id.as_str(),
        item.status.label(),
        item.second_tier_reviewed
    );
    println!(
        "- notifications queued: {}",
        workflows.dispatcher.sent().len()
    );

    let summary = workflows.review.reconcile()?;
    println!(
        "- reconciliation sweep: {} examined, {} repaired",
        summary.examined, summary.repaired
    );
    Ok(())
}

fn demo_draft(item: &WorkItem, distance_meters: f64) -> InspectionDraft {
    let offset = (distance_meters / 6_371_000.0).to_degrees();
    let mut responses = BTreeMap::new();
    responses.insert("q_attendance_register".to_string(), Answer::Boolean(true));
    responses.insert("q_students_present".to_string(), Answer::Number(286.0));
    responses.insert(
        "q_building_condition".to_string(),
        Answer::Text("Good".to_string()),
    );

    InspectionDraft {
        site_id: item.site_id.clone(),
        site: SiteSnapshot {
            name: "Demo Model School".to_string(),
            address: "1 Demo Road".to_string(),
            site_type: "public".to_string(),
            level: "secondary".to_string(),
            principal_name: "Demo Principal".to_string(),
            principal_phone: "+92-300-1234567".to_string(),
        },
        work_item_id: Some(item.id.clone()),
        inspection_date: Utc::now(),
        responses,
        photos: BTreeMap::new(),
        inspector_location: Some(GeoPoint::new(DEMO_SITE.0 + offset, DEMO_SITE.1)),
        site_location: Some(GeoPoint::new(DEMO_SITE.0, DEMO_SITE.1)),
        third_party_approved: false,
        narrative: Narrative {
            strengths: Some("Teachers were present and classes started on time.".to_string()),
            improvements: Some("Drinking water coolers on the first floor are broken.".to_string()),
            recommendations: Some("Replace the coolers before the summer term begins.".to_string()),
            remarks: None,
        },
        signature: None,
    }
}
