use chrono::{DateTime, Duration, Utc};

use super::super::domain::InspectionDraft;
use super::config::AnalysisConfig;
use super::geofence::{classify, haversine_meters, validate};
use super::{AnalysisError, Vote};

#[derive(Debug, Default)]
pub(crate) struct Findings {
    pub votes: Vec<Vote>,
    pub issues: Vec<String>,
    pub summary: Vec<String>,
}

impl Findings {
    fn issue(&mut self, vote: Vote, message: impl Into<String>) {
        self.votes.push(vote);
        self.issues.push(message.into());
    }

    fn pass(&mut self, message: impl Into<String>) {
        self.votes.push(Vote::Green);
        self.summary.push(message.into());
    }
}

pub(crate) fn geofence(
    draft: &InspectionDraft,
    config: &AnalysisConfig,
    findings: &mut Findings,
) -> Result<(), AnalysisError> {
    let (Some(inspector), Some(site)) = (&draft.inspector_location, &draft.site_location) else {
        findings.issue(Vote::Yellow, "Missing location data for verification.");
        return Ok(());
    };
    let (Some(inspector), Some(site)) = (inspector.coordinates(), site.coordinates()) else {
        findings.issue(Vote::Yellow, "Incomplete location data for verification.");
        return Ok(());
    };
    validate("inspector", inspector)?;
    validate("site", site)?;

    let distance = haversine_meters(inspector, site);
    let rounded = distance.round() as i64;
    match classify(distance, config) {
        Vote::Red => findings.issue(
            Vote::Red,
            format!("Location mismatch: Inspector was {rounded}m away from school coordinates."),
        ),
        Vote::Yellow => findings.issue(
            Vote::Yellow,
            format!("Location warning: Inspector was {rounded}m away from school coordinates."),
        ),
        Vote::Green => findings.pass("Location verification successful."),
    }
    Ok(())
}

/// Returns true when anything the completeness check looks at is missing.
pub(crate) fn completeness(draft: &InspectionDraft, findings: &mut Findings) -> bool {
    let missing_narrative: Vec<&str> = draft
        .narrative
        .reviewed_fields()
        .into_iter()
        .filter(|(_, value)| value.map_or(true, |text| text.trim().is_empty()))
        .map(|(name, _)| name)
        .collect();
    let missing_responses = draft.responses.is_empty();

    if missing_responses {
        findings.issue(Vote::Red, "Critical: Missing questionnaire responses.");
    } else if !missing_narrative.is_empty() {
        findings.issue(
            Vote::Yellow,
            format!(
                "Incomplete qualitative fields: {}.",
                missing_narrative.join(", ")
            ),
        );
    } else {
        findings.pass("All key fields filled.");
    }

    missing_responses || !missing_narrative.is_empty()
}

pub(crate) fn temporal(
    draft: &InspectionDraft,
    now: DateTime<Utc>,
    config: &AnalysisConfig,
    findings: &mut Findings,
) {
    if draft.inspection_date > now + Duration::hours(config.future_tolerance_hours) {
        findings.issue(Vote::Red, "Invalid Inspection Date: Date is in the future.");
    }
}

pub(crate) fn content_depth(
    draft: &InspectionDraft,
    config: &AnalysisConfig,
    anything_missing: bool,
    findings: &mut Findings,
) {
    let [strengths, improvements, recommendations] = draft
        .narrative
        .reviewed_fields()
        .map(|(_, value)| value.unwrap_or_default());
    let length = format!("{strengths} {improvements} {recommendations}")
        .chars()
        .count();

    if length < config.brief_feedback_chars && !anything_missing {
        findings.issue(
            Vote::Yellow,
            "Qualitative feedback is very brief. AI suggests more detailed reporting.",
        );
    } else if length > config.brief_feedback_chars {
        findings
            .summary
            .push("Qualitative feedback provided is detailed.".to_string());
    }
}
