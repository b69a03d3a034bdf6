mod config;
pub mod geofence;
mod rules;

pub use config::AnalysisConfig;

use chrono::{DateTime, Utc};
use tracing::error;

use super::domain::{AnalysisResult, FlagLevel, InspectionDraft};
use rules::Findings;

/// One check's verdict before the votes are folded into a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Vote {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("{label} coordinates ({latitude}, {longitude}) are not a valid position")]
    InvalidCoordinates {
        label: &'static str,
        latitude: f64,
        longitude: f64,
    },
}

/// Stateless rule-based classifier run once per submission.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    config: AnalysisConfig,
}

impl RiskClassifier {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Geofence, completeness, temporal, and content-depth checks, in that order.
    pub fn analyze(
        &self,
        draft: &InspectionDraft,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut findings = Findings::default();
        rules::geofence(draft, &self.config, &mut findings)?;
        let anything_missing = rules::completeness(draft, &mut findings);
        rules::temporal(draft, now, &self.config, &mut findings);
        rules::content_depth(draft, &self.config, anything_missing, &mut findings);

        let flag = match findings.votes.iter().max() {
            Some(Vote::Red) => FlagLevel::Red,
            Some(Vote::Yellow) => FlagLevel::Yellow,
            Some(Vote::Green) | None => FlagLevel::Green,
        };

        Ok(AnalysisResult {
            flag,
            issues: findings.issues,
            summary: findings.summary,
            verified_at: now,
        })
    }

    /// Like [`RiskClassifier::analyze`], but an internal failure degrades to a `Pending`
    /// flag so the submission still goes through.
    pub fn assess(&self, draft: &InspectionDraft, now: DateTime<Utc>) -> AnalysisResult {
        match self.analyze(draft, now) {
            Ok(result) => result,
            Err(err) => {
                error!(site = %draft.site_id, error = %err, "automatic analysis failed");
                AnalysisResult {
                    flag: FlagLevel::Pending,
                    issues: vec![format!("Automatic analysis unavailable: {err}")],
                    summary: Vec::new(),
                    verified_at: now,
                }
            }
        }
    }
}
