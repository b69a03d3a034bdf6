//! Inspection reports: submission with automatic risk analysis, then first- and second-tier
//! review driven by a single explicit state machine.

pub mod analysis;
pub mod domain;
pub mod render;
pub mod repository;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;

pub use analysis::{AnalysisConfig, AnalysisError, RiskClassifier, Vote};
pub use domain::{
    AnalysisResult, Answer, FlagLevel, GeoPoint, InspectionDraft, InspectionId, InspectionReport,
    InspectionView, Narrative, PhotoEvidence, ReconcileSummary, ReportFilter, RescheduleRequest,
    RoutingTarget, SignatureRef, SiteSnapshot, Tier1Decision, Tier1Record, Tier2Record,
};
pub use render::{RenderError, RenderedReport, ReportRenderer};
pub use repository::InspectionRepository;
pub use router::{inspection_router, ReviewAction};
pub use schema::{QuestionKind, QuestionSchema, SchemaRegistry};
pub use service::InspectionReviewService;
pub use state::{ReviewEvent, ReviewState};
