use super::domain::InspectionReport;

/// Produces the human-readable artifact for a completed report (PDF or similar).
pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &InspectionReport) -> Result<RenderedReport, RenderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("report renderer failed: {0}")]
    Failed(String),
}
