use super::domain::{InspectionId, InspectionReport, ReportFilter};
use crate::workflows::RepositoryError;

/// Storage abstraction for inspection reports.
///
/// `update` lands only when the stored revision equals `expected_revision`; a concurrent
/// reviewer who read the same revision gets [`RepositoryError::StaleRevision`].
pub trait InspectionRepository: Send + Sync {
    fn insert(&self, report: InspectionReport) -> Result<InspectionReport, RepositoryError>;
    fn update(
        &self,
        report: InspectionReport,
        expected_revision: u64,
    ) -> Result<InspectionReport, RepositoryError>;
    fn fetch(&self, id: &InspectionId) -> Result<Option<InspectionReport>, RepositoryError>;
    fn list(&self, filter: &ReportFilter) -> Result<Vec<InspectionReport>, RepositoryError>;
}
