use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error enumeration for store failures, shared by every keyed collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record was modified since it was read")]
    StaleRevision,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Failure taxonomy shared by the assignment, approval, and review workflows.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{operation} is not allowed while the record is {state}")]
    Precondition {
        operation: &'static str,
        state: String,
    },
    #[error("{entity} '{id}' was modified concurrently; refetch and retry")]
    Conflict { entity: &'static str, id: String },
    #[error("{dependency} failed: {detail}")]
    Dependency {
        dependency: &'static str,
        detail: String,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn precondition(operation: &'static str, state: impl Into<String>) -> Self {
        Self::Precondition {
            operation,
            state: state.into(),
        }
    }

    /// Lift a store failure into the taxonomy, naming the record it concerned.
    pub fn from_repository(error: RepositoryError, entity: &'static str, id: &str) -> Self {
        match error {
            RepositoryError::Conflict | RepositoryError::StaleRevision => Self::Conflict {
                entity,
                id: id.to_string(),
            },
            RepositoryError::NotFound => Self::not_found(entity, id),
            RepositoryError::Unavailable(detail) => Self::Unavailable(detail),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "validation",
            WorkflowError::NotFound { .. } => "not_found",
            WorkflowError::Precondition { .. } => "precondition",
            WorkflowError::Conflict { .. } => "conflict",
            WorkflowError::Dependency { .. } => "dependency",
            WorkflowError::Unavailable(_) => "unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Precondition { .. } | WorkflowError::Conflict { .. } => {
                StatusCode::CONFLICT
            }
            WorkflowError::Dependency { .. } => StatusCode::BAD_GATEWAY,
            WorkflowError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (self.status_code(), Json(payload)).into_response()
    }
}
