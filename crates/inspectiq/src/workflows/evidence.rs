use serde::{Deserialize, Serialize};

/// Durable reference (usually a URL) returned by the evidence store for a photo or signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRef(pub String);

impl EvidenceRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Blob storage for photos and signatures. The workflows only ever hold references.
pub trait EvidenceStore: Send + Sync {
    /// Whether the reference points at a blob the store knows about.
    fn resolves(&self, reference: &EvidenceRef) -> Result<bool, EvidenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvidenceError {
    #[error("evidence store unavailable: {0}")]
    Unavailable(String),
}
