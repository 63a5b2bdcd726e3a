use crate::classify::ClassifyError;
use crate::forge::{ForgeError, LocatorError};
use crate::store::StoreError;
use crate::workspace::MaterializeError;
use thiserror::Error;

/// Reason recorded when the forge reports the repository as private or absent
pub const INACCESSIBLE_REASON: &str = "Repository is private or not accessible";

#[derive(Debug, Error)]
pub enum AssessmentError {
    /// Raised before any record is written
    #[error("Invalid repository reference: {0}")]
    InvalidReference(#[from] LocatorError),

    #[error("Repository is private or not accessible: {repository}")]
    RepositoryInaccessible { repository: String },

    #[error("Failed to download repository snapshot: {0}")]
    ForgeUnavailable(#[source] ForgeError),

    #[error("Failed to materialize repository snapshot: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("Failed to classify repository files: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Every analyzer failed: {0}")]
    AllAnalyzersFailed(String),

    #[error("Assessment was cancelled")]
    Cancelled,

    #[error("Assessment aborted unexpectedly: {0}")]
    Panicked(String),

    #[error("Failed to persist assessment: {0}")]
    Store(#[from] StoreError),
}

impl AssessmentError {
    /// Text stored as the record's failure reason
    pub fn failure_reason(&self) -> String {
        match self {
            AssessmentError::RepositoryInaccessible { .. } => INACCESSIBLE_REASON.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inaccessible_reason() {
        let err = AssessmentError::RepositoryInaccessible {
            repository: "acme/demo".to_string(),
        };
        assert_eq!(err.failure_reason(), INACCESSIBLE_REASON);
        assert!(err.to_string().contains("acme/demo"));
    }

    #[test]
    fn test_invalid_reference_message() {
        let err = AssessmentError::from(LocatorError::Unparsable {
            input: "nope".to_string(),
        });
        assert!(err.to_string().starts_with("Invalid repository reference"));
    }

    #[test]
    fn test_forge_failure_reason_mentions_download() {
        let err = AssessmentError::ForgeUnavailable(ForgeError::Timeout {
            url: "https://api.github.com/repos/acme/demo/tarball".to_string(),
        });
        assert!(err.failure_reason().starts_with("Failed to download repository snapshot"));
    }
}
