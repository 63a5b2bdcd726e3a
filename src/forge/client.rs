use super::{ForgeError, RepositoryReference};
use crate::findings::AnalysisArtifact;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

/// What the forge reports about a repository's visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    NotFound,
}

impl Visibility {
    pub fn is_accessible(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// A lint report found among a repository's recent CI artifacts
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedArtifact {
    pub run_id: u64,
    pub artifact_name: String,
    pub entry_name: String,
    pub report: AnalysisArtifact,
}

/// Read-only access to a code forge
///
/// Credentials are bound to the client at construction. Every call is bounded
/// by its own timeout, so a slow forge surfaces as [`ForgeError::Timeout`]
/// rather than a hang.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForgeClient: Send + Sync {
    async fn check_visibility(
        &self,
        repo: &RepositoryReference,
    ) -> Result<Visibility, ForgeError>;

    /// Searches the most recent CI runs, newest first, for a lint report.
    /// Individual runs that fail to yield one are skipped.
    async fn find_artifact(
        &self,
        repo: &RepositoryReference,
    ) -> Result<Option<LocatedArtifact>, ForgeError>;

    /// Downloads a gzipped tarball of the default branch
    async fn download_snapshot(&self, repo: &RepositoryReference) -> Result<Bytes, ForgeError>;
}
