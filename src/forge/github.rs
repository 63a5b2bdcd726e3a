//! GitHub REST client
//!
//! The token is sent only in the `Authorization` header. It is never logged
//! and never included in error messages.

use super::artifact::{extract_report, is_lint_artifact};
use super::client::{ForgeClient, LocatedArtifact, Visibility};
use super::{ForgeError, RepositoryReference};
use crate::config::RepogradeConfig;
use crate::findings::AnalysisArtifact;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const MAX_REDIRECTS: usize = 5;

/// Connection settings for [`GitHubClient`]
#[derive(Clone)]
pub struct GitHubSettings {
    pub api_url: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub visibility_timeout: Duration,
    pub artifact_timeout: Duration,
    pub snapshot_timeout: Duration,
    pub artifact_runs: u32,
    pub max_snapshot_bytes: u64,
    pub max_artifact_bytes: u64,
}

impl GitHubSettings {
    pub fn from_config(config: &RepogradeConfig) -> Self {
        Self {
            api_url: config.forge_api_url.clone(),
            token: config.forge_token.clone(),
            connect_timeout: config.connect_timeout(),
            visibility_timeout: config.visibility_timeout(),
            artifact_timeout: config.artifact_timeout(),
            snapshot_timeout: config.snapshot_timeout(),
            artifact_runs: config.artifact_runs,
            max_snapshot_bytes: config.max_snapshot_bytes,
            max_artifact_bytes: config.max_artifact_bytes,
        }
    }

    /// Overrides the token, e.g. with one passed on the command line
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.token = token;
        }
        self
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryMetadata {
    #[serde(default)]
    private: bool,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunList {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ArtifactList {
    #[serde(default)]
    artifacts: Vec<ArtifactSummary>,
}

#[derive(Debug, Deserialize)]
struct ArtifactSummary {
    name: String,
    #[serde(default)]
    expired: bool,
    archive_download_url: String,
}

pub struct GitHubClient {
    http: Client,
    settings: GitHubSettings,
}

impl GitHubClient {
    pub fn new(settings: GitHubSettings) -> Result<Self, ForgeError> {
        let http = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("repograde/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ForgeError::Network {
                url: settings.api_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self { http, settings })
    }

    pub fn from_config(config: &RepogradeConfig) -> Result<Self, ForgeError> {
        Self::new(GitHubSettings::from_config(config))
    }

    fn repo_url(&self, repo: &RepositoryReference, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.settings.api_url.trim_end_matches('/'),
            repo.owner(),
            repo.name(),
            suffix
        )
    }

    fn get(&self, url: &str, timeout: Duration) -> RequestBuilder {
        let request = self
            .http
            .get(url)
            .timeout(timeout)
            .header(ACCEPT, GITHUB_ACCEPT);

        match &self.settings.token {
            Some(token) => request.header(AUTHORIZATION, format!("token {}", token)),
            None => request,
        }
    }

    async fn send(&self, url: &str, timeout: Duration) -> Result<Response, ForgeError> {
        let response = self
            .get(url, timeout)
            .send()
            .await
            .map_err(|e| ForgeError::from_reqwest(url, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ForgeError::from_status(url, status, response.headers()))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, ForgeError> {
        self.send(url, timeout)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ForgeError::from_reqwest(url, e))
    }

    /// Buffers a response body, giving up once it passes `limit` bytes
    async fn read_capped(
        &self,
        url: &str,
        mut response: Response,
        limit: u64,
    ) -> Result<Bytes, ForgeError> {
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(ForgeError::TooLarge { limit });
        }

        let mut buffer = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ForgeError::from_reqwest(url, e))?
        {
            if buffer.len() as u64 + chunk.len() as u64 > limit {
                return Err(ForgeError::TooLarge { limit });
            }
            buffer.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buffer))
    }

    /// Looks for a lint report among one run's artifacts
    async fn search_run(
        &self,
        repo: &RepositoryReference,
        run_id: u64,
    ) -> Result<Option<LocatedArtifact>, ForgeError> {
        let url = self.repo_url(repo, &format!("/actions/runs/{}/artifacts", run_id));
        let listing: ArtifactList = self.get_json(&url, self.settings.artifact_timeout).await?;

        let Some(artifact) = listing
            .artifacts
            .into_iter()
            .find(|a| !a.expired && is_lint_artifact(&a.name))
        else {
            return Ok(None);
        };

        debug!(run_id, artifact = %artifact.name, "Downloading lint artifact bundle");
        let limit = self.settings.max_artifact_bytes;
        let response = self
            .send(&artifact.archive_download_url, self.settings.artifact_timeout)
            .await?;
        let bundle = self
            .read_capped(&artifact.archive_download_url, response, limit)
            .await?;

        let found = tokio::task::spawn_blocking(move || extract_report(&bundle, limit))
            .await
            .map_err(|e| ForgeError::InvalidArchive(e.to_string()))??;

        Ok(found.map(|(entry_name, value)| LocatedArtifact {
            run_id,
            artifact_name: artifact.name,
            entry_name,
            report: AnalysisArtifact::new(value),
        }))
    }
}

#[async_trait]
impl ForgeClient for GitHubClient {
    async fn check_visibility(
        &self,
        repo: &RepositoryReference,
    ) -> Result<Visibility, ForgeError> {
        let url = self.repo_url(repo, "");
        match self
            .get_json::<RepositoryMetadata>(&url, self.settings.visibility_timeout)
            .await
        {
            Ok(metadata) if metadata.private => Ok(Visibility::Private),
            Ok(_) => Ok(Visibility::Public),
            Err(e) if e.is_not_found() => Ok(Visibility::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn find_artifact(
        &self,
        repo: &RepositoryReference,
    ) -> Result<Option<LocatedArtifact>, ForgeError> {
        let url = self.repo_url(
            repo,
            &format!("/actions/runs?per_page={}", self.settings.artifact_runs),
        );
        let runs: WorkflowRunList = self.get_json(&url, self.settings.artifact_timeout).await?;
        debug!(repository = %repo, runs = runs.workflow_runs.len(), "Searching CI runs for lint artifacts");

        for run in runs.workflow_runs {
            match self.search_run(repo, run.id).await {
                Ok(Some(found)) => {
                    info!(
                        repository = %repo,
                        run_id = found.run_id,
                        artifact = %found.artifact_name,
                        entry = %found.entry_name,
                        "Found lint report artifact"
                    );
                    return Ok(Some(found));
                }
                Ok(None) => debug!(run_id = run.id, "No lint report in run"),
                Err(e) => warn!(run_id = run.id, error = %e, "Skipping run"),
            }
        }

        Ok(None)
    }

    async fn download_snapshot(&self, repo: &RepositoryReference) -> Result<Bytes, ForgeError> {
        let url = self.repo_url(repo, "/tarball");
        let response = self.send(&url, self.settings.snapshot_timeout).await?;
        let snapshot = self
            .read_capped(&url, response, self.settings.max_snapshot_bytes)
            .await?;

        debug!(repository = %repo, bytes = snapshot.len(), "Downloaded snapshot");
        Ok(snapshot)
    }
}
