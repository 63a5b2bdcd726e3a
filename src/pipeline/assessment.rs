use super::error::AssessmentError;
use super::persister::ResultPersister;
use crate::analyzers::{AnalyzerOrchestrator, AnalyzerRegistry, AnalyzerSettings};
use crate::classify::FileClassifier;
use crate::config::RepogradeConfig;
use crate::forge::{ForgeClient, RepositoryReference};
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use crate::scoring::{FileCounts, QualityReport, ReportBuilder, ReportSource};
use crate::store::{AssessmentRecord, AssessmentStore, RecordUpdate};
use crate::util::panic_message;
use crate::workspace::{snapshot_digest, MaterializeError, Materializer};
use bytes::Bytes;
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// What to do when the forge cannot answer the visibility check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VisibilityPolicy {
    /// Assume the repository is accessible and carry on. A private or
    /// rate-limited repository may then proceed as if public.
    #[default]
    Optimistic,
    /// Treat the repository as inaccessible
    FailClosed,
}

/// Runs assessments end to end: visibility check, CI artifact lookup,
/// snapshot analysis, scoring and persistence
pub struct AssessmentPipeline {
    forge: Arc<dyn ForgeClient>,
    store: Arc<dyn AssessmentStore>,
    persister: ResultPersister,
    orchestrator: AnalyzerOrchestrator,
    classifier: Arc<FileClassifier>,
    materializer: Arc<Materializer>,
    progress: Arc<dyn ProgressHandler>,
    visibility_policy: VisibilityPolicy,
}

pub struct PipelineBuilder {
    forge: Arc<dyn ForgeClient>,
    store: Arc<dyn AssessmentStore>,
    registry: Arc<AnalyzerRegistry>,
    work_dir: PathBuf,
    classifier: FileClassifier,
    progress: Arc<dyn ProgressHandler>,
    visibility_policy: VisibilityPolicy,
}

impl PipelineBuilder {
    pub fn work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn classifier(mut self, classifier: FileClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn visibility_policy(mut self, policy: VisibilityPolicy) -> Self {
        self.visibility_policy = policy;
        self
    }

    pub fn build(self) -> AssessmentPipeline {
        AssessmentPipeline {
            persister: ResultPersister::new(Arc::clone(&self.store)),
            orchestrator: AnalyzerOrchestrator::new(self.registry, Arc::clone(&self.progress)),
            forge: self.forge,
            store: self.store,
            classifier: Arc::new(self.classifier),
            materializer: Arc::new(Materializer::new(self.work_dir)),
            progress: self.progress,
            visibility_policy: self.visibility_policy,
        }
    }
}

impl AssessmentPipeline {
    pub fn builder(
        forge: Arc<dyn ForgeClient>,
        store: Arc<dyn AssessmentStore>,
        registry: Arc<AnalyzerRegistry>,
    ) -> PipelineBuilder {
        PipelineBuilder {
            forge,
            store,
            registry,
            work_dir: std::env::temp_dir(),
            classifier: FileClassifier::default(),
            progress: Arc::new(LoggingHandler),
            visibility_policy: VisibilityPolicy::default(),
        }
    }

    /// Pipeline with the built-in analyzers and settings from `config`
    pub fn from_config(
        config: &RepogradeConfig,
        forge: Arc<dyn ForgeClient>,
        store: Arc<dyn AssessmentStore>,
    ) -> Self {
        let registry = AnalyzerRegistry::with_defaults(&AnalyzerSettings::from_config(config));
        let policy = if config.visibility_fail_closed {
            VisibilityPolicy::FailClosed
        } else {
            VisibilityPolicy::Optimistic
        };

        Self::builder(forge, store, Arc::new(registry))
            .work_dir(config.work_dir.clone())
            .visibility_policy(policy)
            .build()
    }

    /// Assesses the repository behind `reference` and records the outcome.
    ///
    /// Returns the terminal record, which may be `failed`. `Err` is returned
    /// only for an unparsable reference (nothing is written) or when the
    /// store itself fails.
    pub async fn trigger_assessment(
        &self,
        submission_id: &str,
        reference: &str,
    ) -> Result<AssessmentRecord, AssessmentError> {
        self.trigger_assessment_with_cancel(submission_id, reference, CancellationToken::new())
            .await
    }

    /// Like [`trigger_assessment`](Self::trigger_assessment), aborting with a
    /// `failed` record once `cancel` fires
    pub async fn trigger_assessment_with_cancel(
        &self,
        submission_id: &str,
        reference: &str,
        cancel: CancellationToken,
    ) -> Result<AssessmentRecord, AssessmentError> {
        let repo = RepositoryReference::parse(reference)?;
        let span = info_span!(
            "assessment",
            submission = %submission_id,
            repository = %repo,
            run_id = %Uuid::new_v4()
        );

        self.run(submission_id, repo, cancel).instrument(span).await
    }

    pub async fn get_assessment(
        &self,
        submission_id: &str,
    ) -> Result<Option<AssessmentRecord>, AssessmentError> {
        Ok(self.store.get(submission_id).await?)
    }

    /// Scores a local directory without touching the forge or the store
    pub async fn assess_directory(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<QualityReport, AssessmentError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AssessmentError::Cancelled),
            builder = self.analyze_root(root.to_path_buf(), ReportSource::Local, cancel) => {
                builder.map(ReportBuilder::build)
            }
        }
    }

    async fn run(
        &self,
        submission_id: &str,
        repo: RepositoryReference,
        cancel: CancellationToken,
    ) -> Result<AssessmentRecord, AssessmentError> {
        let started = Instant::now();
        let pending = self.persister.begin(submission_id).await?;
        self.progress.on_progress(&ProgressEvent::Started {
            submission_id: submission_id.to_string(),
            repository: repo.full_name(),
        });

        let outcome = AssertUnwindSafe(self.evaluate(&repo, &cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(AssessmentError::Panicked(panic_message(payload))));

        let update = match outcome {
            Ok(report) => {
                self.progress.on_progress(&ProgressEvent::Completed {
                    submission_id: submission_id.to_string(),
                    score: report.score(),
                    total_time: started.elapsed(),
                });
                RecordUpdate::success(report)
            }
            Err(e) => {
                let reason = e.failure_reason();
                self.progress.on_progress(&ProgressEvent::Failed {
                    submission_id: submission_id.to_string(),
                    reason: reason.clone(),
                });
                RecordUpdate::failed(reason)
            }
        };

        Ok(pending.finish(update).await?)
    }

    /// Network stages race the cancel token. Once a snapshot is in hand the
    /// token is handed down instead, so the extracted tree is always dropped
    /// before this returns.
    async fn evaluate(
        &self,
        repo: &RepositoryReference,
        cancel: &CancellationToken,
    ) -> Result<QualityReport, AssessmentError> {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AssessmentError::Cancelled),
            fetched = self.fetch_source(repo) => fetched?,
        };

        match fetched {
            FetchedSource::Artifact(report) => Ok(report),
            FetchedSource::Snapshot(snapshot) => self.assess_snapshot(snapshot, cancel).await,
        }
    }

    async fn fetch_source(
        &self,
        repo: &RepositoryReference,
    ) -> Result<FetchedSource, AssessmentError> {
        self.check_access(repo).await?;

        if let Some(report) = self.try_artifact(repo).await {
            return Ok(FetchedSource::Artifact(report));
        }

        match self
            .timed("snapshot", self.forge.download_snapshot(repo))
            .await
        {
            Ok(snapshot) => Ok(FetchedSource::Snapshot(snapshot)),
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Snapshot download failed");
                Err(AssessmentError::ForgeUnavailable(e))
            }
        }
    }

    async fn check_access(&self, repo: &RepositoryReference) -> Result<(), AssessmentError> {
        match self
            .timed("visibility", self.forge.check_visibility(repo))
            .await
        {
            Ok(visibility) if visibility.is_accessible() => Ok(()),
            Ok(visibility) => {
                info!(?visibility, "Repository is not accessible");
                Err(AssessmentError::RepositoryInaccessible {
                    repository: repo.full_name(),
                })
            }
            Err(e) => match self.visibility_policy {
                VisibilityPolicy::Optimistic => {
                    warn!(error = %e, "Visibility check failed, assuming the repository is accessible");
                    Ok(())
                }
                VisibilityPolicy::FailClosed => {
                    warn!(error = %e, "Visibility check failed, treating the repository as inaccessible");
                    Err(AssessmentError::RepositoryInaccessible {
                        repository: repo.full_name(),
                    })
                }
            },
        }
    }

    async fn try_artifact(&self, repo: &RepositoryReference) -> Option<QualityReport> {
        match self.timed("artifact", self.forge.find_artifact(repo)).await {
            Ok(Some(found)) => {
                self.progress.on_progress(&ProgressEvent::ArtifactFound {
                    run_id: found.run_id,
                    artifact: found.artifact_name.clone(),
                });
                Some(QualityReport::from_artifact(&found.report))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "CI artifact lookup failed, analyzing a snapshot instead"
                );
                None
            }
        }
    }

    async fn assess_snapshot(
        &self,
        snapshot: Bytes,
        cancel: &CancellationToken,
    ) -> Result<QualityReport, AssessmentError> {
        let digest = snapshot_digest(&snapshot);
        let materializer = Arc::clone(&self.materializer);
        let token = cancel.clone();
        let tree = match self
            .timed(
                "materialize",
                tokio::task::spawn_blocking(move || materializer.extract_tarball(&snapshot, &token)),
            )
            .await
            .map_err(join_error)?
        {
            Ok(tree) => tree,
            Err(MaterializeError::Cancelled) => return Err(AssessmentError::Cancelled),
            Err(e) => return Err(e.into()),
        };

        let builder = self
            .analyze_root(tree.root().to_path_buf(), ReportSource::Local, cancel)
            .await;

        if let Err(e) = tree.close() {
            warn!(error = %e, "Failed to remove snapshot directory");
        }

        Ok(builder?.snapshot_sha256(digest).build())
    }

    async fn analyze_root(
        &self,
        root: PathBuf,
        source: ReportSource,
        cancel: &CancellationToken,
    ) -> Result<ReportBuilder, AssessmentError> {
        let classifier = Arc::clone(&self.classifier);
        let files = self
            .timed(
                "classify",
                tokio::task::spawn_blocking(move || classifier.classify(&root)),
            )
            .await
            .map_err(join_error)??;

        if cancel.is_cancelled() {
            return Err(AssessmentError::Cancelled);
        }

        let outcomes = self
            .timed("analyze", self.orchestrator.analyze(&files, cancel))
            .await
            .map_err(|_| AssessmentError::Cancelled)?;

        if !outcomes.is_empty() && outcomes.iter().all(|o| !o.is_success()) {
            let reasons = outcomes
                .iter()
                .filter_map(|o| o.result.as_ref().err().map(|r| format!("{}: {}", o.bucket, r)))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AssessmentError::AllAnalyzersFailed(reasons));
        }

        Ok(outcomes.iter().fold(
            ReportBuilder::new(source).file_counts(FileCounts::from(&files)),
            |builder, outcome| builder.outcome(outcome),
        ))
    }

    async fn timed<F: Future>(&self, stage: &'static str, fut: F) -> F::Output {
        self.progress
            .on_progress(&ProgressEvent::StageStarted { stage });
        let started = Instant::now();
        let output = fut.await;
        self.progress.on_progress(&ProgressEvent::StageComplete {
            stage,
            duration: started.elapsed(),
        });
        output
    }
}

fn join_error(e: JoinError) -> AssessmentError {
    if e.is_panic() {
        AssessmentError::Panicked(panic_message(e.into_panic()))
    } else {
        AssessmentError::Cancelled
    }
}

/// Outcome of the network stages
enum FetchedSource {
    Artifact(QualityReport),
    Snapshot(Bytes),
}
