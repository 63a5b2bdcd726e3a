use super::{AnalyzerError, AnalyzerRegistry, AnalyzerRequest};
use crate::classify::{ClassifiedFiles, LanguageBucket};
use crate::findings::NormalizedFindings;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::util::panic_message;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Result of analyzing one bucket
#[derive(Debug, Clone, PartialEq)]
pub struct BucketOutcome {
    pub bucket: LanguageBucket,
    pub analyzer: String,
    pub file_count: usize,
    /// `project:<source>` or `baseline@<version>`
    pub configuration: String,
    /// Findings, or the reason the analyzer produced none
    pub result: Result<NormalizedFindings, String>,
}

impl BucketOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs the analyzer for every non-empty bucket
///
/// A failing or panicking analyzer is recorded in its bucket's outcome and
/// does not stop the others. Only cancellation aborts the whole run.
pub struct AnalyzerOrchestrator {
    registry: Arc<AnalyzerRegistry>,
    progress: Arc<dyn ProgressHandler>,
}

impl AnalyzerOrchestrator {
    pub fn new(registry: Arc<AnalyzerRegistry>, progress: Arc<dyn ProgressHandler>) -> Self {
        Self { registry, progress }
    }

    pub async fn analyze(
        &self,
        files: &ClassifiedFiles,
        cancel: &CancellationToken,
    ) -> Result<Vec<BucketOutcome>, AnalyzerError> {
        let mut outcomes = Vec::new();

        for bucket in files.non_empty_buckets() {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled {
                    tool: bucket.label().to_string(),
                });
            }
            let bucket_files = files.files(bucket);

            let Some(analyzer) = self.registry.get(bucket) else {
                warn!(bucket = %bucket, "No analyzer registered");
                outcomes.push(BucketOutcome {
                    bucket,
                    analyzer: String::new(),
                    file_count: bucket_files.len(),
                    configuration: String::new(),
                    result: Err(format!("No analyzer registered for {}", bucket)),
                });
                continue;
            };

            let config = analyzer.resolve_config(files.root());
            self.progress.on_progress(&ProgressEvent::AnalyzerStarted {
                bucket,
                analyzer: analyzer.name().to_string(),
                files: bucket_files.len(),
            });

            let started = Instant::now();
            let run = AssertUnwindSafe(analyzer.run(AnalyzerRequest {
                root: files.root(),
                files: bucket_files,
                config: &config,
                cancel,
            }))
            .catch_unwind();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AnalyzerError::Cancelled {
                    tool: analyzer.name().to_string(),
                }),
                caught = run => caught.unwrap_or_else(|payload| {
                    Err(AnalyzerError::Panicked {
                        tool: analyzer.name().to_string(),
                        message: panic_message(payload),
                    })
                }),
            };

            self.progress.on_progress(&ProgressEvent::AnalyzerComplete {
                bucket,
                analyzer: analyzer.name().to_string(),
                duration: started.elapsed(),
                success: result.is_ok(),
            });

            let result = match result {
                Ok(artifact) => {
                    let findings = artifact.normalize();
                    info!(
                        bucket = %bucket,
                        errors = findings.error_count,
                        warnings = findings.warning_count,
                        "Bucket analyzed"
                    );
                    Ok(findings)
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(bucket = %bucket, error = %e, "Analyzer failed");
                    Err(e.to_string())
                }
            };

            outcomes.push(BucketOutcome {
                bucket,
                analyzer: analyzer.name().to_string(),
                file_count: bucket_files.len(),
                configuration: config.to_string(),
                result,
            });
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::config::ESLINT_BASELINE;
    use crate::analyzers::{Analyzer, ConfigResolution};
    use crate::classify::FileClassifier;
    use crate::findings::AnalysisArtifact;
    use crate::progress::NoOpHandler;
    use async_trait::async_trait;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    enum Behaviour {
        Report(serde_json::Value),
        Fail,
        Cancel,
        Panic,
    }

    struct FakeAnalyzer {
        bucket: LanguageBucket,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl Analyzer for FakeAnalyzer {
        fn name(&self) -> &str {
            "fake"
        }

        fn bucket(&self) -> LanguageBucket {
            self.bucket
        }

        fn resolve_config(&self, _root: &Path) -> ConfigResolution {
            ConfigResolution::Baseline(&ESLINT_BASELINE)
        }

        async fn run(
            &self,
            _request: AnalyzerRequest<'_>,
        ) -> Result<AnalysisArtifact, AnalyzerError> {
            match &self.behaviour {
                Behaviour::Report(value) => Ok(AnalysisArtifact::new(value.clone())),
                Behaviour::Fail => Err(AnalyzerError::UnreadableOutput {
                    tool: "fake".to_string(),
                    status: Some(2),
                    stderr: "boom".to_string(),
                }),
                Behaviour::Cancel => Err(AnalyzerError::Cancelled {
                    tool: "fake".to_string(),
                }),
                Behaviour::Panic => panic!("linter crashed"),
            }
        }
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.js"), "1;").unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        dir
    }

    fn orchestrator(analyzers: Vec<FakeAnalyzer>) -> AnalyzerOrchestrator {
        let mut registry = AnalyzerRegistry::new();
        for analyzer in analyzers {
            registry.register(Arc::new(analyzer));
        }
        AnalyzerOrchestrator::new(Arc::new(registry), Arc::new(NoOpHandler))
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_bucket() {
        let dir = tree();
        let files = FileClassifier::default().classify(dir.path()).unwrap();
        let orchestrator = orchestrator(vec![
            FakeAnalyzer {
                bucket: LanguageBucket::Script,
                behaviour: Behaviour::Report(json!([{"errorCount": 2, "warningCount": 1}])),
            },
            FakeAnalyzer {
                bucket: LanguageBucket::Markup,
                behaviour: Behaviour::Fail,
            },
        ]);

        let outcomes = orchestrator
            .analyze(&files, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].bucket, LanguageBucket::Script);
        assert_eq!(outcomes[0].result, Ok(NormalizedFindings::new(2, 1)));
        assert_eq!(outcomes[0].configuration, "baseline@1");
        assert!(!outcomes[1].is_success());
        assert!(outcomes[1].result.as_ref().unwrap_err().contains("boom"));
    }

    #[tokio::test]
    async fn test_empty_buckets_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("style.css"), "a {}").unwrap();
        let files = FileClassifier::default().classify(dir.path()).unwrap();
        let orchestrator = orchestrator(vec![FakeAnalyzer {
            bucket: LanguageBucket::Stylesheet,
            behaviour: Behaviour::Report(json!([])),
        }]);

        let outcomes = orchestrator
            .analyze(&files, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].bucket, LanguageBucket::Stylesheet);
    }

    #[tokio::test]
    async fn test_missing_analyzer_is_recorded_as_failure() {
        let dir = tree();
        let files = FileClassifier::default().classify(dir.path()).unwrap();
        let orchestrator = orchestrator(vec![]);

        let outcomes = orchestrator
            .analyze(&files, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_success()));
    }

    #[tokio::test]
    async fn test_cancellation_aborts() {
        let dir = tree();
        let files = FileClassifier::default().classify(dir.path()).unwrap();
        let orchestrator = orchestrator(vec![FakeAnalyzer {
            bucket: LanguageBucket::Script,
            behaviour: Behaviour::Cancel,
        }]);

        let result = orchestrator.analyze(&files, &CancellationToken::new()).await;
        assert!(matches!(result, Err(AnalyzerError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_panic_is_isolated_to_its_bucket() {
        let dir = tree();
        let files = FileClassifier::default().classify(dir.path()).unwrap();
        let orchestrator = orchestrator(vec![
            FakeAnalyzer {
                bucket: LanguageBucket::Script,
                behaviour: Behaviour::Panic,
            },
            FakeAnalyzer {
                bucket: LanguageBucket::Markup,
                behaviour: Behaviour::Report(json!([{"errorCount": 0, "warningCount": 2}])),
            },
        ]);

        let outcomes = orchestrator
            .analyze(&files, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        let reason = outcomes[0].result.as_ref().unwrap_err();
        assert!(reason.contains("linter crashed"));
        assert_eq!(outcomes[1].result, Ok(NormalizedFindings::new(0, 2)));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_remaining_buckets() {
        let dir = tree();
        let files = FileClassifier::default().classify(dir.path()).unwrap();
        let orchestrator = orchestrator(vec![FakeAnalyzer {
            bucket: LanguageBucket::Script,
            behaviour: Behaviour::Report(json!([])),
        }]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = orchestrator.analyze(&files, &cancel).await;
        assert!(matches!(result, Err(AnalyzerError::Cancelled { .. })));
    }
}
