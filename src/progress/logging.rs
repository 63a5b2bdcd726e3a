//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                submission_id,
                repository,
            } => {
                info!(submission = %submission_id, repository = %repository, "Starting assessment");
            }
            ProgressEvent::StageStarted { stage } => {
                debug!(stage, "Starting stage");
            }
            ProgressEvent::StageComplete { stage, duration } => {
                debug!(stage, duration_ms = duration.as_millis(), "Stage complete");
            }
            ProgressEvent::ArtifactFound { run_id, artifact } => {
                info!(run_id, artifact = %artifact, "Using CI lint report");
            }
            ProgressEvent::AnalyzerStarted {
                bucket,
                analyzer,
                files,
            } => {
                info!(bucket = %bucket, analyzer = %analyzer, files, "Running analyzer");
            }
            ProgressEvent::AnalyzerComplete {
                bucket,
                analyzer,
                duration,
                success,
            } => {
                if *success {
                    info!(
                        bucket = %bucket,
                        analyzer = %analyzer,
                        duration_ms = duration.as_millis(),
                        "Analyzer complete"
                    );
                } else {
                    warn!(
                        bucket = %bucket,
                        analyzer = %analyzer,
                        duration_ms = duration.as_millis(),
                        "Analyzer failed"
                    );
                }
            }
            ProgressEvent::Completed {
                submission_id,
                score,
                total_time,
            } => {
                info!(
                    submission = %submission_id,
                    score,
                    total_time_ms = total_time.as_millis(),
                    "Assessment complete"
                );
            }
            ProgressEvent::Failed {
                submission_id,
                reason,
            } => {
                warn!(submission = %submission_id, reason = %reason, "Assessment failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::LanguageBucket;
    use std::time::Duration;

    #[test]
    fn test_logging_handler_handles_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::Started {
                submission_id: "team-1".to_string(),
                repository: "acme/demo".to_string(),
            },
            ProgressEvent::StageStarted { stage: "visibility" },
            ProgressEvent::StageComplete {
                stage: "visibility",
                duration: Duration::from_millis(12),
            },
            ProgressEvent::ArtifactFound {
                run_id: 7,
                artifact: "eslint-report".to_string(),
            },
            ProgressEvent::AnalyzerStarted {
                bucket: LanguageBucket::Script,
                analyzer: "eslint".to_string(),
                files: 3,
            },
            ProgressEvent::AnalyzerComplete {
                bucket: LanguageBucket::Script,
                analyzer: "eslint".to_string(),
                duration: Duration::from_secs(2),
                success: true,
            },
            ProgressEvent::AnalyzerComplete {
                bucket: LanguageBucket::Markup,
                analyzer: "htmlhint".to_string(),
                duration: Duration::from_secs(1),
                success: false,
            },
            ProgressEvent::Completed {
                submission_id: "team-1".to_string(),
                score: 88,
                total_time: Duration::from_secs(5),
            },
            ProgressEvent::Failed {
                submission_id: "team-2".to_string(),
                reason: "Repository is private or not accessible".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
