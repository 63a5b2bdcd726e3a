//! Progress handler trait and events

use crate::classify::LanguageBucket;
use std::time::Duration;

/// Events emitted while an assessment runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Assessment started
    Started {
        submission_id: String,
        repository: String,
    },

    /// A pipeline stage started
    StageStarted { stage: &'static str },

    /// A pipeline stage completed
    StageComplete {
        stage: &'static str,
        duration: Duration,
    },

    /// A pre-computed report was found in CI artifacts
    ArtifactFound { run_id: u64, artifact: String },

    /// Analyzer run started
    AnalyzerStarted {
        bucket: LanguageBucket,
        analyzer: String,
        files: usize,
    },

    /// Analyzer run completed
    AnalyzerComplete {
        bucket: LanguageBucket,
        analyzer: String,
        duration: Duration,
        success: bool,
    },

    /// Assessment succeeded
    Completed {
        submission_id: String,
        score: u8,
        total_time: Duration,
    },

    /// Assessment failed
    Failed {
        submission_id: String,
        reason: String,
    },
}

/// Trait for handling progress events during an assessment
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_handler() {
        let handler = NoOpHandler;
        handler.on_progress(&ProgressEvent::StageStarted { stage: "visibility" });
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::Started {
            submission_id: "team-1".to_string(),
            repository: "acme/demo".to_string(),
        });
        handler.on_progress(&ProgressEvent::StageComplete {
            stage: "snapshot",
            duration: Duration::from_millis(50),
        });
        handler.on_progress(&ProgressEvent::Completed {
            submission_id: "team-1".to_string(),
            score: 74,
            total_time: Duration::from_secs(5),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::ArtifactFound {
            run_id: 42,
            artifact: "eslint-report".to_string(),
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("ArtifactFound"));
        assert!(debug_str.contains("run_id: 42"));
    }
}
