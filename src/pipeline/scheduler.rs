use super::assessment::AssessmentPipeline;
use super::error::AssessmentError;
use crate::store::AssessmentRecord;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One submission to assess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentJob {
    pub submission_id: String,
    pub reference: String,
}

impl AssessmentJob {
    pub fn new(submission_id: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            submission_id: submission_id.into(),
            reference: reference.into(),
        }
    }
}

/// Runs assessments in the background with bounded concurrency
pub struct AssessmentScheduler {
    pipeline: Arc<AssessmentPipeline>,
    permits: Arc<Semaphore>,
    root: CancellationToken,
}

impl AssessmentScheduler {
    pub fn new(pipeline: Arc<AssessmentPipeline>, max_concurrency: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            root: CancellationToken::new(),
        }
    }

    /// Fire-and-forget submission; the handle resolves to the terminal record
    pub fn submit(&self, job: AssessmentJob) -> JoinHandle<Result<AssessmentRecord, AssessmentError>> {
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        let cancel = self.root.child_token();

        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| AssessmentError::Cancelled)?;
            debug!(submission = %job.submission_id, "Assessment slot acquired");

            pipeline
                .trigger_assessment_with_cancel(&job.submission_id, &job.reference, cancel)
                .await
        })
    }

    /// Submits every job and waits for all of them, in submission order
    pub async fn run_all(
        &self,
        jobs: Vec<AssessmentJob>,
    ) -> Vec<(String, Result<AssessmentRecord, AssessmentError>)> {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| (job.submission_id.clone(), self.submit(job)))
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (submission_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(AssessmentError::Panicked(e.to_string())),
                Err(_) => Err(AssessmentError::Cancelled),
            };
            results.push((submission_id, result));
        }
        results
    }

    /// Cancels every running assessment. Each is recorded as failed.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.permits.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::AnalyzerRegistry;
    use crate::forge::{MockForgeClient, Visibility};
    use crate::progress::NoOpHandler;
    use crate::store::{AssessmentStatus, MemoryStore};

    fn pipeline(store: Arc<MemoryStore>) -> Arc<AssessmentPipeline> {
        let mut forge = MockForgeClient::new();
        forge
            .expect_check_visibility()
            .returning(|_| Ok(Visibility::Private));
        Arc::new(
            AssessmentPipeline::builder(Arc::new(forge), store, Arc::new(AnalyzerRegistry::new()))
                .progress(Arc::new(NoOpHandler))
                .build(),
        )
    }

    #[tokio::test]
    async fn test_run_all_preserves_order() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = AssessmentScheduler::new(pipeline(store.clone()), 2);

        let results = scheduler
            .run_all(vec![
                AssessmentJob::new("a", "https://github.com/acme/one"),
                AssessmentJob::new("b", "not a url"),
                AssessmentJob::new("c", "https://github.com/acme/three"),
            ])
            .await;

        let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            results[0].1.as_ref().unwrap().status,
            AssessmentStatus::Failed
        );
        assert!(matches!(
            results[1].1,
            Err(AssessmentError::InvalidReference(_))
        ));
        assert_eq!(
            store.history("c"),
            vec![AssessmentStatus::Pending, AssessmentStatus::Failed]
        );
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_cancelled() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = AssessmentScheduler::new(pipeline(store.clone()), 1);
        scheduler.shutdown();
        assert!(scheduler.is_shut_down());

        let result = scheduler
            .submit(AssessmentJob::new("late", "https://github.com/acme/late"))
            .await
            .unwrap();

        assert!(matches!(result, Err(AssessmentError::Cancelled)));
        assert!(store.history("late").is_empty());
    }
}
