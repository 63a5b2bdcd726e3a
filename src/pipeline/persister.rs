//! Status transitions for one assessment run
//!
//! [`ResultPersister::begin`] writes `pending` and hands back a
//! [`PendingRun`]. The run is settled by [`PendingRun::finish`], which takes
//! it by value, so each run writes at most one terminal status. A run dropped
//! unsettled (its future cancelled by the caller, or the terminal write
//! failing) schedules a `failed` write so the record never stays pending.

use crate::store::{AssessmentRecord, AssessmentStore, RecordUpdate, StoreError};
use std::sync::Arc;
use tracing::{error, warn};

pub const INTERRUPTED_REASON: &str = "Assessment was interrupted before its result was recorded";

pub struct ResultPersister {
    store: Arc<dyn AssessmentStore>,
}

impl ResultPersister {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    pub async fn begin(&self, submission_id: &str) -> Result<PendingRun, StoreError> {
        self.store
            .apply(submission_id, RecordUpdate::pending())
            .await?;
        Ok(PendingRun {
            store: Arc::clone(&self.store),
            submission_id: submission_id.to_string(),
            settled: false,
        })
    }
}

#[must_use = "a pending run must be finished"]
pub struct PendingRun {
    store: Arc<dyn AssessmentStore>,
    submission_id: String,
    settled: bool,
}

impl PendingRun {
    /// Writes the terminal status
    pub async fn finish(mut self, update: RecordUpdate) -> Result<AssessmentRecord, StoreError> {
        debug_assert!(update.status().is_terminal());
        let result = self.store.apply(&self.submission_id, update).await;
        self.settled = result.is_ok();
        result
    }
}

impl Drop for PendingRun {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let store = Arc::clone(&self.store);
        let submission_id = std::mem::take(&mut self.submission_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(submission = %submission_id, "Assessment ended without a result, marking it failed");
                handle.spawn(async move {
                    if let Err(e) = store
                        .apply(&submission_id, RecordUpdate::failed(INTERRUPTED_REASON))
                        .await
                    {
                        error!(submission = %submission_id, error = %e, "Failed to mark interrupted assessment as failed");
                    }
                });
            }
            Err(_) => {
                error!(submission = %submission_id, "Assessment abandoned outside a runtime, record left pending");
            }
        }
    }
}
