use super::{AssessmentRecord, AssessmentStatus, AssessmentStore, RecordUpdate, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Entry {
    record: Option<AssessmentRecord>,
    history: Vec<AssessmentStatus>,
}

/// Process-local store that also remembers every status a record passed through
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses written for a submission, oldest first
    pub fn history(&self, submission_id: &str) -> Vec<AssessmentStatus> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .get(submission_id)
                    .map(|e| e.history.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Seeds a record, e.g. the result of an earlier assessment
    pub fn insert(&self, submission_id: &str, record: AssessmentRecord) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.entry(submission_id.to_string()).or_default().record = Some(record);
        }
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn apply(
        &self,
        submission_id: &str,
        update: RecordUpdate,
    ) -> Result<AssessmentRecord, StoreError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = entries.entry(submission_id.to_string()).or_default();

        let record = AssessmentRecord::apply(entry.record.as_ref(), &update)?;
        entry.record = Some(record.clone());
        entry.history.push(record.status);
        Ok(record)
    }

    async fn get(&self, submission_id: &str) -> Result<Option<AssessmentRecord>, StoreError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(submission_id).and_then(|e| e.record.clone()))
    }
}
