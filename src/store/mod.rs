//! Assessment record storage
//!
//! Records move `pending -> success | failed` and nothing else writes them.
//! Stores apply [`RecordUpdate`]s; the rules for what each update does to a
//! record live in [`AssessmentRecord::apply`] so every backend agrees.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::scoring::QualityReport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access record at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialization(String),

    #[error("Invalid submission id: {0:?}")]
    InvalidSubmissionId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Pending,
    Success,
    Failed,
}

impl AssessmentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AssessmentStatus::Pending)
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssessmentStatus::Pending => "pending",
            AssessmentStatus::Success => "success",
            AssessmentStatus::Failed => "failed",
        })
    }
}

/// Persisted outcome for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    pub status: AssessmentStatus,
    pub score: Option<u8>,
    pub error_count: u64,
    pub warning_count: u64,
    pub report: Option<Value>,
    pub failure_reason: Option<String>,
    pub last_evaluated_at: DateTime<Utc>,
}

/// A state transition requested by the pipeline
#[derive(Debug, Clone)]
pub enum RecordUpdate {
    Pending {
        at: DateTime<Utc>,
    },
    Success {
        report: Box<QualityReport>,
        at: DateTime<Utc>,
    },
    Failed {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl RecordUpdate {
    pub fn pending() -> Self {
        RecordUpdate::Pending { at: Utc::now() }
    }

    pub fn success(report: QualityReport) -> Self {
        RecordUpdate::Success {
            report: Box::new(report),
            at: Utc::now(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        RecordUpdate::Failed {
            reason: reason.into(),
            at: Utc::now(),
        }
    }

    pub fn status(&self) -> AssessmentStatus {
        match self {
            RecordUpdate::Pending { .. } => AssessmentStatus::Pending,
            RecordUpdate::Success { .. } => AssessmentStatus::Success,
            RecordUpdate::Failed { .. } => AssessmentStatus::Failed,
        }
    }
}

impl AssessmentRecord {
    /// Produces the record that results from applying `update`.
    ///
    /// Pending keeps the previous score and report so consumers can keep
    /// showing them while a re-assessment runs. Failure clears the score and
    /// zeroes the counts.
    pub fn apply(previous: Option<&Self>, update: &RecordUpdate) -> Result<Self, StoreError> {
        let record = match update {
            RecordUpdate::Pending { at } => match previous {
                Some(previous) => Self {
                    status: AssessmentStatus::Pending,
                    last_evaluated_at: *at,
                    ..previous.clone()
                },
                None => Self {
                    status: AssessmentStatus::Pending,
                    score: None,
                    error_count: 0,
                    warning_count: 0,
                    report: None,
                    failure_reason: None,
                    last_evaluated_at: *at,
                },
            },
            RecordUpdate::Success { report, at } => Self {
                status: AssessmentStatus::Success,
                score: Some(report.score()),
                error_count: report.error_count(),
                warning_count: report.warning_count(),
                report: Some(
                    serde_json::to_value(report.as_ref())
                        .map_err(|e| StoreError::Serialization(e.to_string()))?,
                ),
                failure_reason: None,
                last_evaluated_at: *at,
            },
            RecordUpdate::Failed { reason, at } => Self {
                status: AssessmentStatus::Failed,
                score: None,
                error_count: 0,
                warning_count: 0,
                report: Some(json!({ "message": reason })),
                failure_reason: Some(reason.clone()),
                last_evaluated_at: *at,
            },
        };
        Ok(record)
    }
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Applies a transition and returns the stored record
    async fn apply(
        &self,
        submission_id: &str,
        update: RecordUpdate,
    ) -> Result<AssessmentRecord, StoreError>;

    async fn get(&self, submission_id: &str) -> Result<Option<AssessmentRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::NormalizedFindings;
    use crate::scoring::{ReportBuilder, ReportSource};

    fn report() -> QualityReport {
        ReportBuilder::new(ReportSource::Local)
            .bucket("javascript", 3, NormalizedFindings::new(4, 3), None)
            .build()
    }

    #[test]
    fn test_success_record() {
        let record = AssessmentRecord::apply(None, &RecordUpdate::success(report())).unwrap();

        assert_eq!(record.status, AssessmentStatus::Success);
        assert_eq!(record.score, Some(74));
        assert_eq!(record.error_count, 4);
        assert_eq!(record.warning_count, 3);
        assert!(record.failure_reason.is_none());
        assert_eq!(record.report.unwrap()["perBucket"][0]["label"], "javascript");
    }

    #[test]
    fn test_failed_record_clears_score() {
        let success = AssessmentRecord::apply(None, &RecordUpdate::success(report())).unwrap();
        let failed =
            AssessmentRecord::apply(Some(&success), &RecordUpdate::failed("boom")).unwrap();

        assert_eq!(failed.status, AssessmentStatus::Failed);
        assert_eq!(failed.score, None);
        assert_eq!(failed.error_count, 0);
        assert_eq!(failed.warning_count, 0);
        assert_eq!(failed.failure_reason.as_deref(), Some("boom"));
        assert_eq!(failed.report, Some(json!({"message": "boom"})));
    }

    #[test]
    fn test_pending_keeps_previous_result() {
        let success = AssessmentRecord::apply(None, &RecordUpdate::success(report())).unwrap();
        let pending = AssessmentRecord::apply(Some(&success), &RecordUpdate::pending()).unwrap();

        assert_eq!(pending.status, AssessmentStatus::Pending);
        assert_eq!(pending.score, Some(74));
        assert!(pending.last_evaluated_at >= success.last_evaluated_at);
    }

    #[test]
    fn test_record_field_names() {
        let record = AssessmentRecord::apply(None, &RecordUpdate::failed("nope")).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["status"], "failed");
        assert!(value["score"].is_null());
        assert_eq!(value["errorCount"], 0);
        assert_eq!(value["failureReason"], "nope");
        assert!(value["lastEvaluatedAt"].is_string());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!AssessmentStatus::Pending.is_terminal());
        assert!(AssessmentStatus::Success.is_terminal());
        assert!(AssessmentStatus::Failed.is_terminal());
        assert_eq!(AssessmentStatus::Failed.to_string(), "failed");
    }
}
