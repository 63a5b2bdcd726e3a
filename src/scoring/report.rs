use super::{bucket_score, combined_score, NEUTRAL_SCORE};
use crate::analyzers::BucketOutcome;
use crate::classify::{ClassifiedFiles, LanguageBucket};
use crate::findings::{AnalysisArtifact, NormalizedFindings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NO_LINTABLE_FILES_NOTE: &str =
    "No JavaScript, HTML or CSS files were found; the neutral score was applied";

/// Where the findings came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    /// A lint report published by the repository's own CI
    Artifact,
    /// Analyzers run against a downloaded snapshot
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketReport {
    pub label: String,
    pub file_count: usize,
    pub error_count: u64,
    pub warning_count: u64,
    pub bucket_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedBucket {
    pub label: String,
    pub file_count: usize,
    pub reason: String,
}

/// Files seen per language, including languages no analyzer covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCounts {
    pub javascript: usize,
    pub html: usize,
    pub css: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, usize>,
}

impl From<&ClassifiedFiles> for FileCounts {
    fn from(files: &ClassifiedFiles) -> Self {
        Self {
            javascript: files.file_count(LanguageBucket::Script),
            html: files.file_count(LanguageBucket::Markup),
            css: files.file_count(LanguageBucket::Stylesheet),
            other: files.other().clone(),
        }
    }
}

/// Outcome of one successful assessment. Built once through
/// [`ReportBuilder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    source: ReportSource,
    score: u8,
    error_count: u64,
    warning_count: u64,
    per_bucket: Vec<BucketReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    failed_buckets: Vec<FailedBucket>,
    file_counts: FileCounts,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    configurations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshot_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl QualityReport {
    /// Report for a CI-produced lint artifact, scored as one script bucket
    pub fn from_artifact(artifact: &AnalysisArtifact) -> Self {
        let file_count = artifact.file_records();
        ReportBuilder::new(ReportSource::Artifact)
            .file_counts(FileCounts {
                javascript: file_count,
                ..Default::default()
            })
            .bucket(
                LanguageBucket::Script.label(),
                file_count,
                artifact.normalize(),
                None,
            )
            .build()
    }

    pub fn source(&self) -> ReportSource {
        self.source
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn warning_count(&self) -> u64 {
        self.warning_count
    }

    pub fn per_bucket(&self) -> &[BucketReport] {
        &self.per_bucket
    }

    pub fn failed_buckets(&self) -> &[FailedBucket] {
        &self.failed_buckets
    }

    pub fn file_counts(&self) -> &FileCounts {
        &self.file_counts
    }

    pub fn configurations(&self) -> &BTreeMap<String, String> {
        &self.configurations
    }

    pub fn snapshot_sha256(&self) -> Option<&str> {
        self.snapshot_sha256.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

pub struct ReportBuilder {
    source: ReportSource,
    per_bucket: Vec<BucketReport>,
    failed_buckets: Vec<FailedBucket>,
    file_counts: FileCounts,
    configurations: BTreeMap<String, String>,
    snapshot_sha256: Option<String>,
}

impl ReportBuilder {
    pub fn new(source: ReportSource) -> Self {
        Self {
            source,
            per_bucket: Vec::new(),
            failed_buckets: Vec::new(),
            file_counts: FileCounts::default(),
            configurations: BTreeMap::new(),
            snapshot_sha256: None,
        }
    }

    pub fn file_counts(mut self, file_counts: FileCounts) -> Self {
        self.file_counts = file_counts;
        self
    }

    pub fn snapshot_sha256(mut self, digest: impl Into<String>) -> Self {
        self.snapshot_sha256 = Some(digest.into());
        self
    }

    pub fn bucket(
        mut self,
        label: &str,
        file_count: usize,
        findings: NormalizedFindings,
        configuration: Option<String>,
    ) -> Self {
        self.per_bucket.push(BucketReport {
            label: label.to_string(),
            file_count,
            error_count: findings.error_count,
            warning_count: findings.warning_count,
            bucket_score: bucket_score(&findings),
        });
        if let Some(configuration) = configuration {
            self.configurations.insert(label.to_string(), configuration);
        }
        self
    }

    pub fn failed_bucket(mut self, label: &str, file_count: usize, reason: String) -> Self {
        self.failed_buckets.push(FailedBucket {
            label: label.to_string(),
            file_count,
            reason,
        });
        self
    }

    /// Adds an orchestrator outcome as a scored or failed bucket
    pub fn outcome(self, outcome: &BucketOutcome) -> Self {
        let label = outcome.bucket.label();
        match &outcome.result {
            Ok(findings) => self.bucket(
                label,
                outcome.file_count,
                *findings,
                Some(outcome.configuration.clone()).filter(|c| !c.is_empty()),
            ),
            Err(reason) => self.failed_bucket(label, outcome.file_count, reason.clone()),
        }
    }

    pub fn build(self) -> QualityReport {
        let totals = self
            .per_bucket
            .iter()
            .map(|b| NormalizedFindings::new(b.error_count, b.warning_count))
            .fold(NormalizedFindings::default(), |acc, f| acc + f);

        let combined = combined_score(self.per_bucket.iter().map(|b| (b.bucket_score, b.file_count)));
        let note = if combined.is_none() && self.failed_buckets.is_empty() {
            Some(NO_LINTABLE_FILES_NOTE.to_string())
        } else {
            None
        };

        QualityReport {
            source: self.source,
            score: combined.unwrap_or(NEUTRAL_SCORE),
            error_count: totals.error_count,
            warning_count: totals.warning_count,
            per_bucket: self.per_bucket,
            failed_buckets: self.failed_buckets,
            file_counts: self.file_counts,
            configurations: self.configurations,
            snapshot_sha256: self.snapshot_sha256,
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weighted_report() {
        let report = ReportBuilder::new(ReportSource::Local)
            .bucket("javascript", 10, NormalizedFindings::new(2, 5), None)
            .bucket("css", 2, NormalizedFindings::new(10, 0), None)
            .build();

        assert_eq!(report.per_bucket()[0].bucket_score, 80);
        assert_eq!(report.per_bucket()[1].bucket_score, 50);
        assert_eq!(report.score(), 75);
        assert_eq!(report.error_count(), 12);
        assert_eq!(report.warning_count(), 5);
        assert!(report.note().is_none());
    }

    #[test]
    fn test_no_buckets_uses_neutral_score_with_note() {
        let report = ReportBuilder::new(ReportSource::Local)
            .file_counts(FileCounts {
                other: BTreeMap::from([("markdown".to_string(), 2)]),
                ..Default::default()
            })
            .build();

        assert_eq!(report.score(), NEUTRAL_SCORE);
        assert!(!report.note().unwrap().is_empty());
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_failed_buckets_are_excluded_from_score() {
        let outcomes = [
            BucketOutcome {
                bucket: LanguageBucket::Script,
                analyzer: "eslint".to_string(),
                file_count: 4,
                configuration: "baseline@1".to_string(),
                result: Ok(NormalizedFindings::new(1, 0)),
            },
            BucketOutcome {
                bucket: LanguageBucket::Markup,
                analyzer: "htmlhint".to_string(),
                file_count: 9,
                configuration: "project:.htmlhintrc".to_string(),
                result: Err("htmlhint timed out after 120s".to_string()),
            },
        ];
        let report = outcomes
            .iter()
            .fold(ReportBuilder::new(ReportSource::Local), |b, o| b.outcome(o))
            .build();

        assert_eq!(report.score(), 95);
        assert_eq!(report.failed_buckets().len(), 1);
        assert_eq!(report.failed_buckets()[0].label, "html");
        assert_eq!(report.configurations()["javascript"], "baseline@1");
        assert!(!report.configurations().contains_key("html"));
    }

    #[test]
    fn test_artifact_report() {
        let artifact = AnalysisArtifact::new(json!([
            {"filePath": "a.js", "errorCount": 2, "warningCount": 3},
            {"filePath": "b.js", "errorCount": 2, "warningCount": 0},
        ]));
        let report = QualityReport::from_artifact(&artifact);

        assert_eq!(report.source(), ReportSource::Artifact);
        assert_eq!(report.per_bucket().len(), 1);
        assert_eq!(report.per_bucket()[0].file_count, 2);
        assert_eq!(report.score(), 74);
    }

    #[test]
    fn test_totals_artifact_counts_once() {
        let artifact = AnalysisArtifact::new(json!({"totals": {"errors": 0, "warnings": 0}}));
        let report = QualityReport::from_artifact(&artifact);

        assert_eq!(report.per_bucket()[0].file_count, 0);
        assert_eq!(report.score(), 100);
        assert!(report.note().is_none());
    }

    #[test]
    fn test_serialized_field_names() {
        let report = ReportBuilder::new(ReportSource::Local)
            .snapshot_sha256("abc")
            .bucket("javascript", 1, NormalizedFindings::new(0, 1), Some("baseline@1".to_string()))
            .build();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["source"], "local");
        assert_eq!(value["perBucket"][0]["bucketScore"], 98);
        assert_eq!(value["perBucket"][0]["fileCount"], 1);
        assert_eq!(value["snapshotSha256"], "abc");
        assert_eq!(value["warningCount"], 1);
        assert!(value.get("note").is_none());
        assert!(value.get("failedBuckets").is_none());
    }
}
