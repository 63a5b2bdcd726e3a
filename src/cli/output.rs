//! Output formatting for multiple formats
//!
//! Records and reports render as JSON, YAML or human-readable text. The JSON
//! form of a record is exactly what the store persists.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::scoring::QualityReport;
use crate::store::{AssessmentRecord, AssessmentStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// One line of a batch summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub submission_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<AssessmentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_record(&self, submission_id: &str, record: &AssessmentRecord) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(record, "assessment record"),
            OutputFormat::Yaml => to_yaml(record, "assessment record"),
            OutputFormat::Human => Ok(self.format_record_human(submission_id, record)),
        }
    }

    pub fn format_report(&self, report: &QualityReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "quality report"),
            OutputFormat::Yaml => to_yaml(report, "quality report"),
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    pub fn format_batch(&self, entries: &[BatchEntry]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&entries, "batch summary"),
            OutputFormat::Yaml => to_yaml(&entries, "batch summary"),
            OutputFormat::Human => Ok(self.format_batch_human(entries)),
        }
    }

    // Human-readable formatting methods

    fn format_record_human(&self, submission_id: &str, record: &AssessmentRecord) -> String {
        let mut output = String::new();

        let symbol = match record.status {
            AssessmentStatus::Success => "\u{2713}",
            AssessmentStatus::Failed => "\u{2717}",
            AssessmentStatus::Pending => "\u{2026}",
        };
        output.push_str(&format!("{} Assessment {}\n", symbol, submission_id));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Status:     {}\n", record.status));
        match record.score {
            Some(score) => output.push_str(&format!("Score:      {} / 100\n", score)),
            None => output.push_str("Score:      -\n"),
        }
        output.push_str(&format!("Errors:     {}\n", record.error_count));
        output.push_str(&format!("Warnings:   {}\n", record.warning_count));
        output.push_str(&format!(
            "Evaluated:  {}\n",
            record.last_evaluated_at.to_rfc3339()
        ));

        if let Some(ref reason) = record.failure_reason {
            output.push_str(&format!("\nReason: {}\n", reason));
        }

        if record.status == AssessmentStatus::Success {
            if let Some(report) = record
                .report
                .as_ref()
                .and_then(|r| serde_json::from_value::<QualityReport>(r.clone()).ok())
            {
                output.push('\n');
                output.push_str(&self.report_details(&report));
            }
        }

        output
    }

    fn format_report_human(&self, report: &QualityReport) -> String {
        let mut output = String::new();
        output.push_str("Quality Report\n");
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("Score:      {} / 100\n", report.score()));
        output.push_str(&format!("Errors:     {}\n", report.error_count()));
        output.push_str(&format!("Warnings:   {}\n\n", report.warning_count()));
        output.push_str(&self.report_details(report));
        output
    }

    fn report_details(&self, report: &QualityReport) -> String {
        let mut output = String::new();

        let source = match report.source() {
            crate::scoring::ReportSource::Artifact => "CI artifact",
            crate::scoring::ReportSource::Local => "local analysis",
        };
        output.push_str(&format!("Source: {}\n", source));

        if !report.per_bucket().is_empty() {
            output.push_str("\nBuckets:\n");
            for (i, bucket) in report.per_bucket().iter().enumerate() {
                let connector = if i + 1 == report.per_bucket().len() {
                    "\u{2514}\u{2500}"
                } else {
                    "\u{251C}\u{2500}"
                };
                let config = report
                    .configurations()
                    .get(&bucket.label)
                    .map(|c| format!(" [{}]", c))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "{} {:<11} {:>3}  ({} files, {} errors, {} warnings){}\n",
                    connector,
                    bucket.label,
                    bucket.bucket_score,
                    bucket.file_count,
                    bucket.error_count,
                    bucket.warning_count,
                    config
                ));
            }
        }

        if !report.failed_buckets().is_empty() {
            output.push_str("\n\u{26A0} Not scored:\n");
            for failed in report.failed_buckets() {
                output.push_str(&format!(
                    "  - {} ({} files): {}\n",
                    failed.label, failed.file_count, failed.reason
                ));
            }
        }

        let counts = report.file_counts();
        if !counts.other.is_empty() {
            let other: Vec<_> = counts
                .other
                .iter()
                .map(|(lang, n)| format!("{} {}", lang, n))
                .collect();
            output.push_str(&format!("\nOther files: {}\n", other.join(", ")));
        }

        if let Some(note) = report.note() {
            output.push_str(&format!("\nNote: {}\n", note));
        }

        output
    }

    fn format_batch_human(&self, entries: &[BatchEntry]) -> String {
        let mut output = String::new();
        output.push_str("Batch Results\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        for entry in entries {
            match (&entry.record, &entry.error) {
                (Some(record), _) => {
                    let score = record
                        .score
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    output.push_str(&format!(
                        "{:<24} {:<8} {:>3}",
                        entry.submission_id, record.status.to_string(), score
                    ));
                    if let Some(ref reason) = record.failure_reason {
                        output.push_str(&format!("  {}", reason));
                    }
                    output.push('\n');
                }
                (None, Some(error)) => {
                    output.push_str(&format!(
                        "{:<24} {:<8} {:>3}  {}\n",
                        entry.submission_id, "error", "-", error
                    ));
                }
                (None, None) => {}
            }
        }

        output
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::NormalizedFindings;
    use crate::scoring::{ReportBuilder, ReportSource};
    use crate::store::RecordUpdate;

    fn success_record() -> AssessmentRecord {
        let report = ReportBuilder::new(ReportSource::Local)
            .bucket("javascript", 3, NormalizedFindings::new(2, 3), Some("baseline@1".to_string()))
            .failed_bucket("css", 1, "stylelint timed out after 120s".to_string())
            .build();
        AssessmentRecord::apply(None, &RecordUpdate::success(report)).unwrap()
    }

    #[test]
    fn test_json_record_matches_persisted_shape() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_record("team-1", &success_record()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["status"], "success");
        assert_eq!(parsed["score"], 84);
        assert_eq!(parsed["errorCount"], 2);
        assert!(parsed["lastEvaluatedAt"].is_string());
    }

    #[test]
    fn test_yaml_record() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_record("team-1", &success_record()).unwrap();
        let parsed: AssessmentRecord = serde_yaml::from_str(&output).unwrap();
        assert_eq!(parsed.score, Some(84));
    }

    #[test]
    fn test_human_record() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_record("team-1", &success_record()).unwrap();

        assert!(output.contains("Assessment team-1"));
        assert!(output.contains("84 / 100"));
        assert!(output.contains("javascript"));
        assert!(output.contains("baseline@1"));
        assert!(output.contains("Not scored"));
        assert!(output.contains("stylelint timed out"));
    }

    #[test]
    fn test_human_failed_record() {
        let record =
            AssessmentRecord::apply(None, &RecordUpdate::failed("Repository is private or not accessible"))
                .unwrap();
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_record("team-2", &record).unwrap();

        assert!(output.contains("failed"));
        assert!(output.contains("Score:      -"));
        assert!(output.contains("Reason: Repository is private"));
    }

    #[test]
    fn test_human_neutral_report_shows_note() {
        let report = ReportBuilder::new(ReportSource::Local).build();
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_report(&report).unwrap();

        assert!(output.contains("70 / 100"));
        assert!(output.contains("Note:"));
    }

    #[test]
    fn test_batch_summary() {
        let entries = vec![
            BatchEntry {
                submission_id: "a".to_string(),
                record: Some(success_record()),
                error: None,
            },
            BatchEntry {
                submission_id: "b".to_string(),
                record: None,
                error: Some("Invalid repository reference".to_string()),
            },
        ];

        let human = OutputFormatter::new(OutputFormat::Human)
            .format_batch(&entries)
            .unwrap();
        assert!(human.contains("success"));
        assert!(human.contains("Invalid repository reference"));

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_batch(&entries)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[1]["submissionId"], "b");
        assert!(parsed[1].get("record").is_none());
    }
}
