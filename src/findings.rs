//! Analyzer reports and their normalization to error/warning totals
//!
//! Linters disagree on report layout. ESLint emits one record per file with
//! `errorCount`/`warningCount`, HTMLHint lists `messages` tagged with a
//! `type`, Stylelint lists `warnings` tagged with a `severity`, and
//! pre-aggregated reports carry top-level counters or a `totals` object.
//! [`AnalysisArtifact::normalize`] reduces every one of them to a
//! [`NormalizedFindings`]. Anything unrecognized counts as zero findings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::{Add, AddAssign};

/// Raw structured output from an analyzer run or a pre-computed artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisArtifact(Value);

/// Layout of an [`AnalysisArtifact`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportShape<'a> {
    /// One record per analyzed file
    PerFile(&'a [Value]),
    /// Top-level counters, either inline or under `totals`
    Totals { errors: u64, warnings: u64 },
    Unrecognized,
}

/// Error and warning totals extracted from a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFindings {
    pub error_count: u64,
    pub warning_count: u64,
}

impl NormalizedFindings {
    pub fn new(error_count: u64, warning_count: u64) -> Self {
        Self {
            error_count,
            warning_count,
        }
    }
}

impl Add for NormalizedFindings {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            error_count: self.error_count.saturating_add(rhs.error_count),
            warning_count: self.warning_count.saturating_add(rhs.warning_count),
        }
    }
}

impl AddAssign for NormalizedFindings {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl AnalysisArtifact {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn shape(&self) -> ReportShape<'_> {
        match &self.0 {
            Value::Array(records) => ReportShape::PerFile(records),
            Value::Object(map) => {
                if map.contains_key("errorCount") || map.contains_key("warningCount") {
                    ReportShape::Totals {
                        errors: count(map.get("errorCount")),
                        warnings: count(map.get("warningCount")),
                    }
                } else if let Some(Value::Object(totals)) = map.get("totals") {
                    ReportShape::Totals {
                        errors: count(totals.get("errors")),
                        warnings: count(totals.get("warnings")),
                    }
                } else {
                    ReportShape::Unrecognized
                }
            }
            _ => ReportShape::Unrecognized,
        }
    }

    pub fn normalize(&self) -> NormalizedFindings {
        match self.shape() {
            ReportShape::PerFile(records) => records
                .iter()
                .map(record_findings)
                .fold(NormalizedFindings::default(), Add::add),
            ReportShape::Totals { errors, warnings } => NormalizedFindings::new(errors, warnings),
            ReportShape::Unrecognized => NormalizedFindings::default(),
        }
    }

    /// Number of per-file records, zero for aggregate and unrecognized shapes
    pub fn file_records(&self) -> usize {
        match self.shape() {
            ReportShape::PerFile(records) => records.len(),
            _ => 0,
        }
    }
}

impl From<Value> for AnalysisArtifact {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn record_findings(record: &Value) -> NormalizedFindings {
    let Value::Object(map) = record else {
        return NormalizedFindings::default();
    };

    if map.contains_key("errorCount") || map.contains_key("warningCount") {
        return NormalizedFindings::new(count(map.get("errorCount")), count(map.get("warningCount")));
    }

    let mut findings = NormalizedFindings::default();
    for key in ["messages", "warnings"] {
        if let Some(Value::Array(entries)) = map.get(key) {
            for entry in entries {
                match classify_message(entry) {
                    Some(Severity::Error) => findings.error_count += 1,
                    Some(Severity::Warning) => findings.warning_count += 1,
                    None => {}
                }
            }
        }
    }
    findings
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

// ESLint uses numeric severity (2 = error, 1 = warning), HTMLHint a `type`
// string, Stylelint a `severity` string.
fn classify_message(entry: &Value) -> Option<Severity> {
    let label = entry
        .get("type")
        .or_else(|| entry.get("severity"))?;

    match label {
        Value::Number(n) => match n.as_u64() {
            Some(2) => Some(Severity::Error),
            Some(1) => Some(Severity::Warning),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            _ => None,
        },
        _ => None,
    }
}

fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}
