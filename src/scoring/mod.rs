//! Quality scoring
//!
//! A bucket starts at 100 and loses 5 points per error and 2 per warning,
//! floored at 0. The combined score is the mean of bucket scores weighted by
//! file count (at least 1 per bucket), rounded half away from zero. With
//! nothing analyzable the neutral score applies.

mod report;

pub use report::{
    BucketReport, FailedBucket, FileCounts, QualityReport, ReportBuilder, ReportSource,
};

use crate::findings::NormalizedFindings;

pub const MAX_SCORE: u8 = 100;
pub const ERROR_PENALTY: u64 = 5;
pub const WARNING_PENALTY: u64 = 2;
pub const NEUTRAL_SCORE: u8 = 70;

pub fn bucket_score(findings: &NormalizedFindings) -> u8 {
    let penalty = findings
        .error_count
        .saturating_mul(ERROR_PENALTY)
        .saturating_add(findings.warning_count.saturating_mul(WARNING_PENALTY));
    u64::from(MAX_SCORE).saturating_sub(penalty) as u8
}

/// Weighted mean over `(score, file_count)` pairs, `None` when empty
pub fn combined_score<I>(buckets: I) -> Option<u8>
where
    I: IntoIterator<Item = (u8, usize)>,
{
    let mut weighted = 0.0f64;
    let mut total_weight = 0.0f64;
    for (score, file_count) in buckets {
        let weight = file_count.max(1) as f64;
        weighted += f64::from(score) * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        None
    } else {
        Some((weighted / total_weight).round().clamp(0.0, f64::from(MAX_SCORE)) as u8)
    }
}
