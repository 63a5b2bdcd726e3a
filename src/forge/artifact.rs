//! Lint report discovery inside CI artifact bundles

use super::ForgeError;
use regex::Regex;
use serde_json::Value;
use std::io::{Cursor, Read};
use std::sync::OnceLock;
use tracing::debug;

fn artifact_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)eslint").expect("valid regex"))
}

fn report_entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)eslint.*\.json$").expect("valid regex"))
}

/// Whether a CI artifact's name marks it as a lint report bundle
pub fn is_lint_artifact(name: &str) -> bool {
    artifact_name_pattern().is_match(name)
}

/// Whether an entry inside a bundle is the JSON lint report
pub fn is_report_entry(path: &str) -> bool {
    report_entry_pattern().is_match(path)
}

/// Scans a zip bundle for the first report entry and parses it.
///
/// Returns `Ok(None)` when no entry matches. A matching entry that is not
/// valid JSON, or that inflates past `max_entry_bytes`, is an error so the
/// caller can move on to an older run.
pub fn extract_report(
    bundle: &[u8],
    max_entry_bytes: u64,
) -> Result<Option<(String, Value)>, ForgeError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bundle))
        .map_err(|e| ForgeError::InvalidArchive(e.to_string()))?;

    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| ForgeError::InvalidArchive(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        if !is_report_entry(&name) {
            debug!(entry = %name, "Skipping non-report bundle entry");
            continue;
        }
        if entry.size() > max_entry_bytes {
            return Err(ForgeError::TooLarge {
                limit: max_entry_bytes,
            });
        }

        // The declared size can lie, so the read itself is bounded too
        let mut content = Vec::new();
        entry
            .take(max_entry_bytes + 1)
            .read_to_end(&mut content)
            .map_err(|e| ForgeError::InvalidArchive(format!("{}: {}", name, e)))?;
        if content.len() as u64 > max_entry_bytes {
            return Err(ForgeError::TooLarge {
                limit: max_entry_bytes,
            });
        }

        let value = serde_json::from_slice(&content)
            .map_err(|e| ForgeError::InvalidArchive(format!("{} is not valid JSON: {}", name, e)))?;
        return Ok(Some((name, value)));
    }

    Ok(None)
}
