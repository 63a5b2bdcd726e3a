//! File classification into analyzable language buckets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into: dependencies, build output, VCS metadata
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "bower_components",
    "jspm_packages",
    "vendor",
    "dist",
    "build",
    "out",
    "coverage",
    "target",
    "venv",
    "__pycache__",
];

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Source root does not exist or is not a directory: {0}")]
    RootNotFound(PathBuf),
}

/// Language family handled by one analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageBucket {
    Script,
    Markup,
    Stylesheet,
}

impl LanguageBucket {
    pub const ALL: [LanguageBucket; 3] = [
        LanguageBucket::Script,
        LanguageBucket::Markup,
        LanguageBucket::Stylesheet,
    ];

    /// Label used in reports
    pub fn label(self) -> &'static str {
        match self {
            LanguageBucket::Script => "javascript",
            LanguageBucket::Markup => "html",
            LanguageBucket::Stylesheet => "css",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Some(LanguageBucket::Script),
            "html" | "htm" => Some(LanguageBucket::Markup),
            "css" => Some(LanguageBucket::Stylesheet),
            _ => None,
        }
    }
}

impl fmt::Display for LanguageBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recognised languages that no analyzer covers
fn other_language(ext: &str) -> Option<&'static str> {
    let language = match ext.to_ascii_lowercase().as_str() {
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "scss" | "sass" => "sass",
        "less" => "less",
        "vue" => "vue",
        "svelte" => "svelte",
        "py" => "python",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "dart" => "dart",
        "sh" | "bash" => "shell",
        "md" | "markdown" => "markdown",
        _ => return None,
    };
    Some(language)
}

/// Files of a source tree grouped by bucket, as paths relative to the root
#[derive(Debug, Clone, Default)]
pub struct ClassifiedFiles {
    root: PathBuf,
    buckets: BTreeMap<LanguageBucket, Vec<PathBuf>>,
    other: BTreeMap<String, usize>,
}

impl ClassifiedFiles {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self, bucket: LanguageBucket) -> &[PathBuf] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file_count(&self, bucket: LanguageBucket) -> usize {
        self.files(bucket).len()
    }

    /// Buckets with at least one file, in report order
    pub fn non_empty_buckets(&self) -> Vec<LanguageBucket> {
        LanguageBucket::ALL
            .into_iter()
            .filter(|b| self.file_count(*b) > 0)
            .collect()
    }

    pub fn has_lintable_files(&self) -> bool {
        !self.non_empty_buckets().is_empty()
    }

    /// File counts for recognised but unanalyzed languages
    pub fn other(&self) -> &BTreeMap<String, usize> {
        &self.other
    }
}

pub struct FileClassifier {
    excluded_dirs: Vec<String>,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self {
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileClassifier {
    pub fn with_excluded_dirs(excluded_dirs: Vec<String>) -> Self {
        Self { excluded_dirs }
    }

    /// Walks `root` and groups every regular file by extension.
    ///
    /// Excluded and hidden directories are pruned. Symlinks are not followed.
    /// Unreadable entries are skipped with a warning.
    pub fn classify(&self, root: &Path) -> Result<ClassifiedFiles, ClassifyError> {
        if !root.is_dir() {
            return Err(ClassifyError::RootNotFound(root.to_path_buf()));
        }

        let mut classified = ClassifiedFiles {
            root: root.to_path_buf(),
            ..Default::default()
        };

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();

            if let Some(bucket) = LanguageBucket::from_extension(ext) {
                classified.buckets.entry(bucket).or_default().push(relative);
            } else if let Some(language) = other_language(ext) {
                *classified.other.entry(language.to_string()).or_insert(0) += 1;
            }
        }

        debug!(
            javascript = classified.file_count(LanguageBucket::Script),
            html = classified.file_count(LanguageBucket::Markup),
            css = classified.file_count(LanguageBucket::Stylesheet),
            other = classified.other.values().sum::<usize>(),
            "Classified source tree"
        );

        Ok(classified)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let Some(name) = entry.file_name().to_str() else {
            return false;
        };
        (name.starts_with('.') && name.len() > 1) || self.excluded_dirs.iter().any(|d| d == name)
    }
}
