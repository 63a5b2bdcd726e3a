//! Static analyzers, one per language bucket
//!
//! Each [`Analyzer`] resolves which rules apply to a tree (project config or
//! a versioned baseline) and runs an external linter that emits a JSON
//! report. The [`AnalyzerRegistry`] maps buckets to analyzers; the
//! [`orchestrator`] runs them with per-bucket fault isolation.

pub mod config;
pub mod eslint;
pub mod htmlhint;
pub mod orchestrator;
pub mod process;
pub mod stylelint;

pub use config::{ConfigResolution, ProjectConfig, BASELINE_VERSION};
pub use eslint::EslintAnalyzer;
pub use htmlhint::HtmlHintAnalyzer;
pub use orchestrator::{AnalyzerOrchestrator, BucketOutcome};
pub use stylelint::StylelintAnalyzer;

use crate::classify::LanguageBucket;
use crate::config::RepogradeConfig;
use crate::findings::AnalysisArtifact;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("{tool} was cancelled")]
    Cancelled { tool: String },

    #[error("{tool} panicked: {message}")]
    Panicked { tool: String, message: String },

    #[error("{tool} exited with status {status:?} without a JSON report: {stderr}")]
    UnreadableOutput {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("I/O error while running {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: io::Error,
    },
}

impl AnalyzerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalyzerError::Cancelled { .. })
    }
}

/// Inputs for one analyzer run
pub struct AnalyzerRequest<'a> {
    pub root: &'a Path,
    /// Paths relative to `root`
    pub files: &'a [PathBuf],
    pub config: &'a ConfigResolution,
    pub cancel: &'a CancellationToken,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    fn bucket(&self) -> LanguageBucket;

    /// Decides between the project's own configuration and the baseline
    fn resolve_config(&self, root: &Path) -> ConfigResolution;

    async fn run(&self, request: AnalyzerRequest<'_>) -> Result<AnalysisArtifact, AnalyzerError>;
}

/// Launch settings shared by the built-in analyzers
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub launcher: String,
    pub timeout: Duration,
}

impl AnalyzerSettings {
    pub fn from_config(config: &RepogradeConfig) -> Self {
        Self {
            launcher: config.npx_command.clone(),
            timeout: config.analyzer_timeout(),
        }
    }
}

/// Analyzers keyed by the bucket they cover
#[derive(Default)]
pub struct AnalyzerRegistry {
    analyzers: BTreeMap<LanguageBucket, Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// ESLint, HTMLHint and Stylelint
    pub fn with_defaults(settings: &AnalyzerSettings) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EslintAnalyzer::new(settings)));
        registry.register(Arc::new(HtmlHintAnalyzer::new(settings)));
        registry.register(Arc::new(StylelintAnalyzer::new(settings)));
        registry
    }

    /// Registers an analyzer, replacing any previous one for its bucket
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.insert(analyzer.bucket(), analyzer);
    }

    pub fn get(&self, bucket: LanguageBucket) -> Option<Arc<dyn Analyzer>> {
        self.analyzers.get(&bucket).cloned()
    }

    pub fn buckets(&self) -> impl Iterator<Item = LanguageBucket> + '_ {
        self.analyzers.keys().copied()
    }
}
