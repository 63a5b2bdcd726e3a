//! repograde - automated code-quality assessment for submitted repositories
//!
//! Given a submission id and a repository URL, repograde checks that the
//! repository is public, prefers a lint report already produced by the
//! repository's CI, and otherwise downloads a snapshot and runs ESLint,
//! HTMLHint and Stylelint over it. Findings are folded into a 0-100 score and
//! the outcome is persisted per submission.
//!
//! # Example Usage
//!
//! ```no_run
//! use repograde::forge::GitHubClient;
//! use repograde::store::JsonFileStore;
//! use repograde::{AssessmentPipeline, RepogradeConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RepogradeConfig::default();
//! let forge = Arc::new(GitHubClient::from_config(&config)?);
//! let store = Arc::new(JsonFileStore::new(config.store_dir.clone()));
//! let pipeline = AssessmentPipeline::from_config(&config, forge, store);
//!
//! let record = pipeline
//!     .trigger_assessment("team-42", "https://github.com/acme/landing-page")
//!     .await?;
//! println!("{} {:?}", record.status, record.score);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`forge`]: repository references and the GitHub client
//! - [`workspace`]: snapshot extraction into temporary directories
//! - [`classify`]: language buckets for the files of a tree
//! - [`analyzers`]: linter adapters and the per-bucket orchestrator
//! - [`scoring`]: scores and the persisted quality report
//! - [`store`]: assessment records
//! - [`pipeline`]: the end-to-end assessment flow

pub mod analyzers;
pub mod classify;
pub mod cli;
pub mod config;
pub mod findings;
pub mod forge;
pub mod pipeline;
pub mod progress;
pub mod scoring;
pub mod store;
pub mod util;
pub mod workspace;

pub use config::{ConfigError, RepogradeConfig};
pub use forge::{ForgeClient, GitHubClient, RepositoryReference};
pub use pipeline::{AssessmentError, AssessmentPipeline, AssessmentScheduler};
pub use scoring::QualityReport;
pub use store::{AssessmentRecord, AssessmentStatus, AssessmentStore};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
