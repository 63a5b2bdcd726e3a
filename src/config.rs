//! Configuration management for repograde
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Configuration covers forge access, network timeouts, analyzer execution,
//! storage locations and logging.
//!
//! # Environment Variables
//!
//! ## Forge
//! - `REPOGRADE_FORGE_API_URL`: Forge API base URL - default: "https://api.github.com"
//! - `REPOGRADE_FORGE_TOKEN`: Access token - falls back to `GITHUB_TOKEN`, optional
//! - `REPOGRADE_CONNECT_TIMEOUT`: Connection timeout in seconds - default: "5"
//! - `REPOGRADE_VISIBILITY_TIMEOUT`: Visibility check timeout in seconds - default: "5"
//! - `REPOGRADE_ARTIFACT_TIMEOUT`: CI artifact request timeout in seconds - default: "10"
//! - `REPOGRADE_SNAPSHOT_TIMEOUT`: Snapshot download timeout in seconds - default: "20"
//! - `REPOGRADE_ARTIFACT_RUNS`: Number of recent CI runs searched - default: "10"
//! - `REPOGRADE_MAX_SNAPSHOT_BYTES`: Snapshot size ceiling - default: "104857600" (100MB)
//! - `REPOGRADE_MAX_ARTIFACT_BYTES`: CI artifact bundle and report ceiling - default: "20971520" (20MB)
//! - `REPOGRADE_VISIBILITY_FAIL_CLOSED`: Treat an unanswered visibility check as
//!   inaccessible (true|false) - default: "false"
//!
//! ## Analysis
//! - `REPOGRADE_ANALYZER_TIMEOUT`: Per analyzer run timeout in seconds - default: "120"
//! - `REPOGRADE_NPX`: Command used to launch Node based linters - default: "npx"
//! - `REPOGRADE_MAX_CONCURRENCY`: Concurrent assessments in batch mode - default: "4"
//! - `REPOGRADE_WORK_DIR`: Parent directory for extracted snapshots - default: system temp dir
//!
//! ## Storage and logging
//! - `REPOGRADE_STORE_DIR`: Assessment record directory - default: platform data dir + "repograde/assessments"
//! - `REPOGRADE_LOG_LEVEL`: Logging level - default: "info"
//! - `REPOGRADE_LOG_JSON`: Emit JSON log lines (true|false) - default: "false"
//!
//! # Example
//!
//! ```no_run
//! use repograde::RepogradeConfig;
//! use std::env;
//!
//! env::set_var("REPOGRADE_ANALYZER_TIMEOUT", "60");
//!
//! let config = RepogradeConfig::default();
//! config.validate().expect("Invalid configuration");
//! assert_eq!(config.analyzer_timeout_secs, 60);
//! ```

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default values for configuration
const DEFAULT_FORGE_API_URL: &str = "https://api.github.com";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 5;
const DEFAULT_ARTIFACT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SNAPSHOT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_ARTIFACT_RUNS: u32 = 10;
const DEFAULT_MAX_SNAPSHOT_BYTES: u64 = 104_857_600; // 100MB
const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 20_971_520; // 20MB
const DEFAULT_ANALYZER_TIMEOUT_SECS: u64 = 120;
const DEFAULT_NPX_COMMAND: &str = "npx";
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_LOG_LEVEL: &str = "info";

const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_ARTIFACT_RUNS: u32 = 100;
const MAX_CONCURRENCY: usize = 64;
const MIN_SNAPSHOT_BYTES: u64 = 1_048_576; // 1MB
const MIN_ARTIFACT_BYTES: u64 = 65_536; // 64KB

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Main configuration structure for repograde
///
/// Constructed with `Default::default()`, which reads `REPOGRADE_*`
/// environment variables and falls back to defaults for anything missing or
/// unparsable.
#[derive(Clone)]
pub struct RepogradeConfig {
    /// Forge API base URL
    pub forge_api_url: String,

    /// Forge access token, never logged
    pub forge_token: Option<String>,

    pub connect_timeout_secs: u64,
    pub visibility_timeout_secs: u64,
    pub artifact_timeout_secs: u64,
    pub snapshot_timeout_secs: u64,

    /// Number of most recent CI runs searched for a lint artifact
    pub artifact_runs: u32,

    /// Snapshot downloads larger than this are rejected
    pub max_snapshot_bytes: u64,

    /// Ceiling for a downloaded artifact bundle and for the report inside it
    pub max_artifact_bytes: u64,

    /// Treat a failed visibility check as inaccessible instead of proceeding
    pub visibility_fail_closed: bool,

    /// Per analyzer run timeout in seconds
    pub analyzer_timeout_secs: u64,

    /// Launcher for Node based linters
    pub npx_command: String,

    /// Concurrent assessments in batch mode
    pub max_concurrency: usize,

    /// Parent directory for extracted snapshots
    pub work_dir: PathBuf,

    /// Directory holding one JSON record per submission
    pub store_dir: PathBuf,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_json: bool,
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("repograde")
        .join("assessments")
}

impl Default for RepogradeConfig {
    /// Creates a new configuration by loading from environment variables with defaults
    fn default() -> Self {
        let forge_api_url = env_non_empty("REPOGRADE_FORGE_API_URL")
            .unwrap_or_else(|| DEFAULT_FORGE_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let forge_token =
            env_non_empty("REPOGRADE_FORGE_TOKEN").or_else(|| env_non_empty("GITHUB_TOKEN"));

        let connect_timeout_secs =
            env_parsed("REPOGRADE_CONNECT_TIMEOUT").unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        let visibility_timeout_secs =
            env_parsed("REPOGRADE_VISIBILITY_TIMEOUT").unwrap_or(DEFAULT_VISIBILITY_TIMEOUT_SECS);
        let artifact_timeout_secs =
            env_parsed("REPOGRADE_ARTIFACT_TIMEOUT").unwrap_or(DEFAULT_ARTIFACT_TIMEOUT_SECS);
        let snapshot_timeout_secs =
            env_parsed("REPOGRADE_SNAPSHOT_TIMEOUT").unwrap_or(DEFAULT_SNAPSHOT_TIMEOUT_SECS);

        let artifact_runs = env_parsed("REPOGRADE_ARTIFACT_RUNS").unwrap_or(DEFAULT_ARTIFACT_RUNS);
        let max_snapshot_bytes =
            env_parsed("REPOGRADE_MAX_SNAPSHOT_BYTES").unwrap_or(DEFAULT_MAX_SNAPSHOT_BYTES);
        let max_artifact_bytes =
            env_parsed("REPOGRADE_MAX_ARTIFACT_BYTES").unwrap_or(DEFAULT_MAX_ARTIFACT_BYTES);
        let visibility_fail_closed =
            env_parsed("REPOGRADE_VISIBILITY_FAIL_CLOSED").unwrap_or(false);

        let analyzer_timeout_secs =
            env_parsed("REPOGRADE_ANALYZER_TIMEOUT").unwrap_or(DEFAULT_ANALYZER_TIMEOUT_SECS);
        let npx_command =
            env_non_empty("REPOGRADE_NPX").unwrap_or_else(|| DEFAULT_NPX_COMMAND.to_string());
        let max_concurrency =
            env_parsed("REPOGRADE_MAX_CONCURRENCY").unwrap_or(DEFAULT_MAX_CONCURRENCY);

        let work_dir = env_non_empty("REPOGRADE_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        let store_dir = env_non_empty("REPOGRADE_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_store_dir);

        let log_level = env::var("REPOGRADE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();
        let log_json = env_parsed("REPOGRADE_LOG_JSON").unwrap_or(false);

        Self {
            forge_api_url,
            forge_token,
            connect_timeout_secs,
            visibility_timeout_secs,
            artifact_timeout_secs,
            snapshot_timeout_secs,
            artifact_runs,
            max_snapshot_bytes,
            max_artifact_bytes,
            visibility_fail_closed,
            analyzer_timeout_secs,
            npx_command,
            max_concurrency,
            work_dir,
            store_dir,
            log_level,
            log_json,
        }
    }
}

impl RepogradeConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.forge_api_url).map_err(|e| ConfigError::ParseError {
            field: "REPOGRADE_FORGE_API_URL".to_string(),
            error: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationFailed(format!(
                "Forge API URL must use http or https, got {}",
                url.scheme()
            )));
        }

        for (name, secs) in [
            ("Connect timeout", self.connect_timeout_secs),
            ("Visibility timeout", self.visibility_timeout_secs),
            ("Artifact timeout", self.artifact_timeout_secs),
            ("Snapshot timeout", self.snapshot_timeout_secs),
            ("Analyzer timeout", self.analyzer_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be at least 1 second",
                    name
                )));
            }
            if secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} cannot exceed 10 minutes",
                    name
                )));
            }
        }

        if self.artifact_runs == 0 || self.artifact_runs > MAX_ARTIFACT_RUNS {
            return Err(ConfigError::ValidationFailed(format!(
                "Artifact runs must be between 1 and {}",
                MAX_ARTIFACT_RUNS
            )));
        }

        if self.max_snapshot_bytes < MIN_SNAPSHOT_BYTES {
            return Err(ConfigError::ValidationFailed(
                "Snapshot ceiling must be at least 1MB".to_string(),
            ));
        }

        if self.max_artifact_bytes < MIN_ARTIFACT_BYTES {
            return Err(ConfigError::ValidationFailed(
                "Artifact ceiling must be at least 64KB".to_string(),
            ));
        }

        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ValidationFailed(format!(
                "Max concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            )));
        }

        if self.npx_command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Linter launcher command cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn artifact_timeout(&self) -> Duration {
        Duration::from_secs(self.artifact_timeout_secs)
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_secs)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> std::collections::BTreeMap<String, String> {
        let mut map = std::collections::BTreeMap::new();

        map.insert("forge_api_url".to_string(), self.forge_api_url.clone());
        map.insert(
            "forge_token".to_string(),
            if self.forge_token.is_some() { "set" } else { "unset" }.to_string(),
        );
        map.insert(
            "connect_timeout_secs".to_string(),
            self.connect_timeout_secs.to_string(),
        );
        map.insert(
            "visibility_timeout_secs".to_string(),
            self.visibility_timeout_secs.to_string(),
        );
        map.insert(
            "artifact_timeout_secs".to_string(),
            self.artifact_timeout_secs.to_string(),
        );
        map.insert(
            "snapshot_timeout_secs".to_string(),
            self.snapshot_timeout_secs.to_string(),
        );
        map.insert("artifact_runs".to_string(), self.artifact_runs.to_string());
        map.insert(
            "max_snapshot_bytes".to_string(),
            self.max_snapshot_bytes.to_string(),
        );
        map.insert(
            "max_artifact_bytes".to_string(),
            self.max_artifact_bytes.to_string(),
        );
        map.insert(
            "visibility_fail_closed".to_string(),
            self.visibility_fail_closed.to_string(),
        );
        map.insert(
            "analyzer_timeout_secs".to_string(),
            self.analyzer_timeout_secs.to_string(),
        );
        map.insert("npx_command".to_string(), self.npx_command.clone());
        map.insert(
            "max_concurrency".to_string(),
            self.max_concurrency.to_string(),
        );
        map.insert("work_dir".to_string(), self.work_dir.display().to_string());
        map.insert("store_dir".to_string(), self.store_dir.display().to_string());
        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert("log_json".to_string(), self.log_json.to_string());

        map
    }
}

// Hand-written so the token never reaches logs through `{:?}`.
impl fmt::Debug for RepogradeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepogradeConfig")
            .field("forge_api_url", &self.forge_api_url)
            .field("forge_token", &self.forge_token.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("visibility_timeout_secs", &self.visibility_timeout_secs)
            .field("artifact_timeout_secs", &self.artifact_timeout_secs)
            .field("snapshot_timeout_secs", &self.snapshot_timeout_secs)
            .field("artifact_runs", &self.artifact_runs)
            .field("max_snapshot_bytes", &self.max_snapshot_bytes)
            .field("max_artifact_bytes", &self.max_artifact_bytes)
            .field("visibility_fail_closed", &self.visibility_fail_closed)
            .field("analyzer_timeout_secs", &self.analyzer_timeout_secs)
            .field("npx_command", &self.npx_command)
            .field("max_concurrency", &self.max_concurrency)
            .field("work_dir", &self.work_dir)
            .field("store_dir", &self.store_dir)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl fmt::Display for RepogradeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repograde Configuration:")?;
        writeln!(f, "  Forge API: {}", self.forge_api_url)?;
        writeln!(
            f,
            "  Forge Token: {}",
            if self.forge_token.is_some() { "set" } else { "unset" }
        )?;
        writeln!(
            f,
            "  Timeouts: connect {}s, visibility {}s, artifact {}s, snapshot {}s",
            self.connect_timeout_secs,
            self.visibility_timeout_secs,
            self.artifact_timeout_secs,
            self.snapshot_timeout_secs
        )?;
        writeln!(f, "  Artifact Runs: {}", self.artifact_runs)?;
        writeln!(f, "  Max Snapshot Size: {} bytes", self.max_snapshot_bytes)?;
        writeln!(f, "  Max Artifact Size: {} bytes", self.max_artifact_bytes)?;
        writeln!(f, "  Analyzer Timeout: {}s", self.analyzer_timeout_secs)?;
        writeln!(f, "  Max Concurrency: {}", self.max_concurrency)?;
        writeln!(f, "  Work Dir: {}", self.work_dir.display())?;
        writeln!(f, "  Store Dir: {}", self.store_dir.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
