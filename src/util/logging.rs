//! Structured logging setup for repograde
//!
//! Logs go to stderr through a `tracing` subscriber, so stdout stays free for
//! command output. Pretty console output is the default; JSON output is meant
//! for batch runs whose logs are shipped somewhere else.
//!
//! # Example
//!
//! ```no_run
//! use repograde::util::logging;
//!
//! logging::init_from_env();
//!
//! use tracing::{debug, info, warn};
//!
//! info!("Assessment started");
//! debug!(submission = "team-1", "Downloading snapshot");
//!
//! let result: Result<(), &str> = Err("rate limited");
//! if let Err(e) = result {
//!     warn!(error = ?e, "Visibility check failed");
//! }
//! ```

use crate::config::RepogradeConfig;
use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Dependencies capped at WARN unless `RUST_LOG` says otherwise
const QUIET_DEPENDENCIES: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "rustls"];

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level for repograde itself
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., repograde::pipeline) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    /// INFO level, pretty console output, targets on, no location or thread ids
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// # Example
    ///
    /// ```
    /// use repograde::util::LoggingConfig;
    /// use tracing::Level;
    ///
    /// let config = LoggingConfig::with_level(Level::DEBUG);
    /// assert!(!config.use_json);
    /// ```
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with location and thread metadata
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    /// Level and format taken from the loaded configuration
    pub fn from_config(config: &RepogradeConfig) -> Self {
        let base = if config.log_json {
            Self::production()
        } else {
            Self::default()
        };
        Self {
            level: parse_level(&config.log_level),
            ..base
        }
    }

    /// Applies the CLI verbosity flags. `quiet` wins over `verbose`.
    pub fn with_verbosity(mut self, verbose: bool, quiet: bool) -> Self {
        if quiet {
            self.level = Level::ERROR;
        } else if verbose && self.level < Level::DEBUG {
            self.level = Level::DEBUG;
        }
        self
    }
}

/// Parses a log level (case-insensitive), falling back to INFO
///
/// ```
/// use repograde::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn directive(target: &str, level: LevelFilter) -> Option<Directive> {
    format!("{}={}", target, level).parse().ok()
}

fn build_filter(level: Level) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    if let Some(own) = directive(env!("CARGO_CRATE_NAME"), LevelFilter::from_level(level)) {
        filter = filter.add_directive(own);
    }

    if env::var("RUST_LOG").is_err() {
        for quiet in QUIET_DEPENDENCIES {
            if let Some(d) = directive(quiet, LevelFilter::WARN) {
                filter = filter.add_directive(d);
            }
        }
    }
    filter
}

/// Initializes the logging system. Subsequent calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Initializes logging from `REPOGRADE_LOG_LEVEL` and `REPOGRADE_LOG_JSON`
/// (plus the standard `RUST_LOG` filter)
pub fn init_from_env() {
    let level_str = env::var("REPOGRADE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let use_json = env::var("REPOGRADE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    let base = if use_json {
        LoggingConfig::production()
    } else {
        LoggingConfig::default()
    };
    init_logging(LoggingConfig {
        level: parse_level(&level_str),
        ..base
    });
}
