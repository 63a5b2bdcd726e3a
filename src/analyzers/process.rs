//! External linter process execution
//!
//! Linters exit non-zero whenever they report findings, so exit status is
//! not a success signal. A run succeeds when it prints a JSON report. Each
//! process runs under a timeout and a cancellation token, and is killed when
//! either fires.

use super::AnalyzerError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Upper bound on file arguments per process, keeping command lines under
/// platform limits on large repositories
pub const MAX_FILES_PER_INVOCATION: usize = 200;

const STDERR_EXCERPT_CHARS: usize = 500;

/// A program plus the leading arguments that select the linter,
/// e.g. `npx --yes eslint@8`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Runs a Node package through `launcher` (usually `npx`)
    pub fn node_package(launcher: &str, package: &str) -> Self {
        Self::new(launcher, &["--yes", package])
    }
}

/// Captured output of one process
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Parses the report from stdout, falling back to stderr
    pub fn json(&self) -> Option<Value> {
        [&self.stdout, &self.stderr]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .find_map(|s| serde_json::from_str(s).ok())
    }

    fn stderr_excerpt(&self) -> String {
        self.stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect()
    }
}

/// One linter invocation over a set of files
pub struct ToolInvocation<'a> {
    pub tool: &'a str,
    pub command: &'a ToolCommand,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub cwd: &'a Path,
    pub timeout: Duration,
    pub cancel: &'a CancellationToken,
}

impl ToolInvocation<'_> {
    /// Runs the tool once with `files` appended to the arguments
    pub async fn run(&self, files: &[PathBuf]) -> Result<ToolOutput, AnalyzerError> {
        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .args(&self.args)
            .args(files)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            tool = self.tool,
            program = %self.command.program,
            files = files.len(),
            "Running analyzer"
        );

        let child = command.spawn().map_err(|e| AnalyzerError::Spawn {
            tool: self.tool.to_string(),
            source: e,
        })?;

        // Dropping the wait future drops the child, and kill_on_drop reaps it
        let output = tokio::select! {
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => match result {
                Ok(output) => output.map_err(|e| AnalyzerError::Io {
                    tool: self.tool.to_string(),
                    source: e,
                })?,
                Err(_) => {
                    return Err(AnalyzerError::Timeout {
                        tool: self.tool.to_string(),
                        seconds: self.timeout.as_secs(),
                    })
                }
            },
            _ = self.cancel.cancelled() => {
                return Err(AnalyzerError::Cancelled {
                    tool: self.tool.to_string(),
                })
            }
        };

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Runs the tool and parses its report
    pub async fn run_report(&self, files: &[PathBuf]) -> Result<Value, AnalyzerError> {
        let output = self.run(files).await?;
        output.json().ok_or_else(|| AnalyzerError::UnreadableOutput {
            tool: self.tool.to_string(),
            status: output.status,
            stderr: output.stderr_excerpt(),
        })
    }

    /// Runs the tool over `files` in chunks and merges the reports.
    ///
    /// Array reports are concatenated and any other report becomes one more
    /// element. A file list that fits one invocation returns the report as is.
    pub async fn run_chunked(&self, files: &[PathBuf]) -> Result<Value, AnalyzerError> {
        if files.len() <= MAX_FILES_PER_INVOCATION {
            return self.run_report(files).await;
        }

        let mut merged = Vec::new();
        for chunk in files.chunks(MAX_FILES_PER_INVOCATION) {
            match self.run_report(chunk).await? {
                Value::Array(records) => merged.extend(records),
                other => merged.push(other),
            }
        }

        Ok(Value::Array(merged))
    }
}
