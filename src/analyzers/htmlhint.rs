use super::config::{ConfigProbe, HTMLHINT_BASELINE};
use super::process::{ToolCommand, ToolInvocation};
use super::{Analyzer, AnalyzerError, AnalyzerRequest, AnalyzerSettings, ConfigResolution};
use crate::classify::LanguageBucket;
use crate::findings::AnalysisArtifact;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

const PACKAGE: &str = "htmlhint@1";

const PROBE: ConfigProbe = ConfigProbe {
    file_names: &[".htmlhintrc"],
    manifest_key: None,
};

/// HTML analysis with HTMLHint
pub struct HtmlHintAnalyzer {
    command: ToolCommand,
    timeout: Duration,
}

impl HtmlHintAnalyzer {
    pub fn new(settings: &AnalyzerSettings) -> Self {
        Self::with_command(
            ToolCommand::node_package(&settings.launcher, PACKAGE),
            settings.timeout,
        )
    }

    pub fn with_command(command: ToolCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl Analyzer for HtmlHintAnalyzer {
    fn name(&self) -> &str {
        "htmlhint"
    }

    fn bucket(&self) -> LanguageBucket {
        LanguageBucket::Markup
    }

    fn resolve_config(&self, root: &Path) -> ConfigResolution {
        PROBE.resolve(root, &HTMLHINT_BASELINE)
    }

    async fn run(&self, request: AnalyzerRequest<'_>) -> Result<AnalysisArtifact, AnalyzerError> {
        let baseline_file = match request.config {
            ConfigResolution::Baseline(baseline) => {
                Some(baseline.write_temp().map_err(|e| AnalyzerError::Io {
                    tool: self.name().to_string(),
                    source: e,
                })?)
            }
            ConfigResolution::Project(_) => None,
        };

        // HTMLHint picks up .htmlhintrc from the working directory itself
        let mut args = vec!["--format".to_string(), "json".to_string()];
        if let Some(file) = &baseline_file {
            args.push("--config".to_string());
            args.push(file.path().display().to_string());
        }

        let invocation = ToolInvocation {
            tool: self.name(),
            command: &self.command,
            args,
            envs: Vec::new(),
            cwd: request.root,
            timeout: self.timeout,
            cancel: request.cancel,
        };

        let report = invocation.run_chunked(request.files).await?;
        Ok(AnalysisArtifact::new(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn analyzer() -> HtmlHintAnalyzer {
        HtmlHintAnalyzer::new(&AnalyzerSettings {
            launcher: "npx".to_string(),
            timeout: Duration::from_secs(30),
        })
    }

    #[test]
    fn test_bucket_and_name() {
        let analyzer = analyzer();
        assert_eq!(analyzer.bucket(), LanguageBucket::Markup);
        assert_eq!(analyzer.name(), "htmlhint");
    }

    #[test]
    fn test_htmlhintrc_is_project_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".htmlhintrc"), "{}").unwrap();
        assert!(!analyzer().resolve_config(dir.path()).is_baseline());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_message_report_is_normalized() {
        use tokio_util::sync::CancellationToken;

        let command = ToolCommand::new(
            "sh",
            &[
                "-c",
                r#"echo '[{"file":"index.html","messages":[{"type":"error"},{"type":"warning"}]}]'"#,
            ],
        );
        let analyzer = HtmlHintAnalyzer::with_command(command, Duration::from_secs(10));
        let dir = TempDir::new().unwrap();
        let files = vec![std::path::PathBuf::from("index.html")];
        let config = analyzer.resolve_config(dir.path());
        let cancel = CancellationToken::new();

        let artifact = analyzer
            .run(AnalyzerRequest {
                root: dir.path(),
                files: &files,
                config: &config,
                cancel: &cancel,
            })
            .await
            .unwrap();

        let findings = artifact.normalize();
        assert_eq!((findings.error_count, findings.warning_count), (1, 1));
    }
}
