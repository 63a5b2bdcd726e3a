use super::config::{ConfigProbe, ESLINT_BASELINE};
use super::process::{ToolCommand, ToolInvocation};
use super::{Analyzer, AnalyzerError, AnalyzerRequest, AnalyzerSettings, ConfigResolution};
use crate::classify::LanguageBucket;
use crate::findings::AnalysisArtifact;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

const PACKAGE: &str = "eslint@8";

const PROBE: ConfigProbe = ConfigProbe {
    file_names: &[
        ".eslintrc",
        ".eslintrc.json",
        ".eslintrc.js",
        ".eslintrc.cjs",
        ".eslintrc.yaml",
        ".eslintrc.yml",
        "eslint.config.js",
        "eslint.config.mjs",
        "eslint.config.cjs",
    ],
    manifest_key: Some("eslintConfig"),
};

/// JavaScript analysis with ESLint 8
pub struct EslintAnalyzer {
    command: ToolCommand,
    timeout: Duration,
}

impl EslintAnalyzer {
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
impl Analyzer for EslintAnalyzer {
    fn name(&self) -> &str {
        "eslint"
    }

    fn bucket(&self) -> LanguageBucket {
        LanguageBucket::Script
    }

    fn resolve_config(&self, root: &Path) -> ConfigResolution {
        PROBE.resolve(root, &ESLINT_BASELINE)
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

        let mut args = vec![
            "--format".to_string(),
            "json".to_string(),
            "--no-error-on-unmatched-pattern".to_string(),
        ];
        let mut envs = Vec::new();
        if let Some(file) = &baseline_file {
            args.push("--no-eslintrc".to_string());
            args.push("--config".to_string());
            args.push(file.path().display().to_string());
            envs.push(("ESLINT_USE_FLAT_CONFIG".to_string(), "false".to_string()));
        }

        let invocation = ToolInvocation {
            tool: self.name(),
            command: &self.command,
            args,
            envs,
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

    fn analyzer() -> EslintAnalyzer {
        EslintAnalyzer::new(&AnalyzerSettings {
            launcher: "npx".to_string(),
            timeout: Duration::from_secs(30),
        })
    }

    #[test]
    fn test_command_uses_launcher() {
        let analyzer = analyzer();
        assert_eq!(analyzer.command.program, "npx");
        assert_eq!(analyzer.command.args, vec!["--yes", PACKAGE]);
        assert_eq!(analyzer.bucket(), LanguageBucket::Script);
    }

    #[test]
    fn test_flat_config_is_project_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("eslint.config.mjs"), "export default [];").unwrap();
        assert!(!analyzer().resolve_config(dir.path()).is_baseline());
    }

    #[test]
    fn test_no_config_uses_baseline() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            analyzer().resolve_config(dir.path()),
            ConfigResolution::Baseline(&ESLINT_BASELINE)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_baseline_run_passes_config_file() {
        use tokio_util::sync::CancellationToken;

        // Echoes a report only when the baseline flags are present
        let command = ToolCommand::new(
            "sh",
            &[
                "-c",
                r#"case "$*" in *--no-eslintrc*--config*) echo '[{"errorCount":1,"warningCount":2}]';; *) echo 'missing flags' 1>&2; exit 2;; esac"#,
                "sh",
            ],
        );
        let analyzer = EslintAnalyzer::with_command(command, Duration::from_secs(10));
        let dir = TempDir::new().unwrap();
        let files = vec![std::path::PathBuf::from("app.js")];
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
        assert_eq!(findings.error_count, 1);
        assert_eq!(findings.warning_count, 2);
    }
}
