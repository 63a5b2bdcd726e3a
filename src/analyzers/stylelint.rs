use super::config::{ConfigProbe, STYLELINT_BASELINE};
use super::process::{ToolCommand, ToolInvocation};
use super::{Analyzer, AnalyzerError, AnalyzerRequest, AnalyzerSettings, ConfigResolution};
use crate::classify::LanguageBucket;
use crate::findings::AnalysisArtifact;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

const PACKAGE: &str = "stylelint@16";

const PROBE: ConfigProbe = ConfigProbe {
    file_names: &[
        ".stylelintrc",
        ".stylelintrc.json",
        ".stylelintrc.yaml",
        ".stylelintrc.yml",
        ".stylelintrc.js",
        ".stylelintrc.cjs",
        ".stylelintrc.mjs",
        "stylelint.config.js",
        "stylelint.config.cjs",
        "stylelint.config.mjs",
    ],
    manifest_key: Some("stylelint"),
};

/// CSS analysis with Stylelint
pub struct StylelintAnalyzer {
    command: ToolCommand,
    timeout: Duration,
}

impl StylelintAnalyzer {
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
impl Analyzer for StylelintAnalyzer {
    fn name(&self) -> &str {
        "stylelint"
    }

    fn bucket(&self) -> LanguageBucket {
        LanguageBucket::Stylesheet
    }

    fn resolve_config(&self, root: &Path) -> ConfigResolution {
        PROBE.resolve(root, &STYLELINT_BASELINE)
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
            "--formatter".to_string(),
            "json".to_string(),
            "--allow-empty-input".to_string(),
        ];
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
