use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Automated code-quality assessment for submitted repositories
#[derive(Parser, Debug)]
#[command(
    name = "repograde",
    about = "Automated code-quality assessment for submitted repositories",
    version,
    author,
    long_about = "repograde fetches a submitted repository, runs ESLint, HTMLHint and Stylelint \
                  over it (or reuses a lint report produced by its CI), folds the findings into \
                  a 0-100 score and records the outcome per submission."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Assess a repository and record the result",
        long_about = "Checks that the repository is public, looks for an ESLint report among its \
                      recent CI artifacts and otherwise analyzes a snapshot of the default branch. \
                      The record is written to the store directory.\n\n\
                      Examples:\n  \
                      repograde assess team-42 https://github.com/acme/landing-page\n  \
                      repograde assess team-42 https://github.com/acme/landing-page --format json"
    )]
    Assess(AssessArgs),

    #[command(
        about = "Show a stored assessment",
        long_about = "Prints the record stored for a submission.\n\n\
                      Examples:\n  \
                      repograde show team-42\n  \
                      repograde show team-42 --format yaml"
    )]
    Show(ShowArgs),

    #[command(
        about = "Score a local directory",
        long_about = "Classifies, analyzes and scores a directory on disk. Nothing is fetched \
                      and nothing is recorded.\n\n\
                      Examples:\n  \
                      repograde scan\n  \
                      repograde scan ./site --format json"
    )]
    Scan(ScanArgs),

    #[command(
        about = "Assess many submissions",
        long_about = "Reads '<submission_id> <repo_url>' lines (blank lines and lines starting \
                      with '#' are ignored) and assesses them concurrently.\n\n\
                      Examples:\n  \
                      repograde batch submissions.txt\n  \
                      repograde batch - < submissions.txt"
    )]
    Batch(BatchArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AssessArgs {
    #[arg(value_name = "SUBMISSION_ID", help = "Identifier the record is stored under")]
    pub submission_id: String,

    #[arg(value_name = "REPO_URL", help = "Repository URL, e.g. https://github.com/owner/name")]
    pub repository: String,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "TOKEN",
        help = "Forge API token (overrides REPOGRADE_FORGE_TOKEN)"
    )]
    pub token: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    #[arg(value_name = "SUBMISSION_ID")]
    pub submission_id: String,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    #[arg(
        value_name = "PATH",
        help = "Directory to scan (defaults to current directory)"
    )]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct BatchArgs {
    #[arg(value_name = "FILE", help = "Submission list, or '-' for stdin")]
    pub input: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "TOKEN",
        help = "Forge API token (overrides REPOGRADE_FORGE_TOKEN)"
    )]
    pub token: Option<String>,

    #[arg(
        short = 'j',
        long,
        value_name = "N",
        help = "Concurrent assessments (overrides REPOGRADE_MAX_CONCURRENCY)"
    )]
    pub jobs: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
