//! Command handlers. Each returns the process exit code.

use super::commands::{AssessArgs, BatchArgs, ScanArgs, ShowArgs};
use super::output::{BatchEntry, OutputFormatter};
use crate::config::RepogradeConfig;
use crate::forge::{ForgeClient, GitHubClient, GitHubSettings};
use crate::pipeline::{AssessmentError, AssessmentJob, AssessmentPipeline, AssessmentScheduler};
use crate::store::{AssessmentStatus, AssessmentStore, JsonFileStore};
use anyhow::{bail, Context, Result};
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ASSESSMENT_FAILED: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

fn load_config() -> Result<RepogradeConfig> {
    let config = RepogradeConfig::default();
    config
        .validate()
        .context("Invalid repograde configuration")?;
    debug!("{}", config);
    Ok(config)
}

fn build_pipeline(config: &RepogradeConfig, token: Option<String>) -> Result<AssessmentPipeline> {
    let settings = GitHubSettings::from_config(config).with_token(token);
    let forge: Arc<dyn ForgeClient> =
        Arc::new(GitHubClient::new(settings).context("Failed to create GitHub client")?);
    let store: Arc<dyn AssessmentStore> = Arc::new(JsonFileStore::new(config.store_dir.clone()));
    Ok(AssessmentPipeline::from_config(config, forge, store))
}

fn exit_code_for(status: AssessmentStatus) -> i32 {
    match status {
        AssessmentStatus::Success => EXIT_SUCCESS,
        _ => EXIT_ASSESSMENT_FAILED,
    }
}

/// Cancels `token` on Ctrl-C so a running assessment is recorded as failed
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running assessments");
            token.cancel();
        }
    });
}

pub async fn handle_assess(args: &AssessArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_USAGE;
        }
    };

    let pipeline = match build_pipeline(&config, args.token.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_USAGE;
        }
    };

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    info!(submission = %args.submission_id, repository = %args.repository, "Assessing repository");
    let record = match pipeline
        .trigger_assessment_with_cancel(&args.submission_id, &args.repository, cancel)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Error: {}", e);
            if matches!(e, AssessmentError::InvalidReference(_)) {
                eprintln!("\nExpected a repository URL such as https://github.com/owner/name");
            }
            return EXIT_USAGE;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_record(&args.submission_id, &record) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_USAGE;
        }
    }

    exit_code_for(record.status)
}

pub async fn handle_show(args: &ShowArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_USAGE;
        }
    };

    let store = JsonFileStore::new(config.store_dir.clone());
    let record = match store.get(&args.submission_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            eprintln!(
                "No assessment recorded for '{}' in {}",
                args.submission_id,
                store.dir().display()
            );
            return EXIT_ASSESSMENT_FAILED;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };

    match OutputFormatter::new(args.format.into()).format_record(&args.submission_id, &record) {
        Ok(output) => {
            println!("{}", output);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_USAGE
        }
    }
}

pub async fn handle_scan(args: &ScanArgs) -> i32 {
    let result = async {
        let config = load_config()?;
        let path = match &args.path {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let path = path
            .canonicalize()
            .with_context(|| format!("Cannot access {}", path.display()))?;
        if !path.is_dir() {
            bail!("{} is not a directory", path.display());
        }

        let pipeline = build_pipeline(&config, None)?;
        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(cancel.clone());

        info!(path = %path.display(), "Scanning directory");
        let report = pipeline.assess_directory(&path, &cancel).await?;
        OutputFormatter::new(args.format.into()).format_report(&report)
    }
    .await;

    match result {
        Ok(output) => {
            println!("{}", output);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ASSESSMENT_FAILED
        }
    }
}

/// Parses `<submission_id> <repo_url>` lines. Blank lines and `#` comments
/// are skipped.
pub fn parse_batch(input: &str) -> Result<Vec<AssessmentJob>> {
    let mut jobs = Vec::new();
    for (number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(url), None) => jobs.push(AssessmentJob::new(id, url)),
            _ => bail!(
                "Line {}: expected '<submission_id> <repo_url>', got '{}'",
                number + 1,
                line
            ),
        }
    }
    Ok(jobs)
}

fn read_batch_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read submissions from stdin")?;
        Ok(input)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

pub async fn handle_batch(args: &BatchArgs) -> i32 {
    let prepared = (|| {
        let mut config = load_config()?;
        if let Some(jobs) = args.jobs {
            config.max_concurrency = jobs;
            config.validate().context("Invalid --jobs value")?;
        }
        let jobs = parse_batch(&read_batch_input(&args.input)?)?;
        let pipeline = build_pipeline(&config, args.token.clone())?;
        Ok::<_, anyhow::Error>((config, jobs, pipeline))
    })();

    let (config, jobs, pipeline) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_USAGE;
        }
    };

    info!(submissions = jobs.len(), concurrency = config.max_concurrency, "Starting batch");
    let scheduler = Arc::new(AssessmentScheduler::new(
        Arc::new(pipeline),
        config.max_concurrency,
    ));

    let on_interrupt = Arc::clone(&scheduler);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running assessments");
            on_interrupt.shutdown();
        }
    });

    let results = scheduler.run_all(jobs).await;

    let mut exit_code = EXIT_SUCCESS;
    let entries: Vec<BatchEntry> = results
        .into_iter()
        .map(|(submission_id, result)| match result {
            Ok(record) => {
                exit_code = exit_code.max(exit_code_for(record.status));
                BatchEntry {
                    submission_id,
                    record: Some(record),
                    error: None,
                }
            }
            Err(e) => {
                exit_code = EXIT_USAGE;
                BatchEntry {
                    submission_id,
                    record: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    match OutputFormatter::new(args.format.into()).format_batch(&entries) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_USAGE;
        }
    }
    exit_code
}
