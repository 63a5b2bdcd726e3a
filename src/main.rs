use repograde::cli::commands::{CliArgs, Commands};
use repograde::cli::handlers::{handle_assess, handle_batch, handle_scan, handle_show};
use repograde::config::RepogradeConfig;
use repograde::util::logging::{init_logging, parse_level, LoggingConfig};
use repograde::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("repograde v{} starting", VERSION);

    let exit_code = match &args.command {
        Commands::Assess(assess_args) => handle_assess(assess_args).await,
        Commands::Show(show_args) => handle_show(show_args).await,
        Commands::Scan(scan_args) => handle_scan(scan_args).await,
        Commands::Batch(batch_args) => handle_batch(batch_args).await,
    };

    std::process::exit(exit_code);
}

/// `--log-level` beats `-v`/`-q`, which beat `REPOGRADE_LOG_LEVEL`
fn init_logging_from_args(args: &CliArgs) {
    let config = LoggingConfig::from_config(&RepogradeConfig::default())
        .with_verbosity(args.verbose, args.quiet);

    let config = match &args.log_level {
        Some(level) => LoggingConfig {
            level: parse_level(level),
            ..config
        },
        None => config,
    };

    init_logging(config);
}
