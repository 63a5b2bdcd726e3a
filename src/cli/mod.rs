pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AssessArgs, BatchArgs, CliArgs, Commands, OutputFormatArg, ScanArgs, ShowArgs};
pub use output::{BatchEntry, OutputFormat, OutputFormatter};
