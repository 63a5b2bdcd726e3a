//! Utility modules for repograde

pub mod logging;
pub mod panic;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
pub use panic::panic_message;
