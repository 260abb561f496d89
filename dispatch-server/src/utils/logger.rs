//! Logging setup
//!
//! One subscriber for the whole process. `LOG_LEVEL` accepts full filter
//! directives, not just a level ("info", "dispatch_server=debug,info"), so
//! a single reactor can be turned up without drowning the rest. `LOG_DIR`
//! moves output from stderr to a daily-rolled file in that directory.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// File prefix for rolled log files (`dispatch.YYYY-MM-DD`)
const LOG_FILE_PREFIX: &str = "dispatch";

/// Install the global subscriber. Invalid filter directives fall back to
/// `info`; a missing log directory falls back to stderr with a warning.
pub fn init_logger(filter: &str, log_dir: Option<&str>) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid LOG_LEVEL ({err}), falling back to info");
        EnvFilter::new("info")
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_dir {
        Some(dir) if Path::new(dir).is_dir() => {
            // No color codes in files
            builder
                .with_ansi(false)
                .with_writer(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
                .init();
        }
        Some(dir) => {
            builder.init();
            tracing::warn!(dir, "log directory does not exist, logging to stderr");
        }
        None => builder.init(),
    }
}
