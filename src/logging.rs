//! Logging setup.
//!
//! Structured logging through `tracing`. Events go to stderr so command
//! output on stdout stays clean for scripts and `--json`.

use thiserror::Error;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// environment variable holding a filter directive, e.g. `localvcs=trace`
pub const ENV_LOG: &str = "LOCALVCS_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Level used when `LOCALVCS_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "localvcs=debug"
    } else {
        "localvcs=warn"
    }
}

/// Build the filter from `LOCALVCS_LOG`, falling back to the default level.
pub fn build_env_filter(verbose: bool) -> Result<EnvFilter, LoggingError> {
    match std::env::var(ENV_LOG) {
        Ok(directives) if !directives.trim().is_empty() => parse_filter(&directives),
        _ => parse_filter(default_directive(verbose)),
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter(format!("{}: {}", directives, e)))
}

/// Install the global subscriber.
pub fn init_logging(verbose: bool) -> Result<(), LoggingError> {
    let filter = build_env_filter(verbose)?;
    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
