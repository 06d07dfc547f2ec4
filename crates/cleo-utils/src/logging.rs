//! Structured logging setup for the cleo CLI entry point.
//!
//! Library crates only emit `tracing` events; this module is the single
//! place a subscriber is configured, called once from `main`.

use std::io::IsTerminal;
use tracing::{Level, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if stdout is a terminal and `NO_COLOR` is unset.
fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable compact lines.
    Compact,
    /// One JSON object per line, for machine consumption.
    Json,
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise `verbose` selects
/// between `cleo=debug,info` and `cleo=info,warn`.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("cleo=debug,info")
            } else {
                EnvFilter::try_new("cleo=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(false))
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_ansi(use_color())
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span covering one engine operation (`tasks.create`, `lifecycle.advance`, ...).
pub fn operation_span(operation: &str) -> tracing::Span {
    span!(Level::INFO, "operation", operation = %operation)
}

/// Log a successful mutation commit.
pub fn log_commit(operation: &str, task_id: Option<&str>, generation: u64) {
    info!(
        operation = %operation,
        task_id = task_id.unwrap_or("-"),
        generation,
        "store commit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_variants_are_distinct() {
        assert_ne!(LogFormat::Compact, LogFormat::Json);
    }

    #[test]
    fn operation_span_builds_without_panic() {
        let _span = operation_span("tasks.create");
    }
}
