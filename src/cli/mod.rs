//! Entry point: parse argv, resolve config, build an `EngineContext`,
//! dispatch one command, print one envelope (spec.md §4.14–§4.15).

pub mod args;
mod commands;

use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};

use clap::Parser;
use cleo_config::{CliOverrides, Config, ResolvedConfig};
use cleo_engine::EngineContext;
use cleo_envelope::Envelope;
use cleo_utils::logging::{self, LogFormat};

use args::Cli;

static REQUEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A request id unique within this process, cheap enough to mint per
/// invocation without an external id-generation dependency.
fn generate_request_id() -> String {
    let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("req-{}-{seq}", std::process::id())
}

fn overrides_from(cli: &Cli) -> CliOverrides {
    CliOverrides {
        verbose: cli.verbose.then_some(true),
        json_logs: cli.json_logs.then_some(true),
        output_format: cli.format.map(Into::into),
        lock_timeout_seconds: cli.lock_timeout,
        lifecycle_mode: cli.lifecycle_mode.map(Into::into),
        session_require_notes: cli.require_session_notes.then_some(true),
        config_path: cli.config_path.clone(),
    }
}

fn render(config: &Config, envelope: &Envelope) {
    match config.output.format {
        cleo_config::OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(envelope).unwrap_or_default());
        }
        cleo_config::OutputFormat::Human => {
            if envelope.success {
                if let Some(message) = &envelope.message {
                    println!("{message}");
                }
                println!("{}", serde_json::to_string_pretty(&envelope.result).unwrap_or_default());
            } else if let Some(error) = &envelope.error {
                eprintln!("error[{}]: {}", error.name, error.message);
            }
        }
    }
}

/// Parse argv, run exactly one engine operation, print exactly one
/// envelope, and return the process exit code (spec.md §4.14 exit bands).
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let overrides = overrides_from(&cli);

    let ResolvedConfig { mut config, store_dir, .. } = match cleo_config::discover(&overrides) {
        Ok(resolved) => resolved,
        Err(err) => {
            eprintln!("failed to resolve configuration: {err}");
            return ExitCode::from(78);
        }
    };
    if let Some(format) = overrides.output_format {
        config.output.format = format;
    }

    let log_format = if config.output.json_logs { LogFormat::Json } else { LogFormat::Compact };
    if logging::init_tracing(config.output.verbose, log_format).is_err() {
        // A subscriber may already be installed (e.g. under test harnesses); continue regardless.
    }

    if let Err(err) = cleo_utils::paths::ensure_dir_all(&store_dir) {
        eprintln!("failed to create store directory {store_dir}: {err}");
        return ExitCode::from(74);
    }

    let ctx = EngineContext::new(store_dir, config.clone(), cli.actor.clone());
    let request_id = generate_request_id();

    let envelope = commands::execute(&cli.command, &ctx, &request_id);
    let exit_code = envelope.exit_code();
    render(&config, &envelope);

    ExitCode::from(exit_code.clamp(0, 255) as u8)
}
