// src/logging.rs

//! Logging setup for `assetflow` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--verbose` (debug)
//! 3. `ASSETFLOW_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that stdout stays free for dry-run output.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when no CLI flag decides the level.
pub const LOG_ENV_VAR: &str = "ASSETFLOW_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, verbose: bool) -> Result<()> {
    let env_level = std::env::var(LOG_ENV_VAR).ok();
    let level = resolve_level(cli_level, verbose, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Pick the effective level from the CLI flags and the environment value.
pub fn resolve_level(cli_level: Option<LogLevel>, verbose: bool, env_level: Option<&str>) -> Level {
    if let Some(lvl) = cli_level {
        return level_from_log_level(lvl);
    }
    if verbose {
        return Level::DEBUG;
    }
    env_level.and_then(parse_level_str).unwrap_or(Level::INFO)
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
