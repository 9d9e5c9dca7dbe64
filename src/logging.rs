// src/logging.rs

//! Logging setup for `elemental` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--debug` CLI flag
//! 2. `ELEMENTAL_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs go to STDERR unless `--log-file` says otherwise.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::errors::ElementalError;

pub const LOG_ENV: &str = "ELEMENTAL_LOG";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Stdout,
    File(String),
}

impl LogTarget {
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            None | Some("") | Some("stderr") => LogTarget::Stderr,
            Some("-") | Some("stdout") => LogTarget::Stdout,
            Some(path) => LogTarget::File(path.to_string()),
        }
    }
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(debug: bool, log_file: Option<&str>) -> Result<()> {
    let level = resolve_level(debug, std::env::var(LOG_ENV).ok().as_deref());
    let target = LogTarget::from_flag(log_file);

    let (writer, ansi) = match &target {
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogTarget::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ElementalError::ConfigError(format!("opening log file {path:?}: {e}"))
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    fmt()
        .with_max_level(level)
        .with_target(debug)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .init();

    Ok(())
}

fn resolve_level(debug: bool, env: Option<&str>) -> tracing::Level {
    if debug {
        return tracing::Level::DEBUG;
    }
    env.and_then(parse_level_str).unwrap_or(tracing::Level::INFO)
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
