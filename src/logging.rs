//! Debug log sinks and render diagnostics.
//!
//! The terminal is the render surface, so nothing here ever writes to stdout or stderr.
//! Diagnostics go through `tracing`; [`init_file_logging`] installs a file-backed subscriber
//! when `DELTALINE_DEBUG_LOG` names a path.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::EnvConfig;
use crate::error::{Result, TuiError};
use crate::render::renderer::RenderOutcome;

/// Environment variable holding an `EnvFilter` directive for the debug log.
pub const LOG_FILTER_ENV: &str = "DELTALINE_LOG";

const DEFAULT_FILTER: &str = "deltaline=debug";

/// Install a global subscriber that appends to `path`.
///
/// Keep the returned guard alive for as long as logging should work; dropping it flushes the
/// background writer.
pub fn init_file_logging(path: &Path) -> Result<WorkerGuard> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TuiError::LogInit {
            path: path.to_path_buf(),
            source,
        })?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|_| TuiError::SubscriberAlreadySet)?;

    Ok(guard)
}

/// Install file logging if the environment asks for it.
pub fn init_from_env(config: &EnvConfig) -> Result<Option<WorkerGuard>> {
    match config.debug_log.as_deref() {
        Some(path) => init_file_logging(path).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn log_render_pass(
    outcome: RenderOutcome,
    previous_len: usize,
    next_len: usize,
    lines_written: usize,
    height: usize,
) {
    tracing::debug!(
        target: "deltaline::render",
        ?outcome,
        previous_len,
        next_len,
        lines_written,
        height,
        "render pass"
    );
}

pub(crate) fn log_write_failure(err: &std::io::Error, dropped_bytes: usize) {
    tracing::warn!(
        target: "deltaline::output",
        error = %err,
        dropped_bytes,
        "terminal write failed; dropping output"
    );
}
