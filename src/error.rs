//! Crate error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("failed to start terminal: {0}")]
    TerminalStart(#[source] io::Error),
    #[error("failed to restore terminal: {0}")]
    TerminalStop(#[source] io::Error),
    #[error("failed to open debug log {path}: {source}")]
    LogInit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
}

pub type Result<T> = std::result::Result<T, TuiError>;
