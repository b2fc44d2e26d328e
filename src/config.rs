//! Environment configuration.

use std::env;
use std::path::PathBuf;

/// Default number of differing overlapping lines a pass may rewrite in place before the
/// renderer switches to a bulk rewrite.
pub const DEFAULT_BULK_REWRITE_THRESHOLD: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    pub bulk_rewrite_threshold: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            bulk_rewrite_threshold: DEFAULT_BULK_REWRITE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub debug_log: Option<PathBuf>,
    pub write_log: Option<PathBuf>,
    pub renderer: RendererConfig,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let mut renderer = RendererConfig::default();
        if let Some(threshold) = env_usize_opt("DELTALINE_BULK_THRESHOLD") {
            renderer.bulk_rewrite_threshold = threshold;
        }
        Self {
            debug_log: env_string_opt("DELTALINE_DEBUG_LOG").map(PathBuf::from),
            write_log: env_string_opt("DELTALINE_WRITE_LOG").map(PathBuf::from),
            renderer,
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_usize_opt(key: &str) -> Option<usize> {
    let value = env_string_opt(key)?;
    match value.trim().parse::<usize>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "ignoring non-numeric environment value");
            None
        }
    }
}
