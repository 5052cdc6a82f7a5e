//! Error types for MapSweep.
//!
//! Library crates use [`MapSweepError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all MapSweep operations.
#[derive(Debug, thiserror::Error)]
pub enum MapSweepError {
    /// Invalid sweep parameters or configuration file.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transient provider failure (network, timeout, automation hiccup).
    #[error("provider error: {0}")]
    Provider(String),

    /// Provider refused the request outright (e.g. HTTP 400/404). Not retried.
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// Malformed collaborator response or missing identity fields.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or result sink error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MapSweepError>;

impl MapSweepError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a retry might succeed. Only transient provider failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MapSweepError::config("radius must be positive");
        assert_eq!(err.to_string(), "config error: radius must be positive");

        let err = MapSweepError::parse("listing is missing an address");
        assert!(err.to_string().contains("missing an address"));
    }

    #[test]
    fn only_provider_errors_are_retryable() {
        assert!(MapSweepError::Provider("timeout".into()).is_retryable());
        assert!(!MapSweepError::Rejected("HTTP 404".into()).is_retryable());
        assert!(!MapSweepError::parse("bad json").is_retryable());
        assert!(!MapSweepError::config("bad depth").is_retryable());
        assert!(!MapSweepError::Storage("locked".into()).is_retryable());
    }
}
