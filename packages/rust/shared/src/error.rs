//! Error types for seocontext.
//!
//! Library crates use [`SeoContextError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all seocontext operations.
#[derive(Debug, thiserror::Error)]
pub enum SeoContextError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A source could not be reached: missing credential, API error, or an
    /// `{"error": ...}` payload.
    #[error("source {source_id} unavailable: {message}")]
    SourceUnavailable { source_id: String, message: String },

    /// The source answered but carried zero rows.
    #[error("source {source_id} returned no data")]
    EmptyResult { source_id: String },

    /// A single row inside a source payload failed to parse.
    #[error("malformed row from {source_id}: {message}")]
    MalformedRow { source_id: String, message: String },

    /// Nothing to run against. The only error that aborts a run before collection.
    #[error("fatal configuration: {message}")]
    FatalConfiguration { message: String },

    /// Network/HTTP error talking to a connector endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad product input, invalid payload shape, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A run result store key was written twice.
    #[error("stage {key} already written for this run")]
    StageConflict { key: String },

    /// The orchestrator was asked for a state change it does not allow.
    #[error("invalid run transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SeoContextError>;

impl SeoContextError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a fatal configuration error.
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::FatalConfiguration {
            message: msg.into(),
        }
    }

    pub fn source_unavailable(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            message: msg.into(),
        }
    }

    pub fn empty_result(source_id: impl Into<String>) -> Self {
        Self::EmptyResult {
            source_id: source_id.into(),
        }
    }

    pub fn malformed_row(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedRow {
            source_id: source_id.into(),
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

    /// Whether this error is scoped to one source or analysis and the run
    /// should carry on without it.
    pub fn is_source_local(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::EmptyResult { .. }
                | Self::MalformedRow { .. }
                | Self::Network(_)
                | Self::Validation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SeoContextError::config("missing sources table");
        assert_eq!(err.to_string(), "config error: missing sources table");

        let err = SeoContextError::source_unavailable("trend_service", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "source trend_service unavailable: HTTP 503"
        );

        let err = SeoContextError::empty_result("analytics");
        assert!(err.to_string().contains("no data"));
    }

    #[test]
    fn source_local_classification() {
        assert!(SeoContextError::empty_result("analytics").is_source_local());
        assert!(SeoContextError::malformed_row("search_console", "bad ctr").is_source_local());
        assert!(SeoContextError::Network("timeout".into()).is_source_local());
        assert!(!SeoContextError::fatal("no sources configured").is_source_local());
        assert!(
            !SeoContextError::StageConflict {
                key: "analytics".into()
            }
            .is_source_local()
        );
    }
}
