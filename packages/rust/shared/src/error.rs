//! Error types for termgraph.
//!
//! Library crates use [`TermGraphError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all termgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum TermGraphError {
    /// Configuration loading error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching an article or category page.
    #[error("network error: {0}")]
    Network(String),

    /// JSON, TOML or HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A required input file does not exist.
    #[error("missing input: {}", path.display())]
    MissingInput { path: PathBuf },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TermGraphError>;

impl TermGraphError {
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

    /// Whether this error means a required input was absent.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TermGraphError::config("bad selector");
        assert_eq!(err.to_string(), "config error: bad selector");

        let err = TermGraphError::MissingInput {
            path: PathBuf::from("graph/article_map.json"),
        };
        assert_eq!(err.to_string(), "missing input: graph/article_map.json");
        assert!(err.is_missing_input());

        let err = TermGraphError::Network("https://x/bond.asp: HTTP 404 Not Found".into());
        assert!(err.to_string().contains("404"));
        assert!(!err.is_missing_input());
    }
}
