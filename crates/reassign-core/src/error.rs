//! Error types for loading instances, assignments and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while reading or writing problem data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}:{line}: {message}")]
    Parse {
        origin: String,
        line: usize,
        message: String,
    },

    /// Tables that parsed but do not fit together, such as a dangling
    /// reference or a safety capacity above capacity.
    #[error("inconsistent problem data: {0}")]
    Invalid(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for malformed or inconsistent input, as opposed to unreadable input.
    pub fn is_parse(&self) -> bool {
        matches!(self, CoreError::Parse { .. } | CoreError::Invalid(_))
    }
}
