//! Store error types
//!
//! Two of the five kinds (`NotFound`, `CorruptState`) are recovered inside the
//! store and never reach callers; the rest fail the one `update()` that hit
//! them and nothing else.

use std::path::PathBuf;

use thiserror::Error;

/// Error kind for structured logging and HTTP-boundary mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Storage location absent (first run)
    NotFound,
    /// Persisted content could not be parsed
    CorruptState,
    /// Caller-supplied mutator failed, panicked, or produced an unnormalizable draft
    MutatorFailure,
    /// Durable write failed
    PersistenceFailure,
    /// Store could not be initialized or the worker has stopped
    Unavailable,
}

impl ErrorKind {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::CorruptState => "CORRUPT_STATE",
            Self::MutatorFailure => "MUTATOR_FAILURE",
            Self::PersistenceFailure => "PERSISTENCE_FAILURE",
            Self::Unavailable => "UNAVAILABLE",
        }
    }

    /// Whether a request handler should turn this into a failure response.
    pub fn is_caller_visible(&self) -> bool {
        !matches!(self, Self::NotFound | Self::CorruptState)
    }
}

/// Errors from a [`DocumentBackend`](crate::backend::DocumentBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("document not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("corrupt document at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Corrupt { .. } => ErrorKind::CorruptState,
            Self::Serialize(_) | Self::Io(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// Errors surfaced by [`Store`](crate::store::Store) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to initialize document: {0}")]
    Init(#[source] BackendError),

    #[error("mutator failed: {0:#}")]
    Mutator(anyhow::Error),

    #[error("mutator panicked: {0}")]
    MutatorPanicked(String),

    #[error("failed to normalize draft: {0}")]
    Normalize(#[source] serde_json::Error),

    #[error("failed to persist document: {0}")]
    Persistence(#[source] BackendError),

    #[error("update worker has stopped")]
    Closed,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Init(_) | Self::Closed => ErrorKind::Unavailable,
            Self::Mutator(_) | Self::MutatorPanicked(_) | Self::Normalize(_) => {
                ErrorKind::MutatorFailure
            }
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovered_kinds_are_hidden_from_callers() {
        assert!(!ErrorKind::NotFound.is_caller_visible());
        assert!(!ErrorKind::CorruptState.is_caller_visible());
        assert!(ErrorKind::MutatorFailure.is_caller_visible());
        assert!(ErrorKind::PersistenceFailure.is_caller_visible());
        assert!(ErrorKind::Unavailable.is_caller_visible());
    }

    #[test]
    fn mutator_error_keeps_context_chain() {
        let err = StoreError::Mutator(anyhow::anyhow!("boom").context("bumping endorsements"));
        assert_eq!(err.kind(), ErrorKind::MutatorFailure);
        assert_eq!(err.to_string(), "mutator failed: bumping endorsements: boom");
    }

    #[test]
    fn persistence_error_maps_kind() {
        let err = StoreError::Persistence(BackendError::Io(std::io::Error::other("disk full")));
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert_eq!(err.kind().as_str(), "PERSISTENCE_FAILURE");
    }
}
