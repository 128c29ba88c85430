//! Error types for path resolution.

use thiserror::Error;

/// Errors that can occur while resolving the final artifact path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The candidate path exists but refers to a directory, so it can
    /// neither be used nor replaced. A validation failure, never retried.
    #[error("path refers to a directory, not a file: {path}")]
    NotAFile { path: String },

    /// The existence probe against the remote failed.
    #[error("remote error: {0}")]
    Remote(#[from] depot_remote::RemoteError),
}

/// Convenience type alias for resolver operations.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
