//! Error types for the commit pipeline.

use depot_remote::RemoteError;
use thiserror::Error;

/// Errors that can occur while executing the commit pipeline.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The target branch does not exist, so there is no head to commit
    /// onto. Bootstrapping a fresh repository is out of scope here.
    #[error("branch not found: {branch}")]
    BranchMissing { branch: String },

    /// The change-set was empty; committing nothing is a caller bug.
    #[error("empty change-set")]
    EmptyChangeSet,

    /// The retry budget ran out without a successful ref update. Carries
    /// the failure of the final attempt.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: RemoteError,
    },

    /// A non-retryable remote failure aborted the pipeline.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Convenience type alias for commit operations.
pub type CommitResult<T> = std::result::Result<T, CommitError>;
