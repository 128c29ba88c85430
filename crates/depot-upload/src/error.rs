//! The outward error surface of the upload service.

use serde::Serialize;
use thiserror::Error;

use depot_commit::CommitError;
use depot_manifest::ManifestError;
use depot_remote::RemoteError;
use depot_resolver::ResolveError;

/// Coarse error kind reported to the outer HTTP surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadErrorKind {
    /// Malformed input reached the core.
    Validation,
    /// The remote rejected the request for good (non-2xx, non-retryable).
    RemoteFatal,
    /// The retry budget ran out against a contended or flaky remote.
    RemoteExhausted,
    /// Everything else (decode failures, internal bugs).
    Internal,
}

/// Errors returned by [`UploadService`](crate::UploadService).
///
/// Transient and conflict failures are absorbed by the commit coordinator's
/// retry loop; only validation failures, fatal remote failures, and budget
/// exhaustion surface here.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The requested path names a directory, not a file.
    #[error("validation error: {detail}")]
    Validation { detail: String },

    /// The target branch does not exist on the remote.
    #[error("branch not found: {branch}")]
    BranchMissing { branch: String },

    /// The remote refused with a non-retryable status. The remote's status
    /// code and diagnostic body are kept verbatim.
    #[error("remote fatal error: status {status}: {body}")]
    RemoteFatal { status: u16, body: String },

    /// The bounded retry budget ran out.
    #[error("retries exhausted after {attempts} attempts: {detail}")]
    RetriesExhausted { attempts: u32, detail: String },

    /// A response or document could not be processed.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl UploadError {
    /// The coarse kind for the structured error body.
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            Self::Validation { .. } => UploadErrorKind::Validation,
            Self::BranchMissing { .. } | Self::RemoteFatal { .. } => UploadErrorKind::RemoteFatal,
            Self::RetriesExhausted { .. } => UploadErrorKind::RemoteExhausted,
            Self::Internal { .. } => UploadErrorKind::Internal,
        }
    }

    /// The HTTP status the outer surface should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::BranchMissing { .. } | Self::RemoteFatal { .. } => 502,
            Self::RetriesExhausted { .. } => 503,
            Self::Internal { .. } => 500,
        }
    }
}

impl From<RemoteError> for UploadError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Fatal { status, body } => UploadError::RemoteFatal { status, body },
            RemoteError::Transient { status, detail } => {
                // A transient error escaping the retry loop means it happened
                // outside any retried step; report it like a fatal one.
                UploadError::RemoteFatal { status, body: detail }
            }
            RemoteError::NotFound { what } => UploadError::Internal {
                detail: format!("unexpected missing object: {what}"),
            },
            other => UploadError::Internal { detail: other.to_string() },
        }
    }
}

impl From<ResolveError> for UploadError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotAFile { path } => UploadError::Validation {
                detail: format!("path refers to a directory: {path}"),
            },
            ResolveError::Remote(e) => e.into(),
        }
    }
}

impl From<ManifestError> for UploadError {
    fn from(e: ManifestError) -> Self {
        match e {
            ManifestError::Remote(e) => e.into(),
            ManifestError::Serialize(e) => UploadError::Internal { detail: e.to_string() },
        }
    }
}

impl From<CommitError> for UploadError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::BranchMissing { branch } => UploadError::BranchMissing { branch },
            CommitError::EmptyChangeSet => UploadError::Internal {
                detail: "empty change-set".to_string(),
            },
            CommitError::RetriesExhausted { attempts, last } => UploadError::RetriesExhausted {
                attempts,
                detail: last.to_string(),
            },
            CommitError::Remote(e) => e.into(),
        }
    }
}

/// Convenience type alias for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;
