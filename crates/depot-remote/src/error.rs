//! Error types for remote object store operations.

use thiserror::Error;

/// Errors that can occur while talking to a remote object store.
///
/// The taxonomy separates semantic failures (the remote understood the
/// request and said no) from transport failures (the request may never have
/// arrived). Callers decide what is retryable via [`RemoteError::is_retryable`];
/// this crate never retries on its own.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The referenced object, path, or ref does not exist.
    ///
    /// Reads that can legitimately miss (absent manifest, absent overwrite
    /// target) treat this as a normal "create new" signal, not a failure.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A conditional update was rejected: the observed parent is stale, or
    /// a create call hit a concurrent structural change.
    #[error("remote conflict: {detail}")]
    Conflict { detail: String },

    /// The remote reported a server-side failure (5xx). Eligible for retry
    /// within the coordinator's bounded attempt budget.
    #[error("transient remote failure: status {status}: {detail}")]
    Transient { status: u16, detail: String },

    /// The request never completed at the transport level (connection reset,
    /// timeout, DNS). Treated like a transient failure by callers.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other non-2xx response. The remote's status code and diagnostic
    /// body are attached verbatim for operability.
    #[error("remote fatal error: status {status}: {body}")]
    Fatal { status: u16, body: String },

    /// The remote answered 2xx but the body did not match the wire contract.
    #[error("undecodable remote response: {detail}")]
    Decode { detail: String },
}

impl RemoteError {
    /// Returns `true` for failures a bounded retry loop may absorb.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::Transient { .. } | Self::Transport(_)
        )
    }

    /// The remote's HTTP status code, where one was received.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Fatal { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience type alias for remote operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
