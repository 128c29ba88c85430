//! Error types for manifest operations.

use thiserror::Error;

/// Errors that can occur while loading or serializing the manifest.
///
/// A manifest that fails to *decode* is not an error (it is replaced by the
/// default document); only remote I/O and re-serialization can fail.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The remote could not be read.
    #[error("remote error: {0}")]
    Remote(#[from] depot_remote::RemoteError),

    /// The outgoing document could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience type alias for manifest operations.
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;
