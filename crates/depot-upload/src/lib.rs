//! High-level upload API for Depot.
//!
//! Ties the lower crates together into the one operation the system exists
//! for: take validated upload inputs, decide the final repository path,
//! produce the updated manifest document, and land artifact and manifest in
//! a single atomic commit on the target branch.
//!
//! Everything upstream of this crate -- authentication, CORS, multipart
//! parsing, size limits, input sanitizing -- is an external collaborator.
//! The [`UploadService`] assumes its inputs are already validated and
//! returns either an [`UploadOutcome`] or a structured [`UploadError`]
//! carrying an error kind and HTTP status for the outer surface.

pub mod config;
pub mod error;
pub mod service;

pub use config::UploadConfig;
pub use error::{UploadError, UploadErrorKind, UploadResult};
pub use service::{UploadOutcome, UploadRequest, UploadService};

// Re-export key types
pub use depot_commit::RetryPolicy;
pub use depot_manifest::{FileEntry, Manifest};
pub use depot_remote::{InMemoryObjectStore, ObjectId, RemoteObjectStore, RestConfig, RestObjectStore};
