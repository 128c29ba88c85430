//! The versioned JSON manifest of uploaded artifacts.
//!
//! The manifest is a single JSON document stored as a blob at a well-known
//! path in the remote repository. Every successful upload replaces it
//! wholesale inside the same commit as the artifact itself: a new entry is
//! prepended, the minor version is bumped, and the document is re-serialized
//! deterministically so identical content always hashes identically.
//!
//! The manifest is reconstructible state, not a precondition: an absent or
//! corrupt document is silently replaced by a fresh default. Decode failures
//! never propagate to the caller.

pub mod document;
pub mod engine;
pub mod error;
pub mod version;

pub use document::{FileEntry, Manifest};
pub use engine::ManifestEngine;
pub use error::{ManifestError, ManifestResult};
pub use version::bump_version;
