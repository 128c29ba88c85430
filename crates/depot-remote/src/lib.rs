//! Typed client for git-object-model remotes.
//!
//! Depot talks to a version-controlled repository through a REST API that
//! exposes git's object model: content-addressed blobs, trees, commits, and
//! mutable branch refs. This crate is the pure protocol adapter -- it knows
//! how to create and read objects and how to move a ref with
//! compare-and-swap semantics, and nothing else. Retry policy, collision
//! handling and manifest bookkeeping live in the crates above it.
//!
//! # Backends
//!
//! All backends implement the [`RemoteObjectStore`] trait:
//!
//! - [`RestObjectStore`] -- reqwest-based adapter for the git-data REST wire
//!   contract (JSON bodies, base64 blob content, POSIX mode strings)
//! - [`InMemoryObjectStore`] -- BLAKE3-addressed store for tests and
//!   embedding, with the same compare-and-swap ref semantics
//!
//! # Design Rules
//!
//! 1. Objects are immutable once created; only refs move.
//! 2. `create_blob` is idempotent: identical bytes yield the identical id.
//! 3. A ref update states the exact parent it observed; a stale parent is
//!    rejected as [`RemoteError::Conflict`] and changes nothing.
//! 4. Transport failures are reported distinctly from semantic failures.
//! 5. No retry logic lives here.

pub mod error;
pub mod memory;
pub mod rest;
pub mod traits;
pub mod types;

pub use error::{RemoteError, RemoteResult};
pub use memory::InMemoryObjectStore;
pub use rest::{RestConfig, RestObjectStore};
pub use traits::RemoteObjectStore;
pub use types::{CommitInfo, EntryMode, ObjectId, ObjectKind, PathObject, TreeWriteEntry};
