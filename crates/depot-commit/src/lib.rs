//! The atomic multi-object commit engine.
//!
//! Turns a set of path -> content changes into exactly one commit on a
//! remote branch, or fails with no externally reachable effect. The remote
//! has no multi-file transaction primitive, so atomicity comes from the
//! object graph itself: blobs, a tree built on the observed head's tree,
//! and a commit are all created unreferenced, and only the final
//! compare-and-swap ref update makes them visible -- all of them at once.
//!
//! A conflicting ref update (the head moved between read and write) restarts
//! the whole pipeline against the new head, inside a bounded retry budget.
//! Objects created by an abandoned attempt stay behind as unreferenced
//! garbage, which is harmless and accepted.

pub mod changeset;
pub mod coordinator;
pub mod error;

pub use changeset::ChangeSet;
pub use coordinator::{CommitCoordinator, CommitOutcome, RetryPolicy};
pub use error::{CommitError, CommitResult};
