//! The [`RemoteObjectStore`] trait defining the remote repository interface.
//!
//! Any backend (REST, in-memory) implements this trait to provide the
//! object-graph primitives the commit coordinator drives. Implementations
//! must be thread-safe (`Send + Sync`); every method is a suspension point.

use async_trait::async_trait;

use crate::error::RemoteResult;
use crate::types::{CommitInfo, ObjectId, PathObject, TreeWriteEntry};

/// Typed access to a git-object-model remote repository.
///
/// Four idempotent read/create primitive groups and one conditional update.
/// The implementations carry no retry logic and no business rules: that is
/// the coordinator's responsibility.
#[async_trait]
pub trait RemoteObjectStore: Send + Sync {
    /// Resolve a branch name to the commit id it points at.
    ///
    /// Returns `Ok(None)` if the branch does not exist.
    async fn read_ref(&self, branch: &str) -> RemoteResult<Option<ObjectId>>;

    /// Read a commit's tree and parent ids.
    async fn read_commit(&self, id: &ObjectId) -> RemoteResult<CommitInfo>;

    /// Read a blob's raw bytes.
    async fn read_blob(&self, id: &ObjectId) -> RemoteResult<Vec<u8>>;

    /// Look up what `path` points at within `commit`'s tree.
    ///
    /// Returns `Ok(None)` if the path does not exist in that snapshot. A
    /// directory resolves to a [`PathObject`] of tree kind; callers that
    /// expect a file must check.
    async fn read_path(&self, commit: &ObjectId, path: &str)
        -> RemoteResult<Option<PathObject>>;

    /// Create a blob from raw bytes and return its content-addressed id.
    ///
    /// Safe to call repeatedly with identical bytes: the remote returns the
    /// identical id each time.
    async fn create_blob(&self, content: &[u8]) -> RemoteResult<ObjectId>;

    /// Create a tree, optionally on top of a base tree.
    ///
    /// With `base` set, every path of the base tree not named in `entries`
    /// is inherited unchanged; named paths are replaced or added.
    async fn create_tree(
        &self,
        base: Option<&ObjectId>,
        entries: &[TreeWriteEntry],
    ) -> RemoteResult<ObjectId>;

    /// Create a commit pointing at `tree` with the given parents.
    async fn create_commit(
        &self,
        tree: &ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> RemoteResult<ObjectId>;

    /// Move `branch` from `expected_parent` to `new_commit`.
    ///
    /// Compare-and-swap: succeeds only if the ref still points at
    /// `expected_parent` at the instant of update. A stale expectation
    /// yields [`RemoteError::Conflict`](crate::RemoteError::Conflict) and
    /// leaves the ref untouched.
    async fn update_ref(
        &self,
        branch: &str,
        expected_parent: &ObjectId,
        new_commit: &ObjectId,
    ) -> RemoteResult<()>;
}
