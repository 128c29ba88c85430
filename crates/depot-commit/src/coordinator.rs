//! The [`CommitCoordinator`]: drives the blob -> tree -> commit -> ref
//! pipeline under optimistic concurrency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use depot_remote::{ObjectId, RemoteObjectStore, TreeWriteEntry};
use tracing::{debug, info, warn};

use crate::changeset::ChangeSet;
use crate::error::{CommitError, CommitResult};

/// Bounded retry with linearly increasing backoff.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first. The pipeline never runs more
    /// often than this, whatever the failure mix.
    pub max_attempts: u32,
    /// Delay after attempt `n` is `n * backoff_unit`, to fall out of step
    /// with a contending writer.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A policy without delays, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_unit: Duration::ZERO,
        }
    }
}

/// The result of a successful pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The newly created commit the branch now points at.
    pub commit: ObjectId,
    /// The head the commit was built on.
    pub parent: ObjectId,
    /// How many pipeline attempts it took.
    pub attempts: u32,
}

/// Orchestrates one change-set into exactly one commit.
///
/// Per attempt the pipeline is strictly linear:
///
/// ```text
/// ReadHead -> ReadBaseTree -> CreateBlobs -> CreateTree
///          -> CreateCommit -> UpdateRef
/// ```
///
/// Only the final `UpdateRef` has an externally visible effect, and it is
/// compare-and-swap against the head observed in `ReadHead`. A conflict
/// there, or a transient failure anywhere, restarts the pipeline from
/// `ReadHead` within the shared attempt budget. Blob ids are cached across
/// attempts -- blobs are content-addressed, so they remain valid however
/// often the head moves.
pub struct CommitCoordinator {
    remote: Arc<dyn RemoteObjectStore>,
    branch: String,
    retry: RetryPolicy,
}

impl CommitCoordinator {
    /// A coordinator committing to `branch` with the default retry policy.
    pub fn new(remote: Arc<dyn RemoteObjectStore>, branch: impl Into<String>) -> Self {
        Self {
            remote,
            branch: branch.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The branch this coordinator commits to.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Commit `changes` as one atomic commit with `message`.
    ///
    /// On success the branch ref points at a commit containing every path
    /// of the change-set; on failure no new state is reachable via the ref.
    /// Orphaned objects from failed attempts are accepted garbage.
    pub async fn commit(
        &self,
        changes: &ChangeSet,
        message: &str,
    ) -> CommitResult<CommitOutcome> {
        if changes.is_empty() {
            return Err(CommitError::EmptyChangeSet);
        }

        let mut blob_cache: HashMap<String, ObjectId> = HashMap::new();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(changes, message, &mut blob_cache).await {
                Ok((commit, parent)) => {
                    info!(
                        branch = %self.branch,
                        commit = %commit.short(),
                        attempt,
                        paths = changes.len(),
                        "change-set committed"
                    );
                    return Ok(CommitOutcome { commit, parent, attempts: attempt });
                }
                Err(CommitError::Remote(e)) if e.is_retryable() => {
                    if attempt >= self.retry.max_attempts {
                        return Err(CommitError::RetriesExhausted { attempts: attempt, last: e });
                    }
                    warn!(
                        branch = %self.branch,
                        attempt,
                        error = %e,
                        "pipeline attempt failed, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff_unit * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One linear pipeline run against the current head.
    async fn attempt(
        &self,
        changes: &ChangeSet,
        message: &str,
        blob_cache: &mut HashMap<String, ObjectId>,
    ) -> CommitResult<(ObjectId, ObjectId)> {
        // ReadHead
        let head = self
            .remote
            .read_ref(&self.branch)
            .await?
            .ok_or_else(|| CommitError::BranchMissing { branch: self.branch.clone() })?;

        // ReadBaseTree
        let base_tree = self.remote.read_commit(&head).await?.tree;
        debug!(head = %head.short(), base_tree = %base_tree.short(), "pipeline attempt");

        // CreateBlobs (content-addressed, so ids survive retries)
        let mut entries = Vec::with_capacity(changes.len());
        for (path, content) in changes.iter() {
            let blob = match blob_cache.get(path) {
                Some(blob) => blob.clone(),
                None => {
                    let blob = self.remote.create_blob(content).await?;
                    blob_cache.insert(path.to_string(), blob.clone());
                    blob
                }
            };
            entries.push(TreeWriteEntry::file(path, blob));
        }

        // CreateTree: change-set paths override, everything else inherited.
        let tree = self.remote.create_tree(Some(&base_tree), &entries).await?;

        // CreateCommit
        let commit = self
            .remote
            .create_commit(&tree, std::slice::from_ref(&head), message)
            .await?;

        // UpdateRef: the only externally visible step.
        self.remote.update_ref(&self.branch, &head, &commit).await?;
        Ok((commit, head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use depot_remote::{
        CommitInfo, InMemoryObjectStore, PathObject, RemoteError, RemoteResult,
    };

    fn changes(files: &[(&str, &[u8])]) -> ChangeSet {
        let mut cs = ChangeSet::new();
        for (path, content) in files {
            cs.put(*path, content.to_vec());
        }
        cs
    }

    /// Delegating store that injects failures around specific calls.
    struct FaultyStore {
        inner: Arc<InMemoryObjectStore>,
        /// Move the head right before this many update_ref calls,
        /// provoking a compare-and-swap conflict each time.
        conflicts_to_inject: AtomicU32,
        /// Fail create_tree with a transient error this many times.
        transient_tree_failures: AtomicU32,
        /// Fail create_blob fatally when set.
        fatal_blobs: bool,
        blob_calls: AtomicU32,
    }

    impl FaultyStore {
        fn new(inner: Arc<InMemoryObjectStore>) -> Self {
            Self {
                inner,
                conflicts_to_inject: AtomicU32::new(0),
                transient_tree_failures: AtomicU32::new(0),
                fatal_blobs: false,
                blob_calls: AtomicU32::new(0),
            }
        }

        fn take(counter: &AtomicU32) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl RemoteObjectStore for FaultyStore {
        async fn read_ref(&self, branch: &str) -> RemoteResult<Option<ObjectId>> {
            self.inner.read_ref(branch).await
        }
        async fn read_commit(&self, id: &ObjectId) -> RemoteResult<CommitInfo> {
            self.inner.read_commit(id).await
        }
        async fn read_blob(&self, id: &ObjectId) -> RemoteResult<Vec<u8>> {
            self.inner.read_blob(id).await
        }
        async fn read_path(
            &self,
            commit: &ObjectId,
            path: &str,
        ) -> RemoteResult<Option<PathObject>> {
            self.inner.read_path(commit, path).await
        }
        async fn create_blob(&self, content: &[u8]) -> RemoteResult<ObjectId> {
            self.blob_calls.fetch_add(1, Ordering::SeqCst);
            if self.fatal_blobs {
                return Err(RemoteError::Fatal { status: 403, body: "forbidden".into() });
            }
            self.inner.create_blob(content).await
        }
        async fn create_tree(
            &self,
            base: Option<&ObjectId>,
            entries: &[TreeWriteEntry],
        ) -> RemoteResult<ObjectId> {
            if Self::take(&self.transient_tree_failures) {
                return Err(RemoteError::Transient { status: 502, detail: "bad gateway".into() });
            }
            self.inner.create_tree(base, entries).await
        }
        async fn create_commit(
            &self,
            tree: &ObjectId,
            parents: &[ObjectId],
            message: &str,
        ) -> RemoteResult<ObjectId> {
            self.inner.create_commit(tree, parents, message).await
        }
        async fn update_ref(
            &self,
            branch: &str,
            expected_parent: &ObjectId,
            new_commit: &ObjectId,
        ) -> RemoteResult<()> {
            if Self::take(&self.conflicts_to_inject) {
                // A contending writer lands first.
                self.inner
                    .commit_paths(branch, &[("contender.txt", b"external")], "external push");
            }
            self.inner.update_ref(branch, expected_parent, new_commit).await
        }
    }

    #[tokio::test]
    async fn commits_all_paths_atomically() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.seed_initial_commit("main");
        store.commit_paths("main", &[("keep.txt", b"keep")], "seed");

        let coordinator = CommitCoordinator::new(store.clone(), "main");
        let outcome = coordinator
            .commit(
                &changes(&[("images/photo.png", b"png"), ("manifest.json", b"{}")]),
                "upload photo.png",
            )
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(store.read_ref("main").await.unwrap(), Some(outcome.commit.clone()));

        // Both new paths from the same commit, prior paths inherited.
        let tree = store.tree_blobs(&outcome.commit);
        assert!(tree.contains_key("images/photo.png"));
        assert!(tree.contains_key("manifest.json"));
        assert_eq!(store.blob_at(&outcome.commit, "keep.txt").unwrap(), b"keep");
    }

    #[tokio::test]
    async fn empty_change_set_is_rejected() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.seed_initial_commit("main");
        let coordinator = CommitCoordinator::new(store, "main");
        let err = coordinator.commit(&ChangeSet::new(), "nothing").await.unwrap_err();
        assert!(matches!(err, CommitError::EmptyChangeSet));
    }

    #[tokio::test]
    async fn missing_branch_is_fatal_not_retried() {
        let store = Arc::new(InMemoryObjectStore::new());
        let coordinator = CommitCoordinator::new(store, "main");
        let err = coordinator
            .commit(&changes(&[("a.txt", b"a")]), "upload")
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::BranchMissing { .. }));
    }

    #[tokio::test]
    async fn conflict_restarts_against_new_head() {
        let inner = Arc::new(InMemoryObjectStore::new());
        inner.seed_initial_commit("main");
        let store = Arc::new(FaultyStore::new(inner.clone()));
        store.conflicts_to_inject.store(1, Ordering::SeqCst);

        let coordinator = CommitCoordinator::new(store.clone(), "main")
            .with_retry(RetryPolicy::immediate(3));
        let outcome = coordinator
            .commit(&changes(&[("a.txt", b"a")]), "upload")
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        // The final tree reflects both the contender's change and ours.
        let tree = inner.tree_blobs(&outcome.commit);
        assert!(tree.contains_key("contender.txt"));
        assert!(tree.contains_key("a.txt"));
        // The winning commit's parent is the contender's head.
        let info = inner.read_commit(&outcome.commit).await.unwrap();
        assert_eq!(info.parents, vec![outcome.parent]);
    }

    #[tokio::test]
    async fn blobs_are_created_once_across_retries() {
        let inner = Arc::new(InMemoryObjectStore::new());
        inner.seed_initial_commit("main");
        let store = Arc::new(FaultyStore::new(inner));
        store.conflicts_to_inject.store(1, Ordering::SeqCst);

        let coordinator = CommitCoordinator::new(store.clone(), "main")
            .with_retry(RetryPolicy::immediate(3));
        coordinator
            .commit(&changes(&[("a.txt", b"a"), ("b.txt", b"b")]), "upload")
            .await
            .unwrap();

        // Two paths, two blob creations, despite the extra attempt.
        assert_eq!(store.blob_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_failure_consumes_the_same_budget() {
        let inner = Arc::new(InMemoryObjectStore::new());
        inner.seed_initial_commit("main");
        let store = Arc::new(FaultyStore::new(inner));
        store.transient_tree_failures.store(1, Ordering::SeqCst);

        let coordinator = CommitCoordinator::new(store, "main")
            .with_retry(RetryPolicy::immediate(3));
        let outcome = coordinator
            .commit(&changes(&[("a.txt", b"a")]), "upload")
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn persistent_conflict_exhausts_retries() {
        let inner = Arc::new(InMemoryObjectStore::new());
        inner.seed_initial_commit("main");
        let store = Arc::new(FaultyStore::new(inner.clone()));
        store.conflicts_to_inject.store(u32::MAX, Ordering::SeqCst);

        let coordinator = CommitCoordinator::new(store, "main")
            .with_retry(RetryPolicy::immediate(3));
        let err = coordinator
            .commit(&changes(&[("a.txt", b"a")]), "upload")
            .await
            .unwrap_err();
        match err {
            CommitError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.is_retryable());
            }
            other => panic!("unexpected: {other:?}"),
        }
        // Nothing of ours became reachable.
        let head = inner.read_ref("main").await.unwrap().unwrap();
        assert!(!inner.tree_blobs(&head).contains_key("a.txt"));
    }

    #[tokio::test]
    async fn fatal_failure_aborts_without_retry() {
        let inner = Arc::new(InMemoryObjectStore::new());
        inner.seed_initial_commit("main");
        let mut faulty = FaultyStore::new(inner);
        faulty.fatal_blobs = true;
        let store = Arc::new(faulty);

        let coordinator = CommitCoordinator::new(store.clone(), "main")
            .with_retry(RetryPolicy::immediate(3));
        let err = coordinator
            .commit(&changes(&[("a.txt", b"a")]), "upload")
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::Remote(RemoteError::Fatal { status: 403, .. })));
        assert_eq!(store.blob_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn identical_content_reuses_the_blob_across_commits() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.seed_initial_commit("main");
        let coordinator = CommitCoordinator::new(store.clone(), "main");

        let first = coordinator
            .commit(&changes(&[("photo.png", b"same bytes")]), "upload")
            .await
            .unwrap();
        let second = coordinator
            .commit(&changes(&[("photo.png", b"same bytes")]), "replace")
            .await
            .unwrap();

        assert_ne!(first.commit, second.commit);
        let blob_a = store.tree_blobs(&first.commit)["photo.png"].clone();
        let blob_b = store.tree_blobs(&second.commit)["photo.png"].clone();
        assert_eq!(blob_a, blob_b);
    }
}
