//! In-memory remote backend for tests and embedding.
//!
//! Implements the full object model — content-addressed blobs, flattened
//! trees with base-tree inheritance, commits, and compare-and-swap ref
//! updates — behind `RwLock`s. Ids are BLAKE3 hashes, domain-separated by
//! object kind, so identical blob bytes always yield the identical id just
//! like the real remote.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RemoteError, RemoteResult};
use crate::traits::RemoteObjectStore;
use crate::types::{CommitInfo, EntryMode, ObjectId, ObjectKind, PathObject, TreeWriteEntry};

/// One entry in a flattened tree: full path mapped to mode + blob id.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TreeNode {
    mode: EntryMode,
    blob: ObjectId,
}

/// An object held by the store.
#[derive(Clone, Debug)]
enum StoredObject {
    Blob(Vec<u8>),
    /// Trees are stored flattened: full slash-separated path -> node.
    Tree(BTreeMap<String, TreeNode>),
    Commit {
        tree: ObjectId,
        parents: Vec<ObjectId>,
        #[allow(dead_code)]
        message: String,
    },
}

/// In-memory, HashMap-based remote object store.
///
/// All objects are immutable once inserted; only the ref table moves, and
/// only through the compare-and-swap path. Intended for tests -- the
/// conflict and not-found behavior mirrors the REST backend exactly.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    refs: RwLock<HashMap<String, ObjectId>>,
}

fn hash_id(domain: &str, data: &[u8]) -> ObjectId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    hasher.update(b":");
    hasher.update(data);
    ObjectId::new(hex::encode(hasher.finalize().as_bytes()))
}

impl InMemoryObjectStore {
    /// Create a new empty store with no refs.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            refs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored (blobs, trees, and commits).
    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Bootstrap a branch with an empty root commit and return its id.
    pub fn seed_initial_commit(&self, branch: &str) -> ObjectId {
        let tree_id = self.insert_tree(BTreeMap::new());
        let commit_id = self.insert_commit(tree_id, Vec::new(), "initial commit");
        self.refs
            .write()
            .expect("lock poisoned")
            .insert(branch.to_string(), commit_id.clone());
        commit_id
    }

    /// Commit `files` onto `branch` unconditionally, moving the ref.
    ///
    /// Simulates an external writer (another uploader, a push from
    /// elsewhere) for concurrency tests. Panics if the branch is missing,
    /// which is fine for its test-only purpose.
    pub fn commit_paths(&self, branch: &str, files: &[(&str, &[u8])], message: &str) -> ObjectId {
        let head = self
            .refs
            .read()
            .expect("lock poisoned")
            .get(branch)
            .cloned()
            .unwrap_or_else(|| panic!("branch {branch} not seeded"));

        let base_tree = self.commit_tree(&head);
        let mut flat = self.tree_nodes(&base_tree);
        for (path, content) in files {
            let blob = self.insert_blob(content.to_vec());
            flat.insert(
                (*path).to_string(),
                TreeNode { mode: EntryMode::Regular, blob },
            );
        }
        let tree_id = self.insert_tree(flat);
        let commit_id = self.insert_commit(tree_id, vec![head], message);
        self.refs
            .write()
            .expect("lock poisoned")
            .insert(branch.to_string(), commit_id.clone());
        commit_id
    }

    /// The flattened path -> blob-id view of a commit's tree, for
    /// assertions in tests.
    pub fn tree_blobs(&self, commit: &ObjectId) -> BTreeMap<String, ObjectId> {
        let tree = self.commit_tree(commit);
        self.tree_nodes(&tree)
            .into_iter()
            .map(|(path, node)| (path, node.blob))
            .collect()
    }

    /// Raw bytes of the blob at `path` in `commit`'s tree, if present.
    pub fn blob_at(&self, commit: &ObjectId, path: &str) -> Option<Vec<u8>> {
        let tree = self.commit_tree(commit);
        let node = self.tree_nodes(&tree).remove(path)?;
        let objects = self.objects.read().expect("lock poisoned");
        match objects.get(&node.blob) {
            Some(StoredObject::Blob(data)) => Some(data.clone()),
            _ => None,
        }
    }

    fn insert_blob(&self, data: Vec<u8>) -> ObjectId {
        let id = hash_id("blob", &data);
        self.objects
            .write()
            .expect("lock poisoned")
            .entry(id.clone())
            .or_insert(StoredObject::Blob(data));
        id
    }

    fn insert_tree(&self, nodes: BTreeMap<String, TreeNode>) -> ObjectId {
        // Deterministic id over the sorted (path, mode, blob) triples.
        let mut buf = Vec::new();
        for (path, node) in &nodes {
            buf.extend_from_slice(path.as_bytes());
            buf.push(0);
            buf.extend_from_slice(node.mode.as_wire_str().as_bytes());
            buf.push(0);
            buf.extend_from_slice(node.blob.as_str().as_bytes());
            buf.push(0);
        }
        let id = hash_id("tree", &buf);
        self.objects
            .write()
            .expect("lock poisoned")
            .entry(id.clone())
            .or_insert(StoredObject::Tree(nodes));
        id
    }

    fn insert_commit(&self, tree: ObjectId, parents: Vec<ObjectId>, message: &str) -> ObjectId {
        let mut buf = Vec::new();
        buf.extend_from_slice(tree.as_str().as_bytes());
        for parent in &parents {
            buf.push(0);
            buf.extend_from_slice(parent.as_str().as_bytes());
        }
        buf.push(0);
        buf.extend_from_slice(message.as_bytes());
        let id = hash_id("commit", &buf);
        self.objects
            .write()
            .expect("lock poisoned")
            .entry(id.clone())
            .or_insert(StoredObject::Commit { tree, parents, message: message.to_string() });
        id
    }

    fn commit_tree(&self, commit: &ObjectId) -> ObjectId {
        let objects = self.objects.read().expect("lock poisoned");
        match objects.get(commit) {
            Some(StoredObject::Commit { tree, .. }) => tree.clone(),
            _ => panic!("unknown commit {commit}"),
        }
    }

    fn tree_nodes(&self, tree: &ObjectId) -> BTreeMap<String, TreeNode> {
        let objects = self.objects.read().expect("lock poisoned");
        match objects.get(tree) {
            Some(StoredObject::Tree(nodes)) => nodes.clone(),
            _ => panic!("unknown tree {tree}"),
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.object_count())
            .field("ref_count", &self.refs.read().expect("lock poisoned").len())
            .finish()
    }
}

#[async_trait]
impl RemoteObjectStore for InMemoryObjectStore {
    async fn read_ref(&self, branch: &str) -> RemoteResult<Option<ObjectId>> {
        Ok(self.refs.read().expect("lock poisoned").get(branch).cloned())
    }

    async fn read_commit(&self, id: &ObjectId) -> RemoteResult<CommitInfo> {
        let objects = self.objects.read().expect("lock poisoned");
        match objects.get(id) {
            Some(StoredObject::Commit { tree, parents, .. }) => Ok(CommitInfo {
                id: id.clone(),
                tree: tree.clone(),
                parents: parents.clone(),
            }),
            _ => Err(RemoteError::NotFound { what: format!("commit {id}") }),
        }
    }

    async fn read_blob(&self, id: &ObjectId) -> RemoteResult<Vec<u8>> {
        let objects = self.objects.read().expect("lock poisoned");
        match objects.get(id) {
            Some(StoredObject::Blob(data)) => Ok(data.clone()),
            _ => Err(RemoteError::NotFound { what: format!("blob {id}") }),
        }
    }

    async fn read_path(
        &self,
        commit: &ObjectId,
        path: &str,
    ) -> RemoteResult<Option<PathObject>> {
        let info = self.read_commit(commit).await?;
        let nodes = self.tree_nodes(&info.tree);

        if let Some(node) = nodes.get(path) {
            return Ok(Some(PathObject {
                kind: ObjectKind::Blob,
                id: node.blob.clone(),
            }));
        }

        // A directory exists if any entry lives beneath it.
        let dir_prefix = format!("{path}/");
        let mut sub = Vec::new();
        for (p, node) in &nodes {
            if p.starts_with(&dir_prefix) {
                sub.extend_from_slice(p.as_bytes());
                sub.push(0);
                sub.extend_from_slice(node.blob.as_str().as_bytes());
                sub.push(0);
            }
        }
        if sub.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathObject {
                kind: ObjectKind::Tree,
                id: hash_id("subtree", &sub),
            }))
        }
    }

    async fn create_blob(&self, content: &[u8]) -> RemoteResult<ObjectId> {
        Ok(self.insert_blob(content.to_vec()))
    }

    async fn create_tree(
        &self,
        base: Option<&ObjectId>,
        entries: &[TreeWriteEntry],
    ) -> RemoteResult<ObjectId> {
        let mut nodes = match base {
            Some(base_id) => {
                let objects = self.objects.read().expect("lock poisoned");
                match objects.get(base_id) {
                    Some(StoredObject::Tree(nodes)) => nodes.clone(),
                    _ => {
                        return Err(RemoteError::NotFound {
                            what: format!("tree {base_id}"),
                        })
                    }
                }
            }
            None => BTreeMap::new(),
        };
        for entry in entries {
            nodes.insert(
                entry.path.clone(),
                TreeNode { mode: entry.mode, blob: entry.blob.clone() },
            );
        }
        Ok(self.insert_tree(nodes))
    }

    async fn create_commit(
        &self,
        tree: &ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> RemoteResult<ObjectId> {
        if !self
            .objects
            .read()
            .expect("lock poisoned")
            .contains_key(tree)
        {
            return Err(RemoteError::NotFound { what: format!("tree {tree}") });
        }
        Ok(self.insert_commit(tree.clone(), parents.to_vec(), message))
    }

    async fn update_ref(
        &self,
        branch: &str,
        expected_parent: &ObjectId,
        new_commit: &ObjectId,
    ) -> RemoteResult<()> {
        let mut refs = self.refs.write().expect("lock poisoned");
        match refs.get(branch) {
            None => Err(RemoteError::NotFound {
                what: format!("refs/heads/{branch}"),
            }),
            Some(current) if current != expected_parent => Err(RemoteError::Conflict {
                detail: format!(
                    "refs/heads/{branch} is at {} but {} was expected",
                    current.short(),
                    expected_parent.short()
                ),
            }),
            Some(_) => {
                refs.insert(branch.to_string(), new_commit.clone());
                Ok(())
            }
        }
    }
}
