//! The [`PathResolver`]: decides the final repository path of an upload.

use std::sync::Arc;

use chrono::Utc;
use depot_remote::{ObjectId, RemoteObjectStore};
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};

/// The outcome of path resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Repository-relative path the artifact will be committed at. No
    /// leading or trailing slash.
    pub path: String,
    /// The blob currently stored at `path`, when overwriting an existing
    /// file. `None` for a fresh path.
    pub replaces: Option<ObjectId>,
}

/// Inherit the extension of the original upload filename when the requested
/// name has none.
///
/// `"photo"` with original `"IMG_0042.png"` becomes `"photo.png"`;
/// `"photo.jpg"` is kept as-is. Dotfiles like `".gitignore"` count as
/// having no extension of their own but are also left alone.
pub fn ensure_extension(name: &str, original: &str) -> String {
    let has_extension = name.rfind('.').is_some_and(|i| i > 0 && i + 1 < name.len());
    if has_extension || name.starts_with('.') {
        return name.to_string();
    }
    match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!("{name}.{ext}"),
        _ => name.to_string(),
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Timestamp-plus-random prefix for collision avoidance.
///
/// Monotonically increasing millisecond component plus 8 hex chars of
/// randomness. Collision probability is negligible, not formally zero.
fn unique_prefix() -> String {
    format!("{}{:08x}", Utc::now().timestamp_millis(), rand::random::<u32>())
}

/// Decides the final artifact path, probing the branch head for conflicts.
pub struct PathResolver {
    remote: Arc<dyn RemoteObjectStore>,
    branch: String,
}

impl PathResolver {
    /// A resolver probing `branch` on the given remote.
    pub fn new(remote: Arc<dyn RemoteObjectStore>, branch: impl Into<String>) -> Self {
        Self {
            remote,
            branch: branch.into(),
        }
    }

    /// Resolve the final path for `filename` under `dir`.
    ///
    /// `dir` is sanitized and slash-free at the edges; empty means the
    /// repository root. With `overwrite` the candidate path is used as-is
    /// (reporting the blob being replaced, if any). Without it, an existing
    /// file at the candidate path pushes the upload to a prefixed
    /// alternative. A candidate that names a directory is a validation
    /// failure either way.
    ///
    /// The probe is a one-shot pre-check: it is not transactional against
    /// the commit that follows.
    pub async fn resolve(
        &self,
        dir: &str,
        filename: &str,
        overwrite: bool,
    ) -> ResolveResult<ResolvedPath> {
        let candidate = join(dir, filename);

        // No head means an empty repository: nothing to collide with. The
        // commit pipeline deals with the missing branch itself.
        let Some(head) = self.remote.read_ref(&self.branch).await? else {
            return Ok(ResolvedPath { path: candidate, replaces: None });
        };

        let existing = self.remote.read_path(&head, &candidate).await?;
        match existing {
            Some(object) if !object.is_file() => {
                Err(ResolveError::NotAFile { path: candidate })
            }
            Some(object) if overwrite => Ok(ResolvedPath {
                path: candidate,
                replaces: Some(object.id),
            }),
            None => Ok(ResolvedPath { path: candidate, replaces: None }),
            Some(_) => {
                let unique = join(dir, &format!("{}-{filename}", unique_prefix()));
                debug!(candidate = %candidate, resolved = %unique, "path taken, using unique name");
                Ok(ResolvedPath { path: unique, replaces: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_remote::InMemoryObjectStore;

    fn resolver(store: &Arc<InMemoryObjectStore>) -> PathResolver {
        PathResolver::new(store.clone(), "main")
    }

    #[test]
    fn extension_inherited_when_missing() {
        assert_eq!(ensure_extension("photo", "IMG_0042.png"), "photo.png");
        assert_eq!(ensure_extension("photo.jpg", "IMG_0042.png"), "photo.jpg");
        assert_eq!(ensure_extension("photo", "noextension"), "photo");
        assert_eq!(ensure_extension(".gitignore", "file.txt"), ".gitignore");
        assert_eq!(ensure_extension("archive.tar.gz", "x.zip"), "archive.tar.gz");
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join("", "a.png"), "a.png");
        assert_eq!(join("images", "a.png"), "images/a.png");
    }

    #[tokio::test]
    async fn fresh_path_used_as_is() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.seed_initial_commit("main");
        let resolved = resolver(&store)
            .resolve("images", "photo.png", false)
            .await
            .unwrap();
        assert_eq!(resolved.path, "images/photo.png");
        assert!(resolved.replaces.is_none());
    }

    #[tokio::test]
    async fn collision_generates_prefixed_name() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.seed_initial_commit("main");
        store.commit_paths("main", &[("images/photo.png", b"old")], "seed");

        let first = resolver(&store)
            .resolve("images", "photo.png", false)
            .await
            .unwrap();
        assert_ne!(first.path, "images/photo.png");
        assert!(first.path.starts_with("images/"));
        assert!(first.path.ends_with("-photo.png"));
        assert!(first.replaces.is_none());

        let second = resolver(&store)
            .resolve("images", "photo.png", false)
            .await
            .unwrap();
        assert_ne!(second.path, first.path);
    }

    #[tokio::test]
    async fn overwrite_reports_replaced_blob() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.seed_initial_commit("main");
        let head = store.commit_paths("main", &[("images/photo.png", b"old")], "seed");
        let old_blob = store.tree_blobs(&head)["images/photo.png"].clone();

        let resolved = resolver(&store)
            .resolve("images", "photo.png", true)
            .await
            .unwrap();
        assert_eq!(resolved.path, "images/photo.png");
        assert_eq!(resolved.replaces, Some(old_blob));
    }

    #[tokio::test]
    async fn overwrite_of_fresh_path_has_no_precondition() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.seed_initial_commit("main");
        let resolved = resolver(&store)
            .resolve("", "photo.png", true)
            .await
            .unwrap();
        assert_eq!(resolved.path, "photo.png");
        assert!(resolved.replaces.is_none());
    }

    #[tokio::test]
    async fn directory_candidate_is_rejected() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.seed_initial_commit("main");
        store.commit_paths("main", &[("images/photo.png", b"x")], "seed");

        let err = resolver(&store)
            .resolve("", "images", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotAFile { .. }));

        // Overwrite does not bypass the check.
        let err = resolver(&store)
            .resolve("", "images", true)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotAFile { .. }));
    }

    #[tokio::test]
    async fn missing_branch_resolves_to_candidate() {
        let store = Arc::new(InMemoryObjectStore::new());
        let resolved = resolver(&store)
            .resolve("images", "photo.png", false)
            .await
            .unwrap();
        assert_eq!(resolved.path, "images/photo.png");
    }
}
