//! The [`UploadService`]: one validated upload in, one atomic commit out.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use depot_commit::{ChangeSet, CommitCoordinator};
use depot_manifest::{FileEntry, ManifestEngine};
use depot_remote::{ObjectId, RemoteObjectStore};
use depot_resolver::{ensure_extension, PathResolver};

use crate::config::UploadConfig;
use crate::error::{UploadError, UploadResult};

/// A validated upload, as handed over by the outer request layer.
///
/// All fields are assumed sanitized and size-bounded already; the content
/// type is advisory and passed through to the manifest untouched.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Original filename of the upload (e.g. from the multipart part).
    pub file_name: String,
    /// Requested name override. Falls back to `file_name`; a missing
    /// extension is inherited from `file_name`.
    pub name: Option<String>,
    /// Target directory, slash-free at the edges; empty means the
    /// repository root.
    pub directory: String,
    /// Declared content type, advisory only.
    pub content_type: Option<String>,
    /// The artifact bytes.
    pub content: Vec<u8>,
    /// Replace an existing file at the candidate path instead of picking a
    /// collision-free alternative.
    pub overwrite: bool,
}

impl UploadRequest {
    /// A minimal request for `file_name` with the given content.
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            name: None,
            directory: String::new(),
            content_type: None,
            content: content.into(),
            overwrite: false,
        }
    }

    /// Set the target directory.
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Set the requested name override.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Allow overwriting an existing file.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    fn effective_filename(&self) -> String {
        match &self.name {
            Some(name) => ensure_extension(name, &self.file_name),
            None => self.file_name.clone(),
        }
    }
}

/// The outward result of a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// Final repository-relative path of the artifact.
    pub path: String,
    /// The commit that made artifact and manifest visible together.
    pub commit: ObjectId,
    /// Raw content URL for the artifact, when configured.
    pub raw_url: Option<String>,
}

/// Uploads artifacts into the remote repository.
///
/// Each call resolves the final path, produces the updated manifest
/// document, and drives the commit coordinator so that artifact and
/// manifest land in the same commit -- or nothing lands at all.
pub struct UploadService {
    resolver: PathResolver,
    manifest: ManifestEngine,
    coordinator: CommitCoordinator,
    remote: Arc<dyn RemoteObjectStore>,
    config: UploadConfig,
}

impl UploadService {
    /// A service committing to the remote per `config`.
    pub fn new(remote: Arc<dyn RemoteObjectStore>, config: UploadConfig) -> Self {
        Self {
            resolver: PathResolver::new(remote.clone(), config.branch.clone()),
            manifest: ManifestEngine::new(remote.clone(), config.manifest_path.clone()),
            coordinator: CommitCoordinator::new(remote.clone(), config.branch.clone())
                .with_retry(config.retry),
            remote,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload one artifact.
    ///
    /// Returns once the branch ref points at a commit containing both the
    /// artifact at the final path and the updated manifest. On any error
    /// no new state is reachable via the ref.
    #[instrument(skip(self, request), fields(file = %request.file_name, dir = %request.directory))]
    pub async fn upload(&self, request: UploadRequest) -> UploadResult<UploadOutcome> {
        let filename = request.effective_filename();
        let resolved = self
            .resolver
            .resolve(&request.directory, &filename, request.overwrite)
            .await?;

        // The manifest is read against the head observed here; the commit
        // pipeline re-reads the head per attempt but keeps these bytes.
        let head = self
            .remote
            .read_ref(&self.config.branch)
            .await?
            .ok_or_else(|| UploadError::BranchMissing {
                branch: self.config.branch.clone(),
            })?;
        let entry = FileEntry::for_upload(
            &resolved.path,
            request.content_type.clone(),
            Utc::now(),
        );
        let (_, manifest_bytes) = self.manifest.updated_for(&head, entry).await?;

        let mut changes = ChangeSet::new();
        changes.put(resolved.path.clone(), request.content);
        changes.put(self.config.manifest_path.clone(), manifest_bytes);

        let verb = if resolved.replaces.is_some() { "replace" } else { "upload" };
        let message = format!("{verb} {}", resolved.path);
        let outcome = self.coordinator.commit(&changes, &message).await?;

        info!(
            path = %resolved.path,
            commit = %outcome.commit.short(),
            attempts = outcome.attempts,
            "artifact uploaded"
        );
        Ok(UploadOutcome {
            raw_url: self.config.raw_url(&resolved.path),
            path: resolved.path,
            commit: outcome.commit,
        })
    }
}
