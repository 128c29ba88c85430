//! Read-modify-write protocol for the stored manifest.

use std::sync::Arc;

use chrono::Utc;
use depot_remote::{ObjectId, RemoteError, RemoteObjectStore};
use tracing::debug;

use crate::document::{FileEntry, Manifest};
use crate::error::ManifestResult;

/// Produces the updated manifest document for inclusion in a change-set.
///
/// The engine only reads; the updated document is written by the commit
/// coordinator as part of the same atomic commit as the artifact.
pub struct ManifestEngine {
    remote: Arc<dyn RemoteObjectStore>,
    manifest_path: String,
}

impl ManifestEngine {
    /// An engine reading the manifest blob at `manifest_path`.
    pub fn new(remote: Arc<dyn RemoteObjectStore>, manifest_path: impl Into<String>) -> Self {
        Self {
            remote,
            manifest_path: manifest_path.into(),
        }
    }

    /// The repository-relative path of the manifest document.
    pub fn manifest_path(&self) -> &str {
        &self.manifest_path
    }

    /// Load the manifest as of `head`, or the initial document if it is
    /// absent or undecodable.
    ///
    /// Only remote I/O failures propagate; a missing or corrupt document is
    /// a normal "start fresh" signal.
    pub async fn load_or_default(&self, head: &ObjectId) -> ManifestResult<Manifest> {
        let now = Utc::now();
        let blob = match self.remote.read_path(head, &self.manifest_path).await? {
            Some(object) if object.is_file() => object.id,
            Some(_) => {
                // The manifest path is shadowed by a directory; treat it
                // like an absent document and replace it.
                tracing::warn!(path = %self.manifest_path, "manifest path is a directory");
                return Ok(Manifest::initial(now));
            }
            None => {
                debug!(path = %self.manifest_path, "no manifest at head, initializing");
                return Ok(Manifest::initial(now));
            }
        };
        match self.remote.read_blob(&blob).await {
            Ok(bytes) => Ok(Manifest::decode_or_initial(&bytes, now)),
            Err(RemoteError::NotFound { .. }) => Ok(Manifest::initial(now)),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the manifest at `head`, record `entry`, and return the new
    /// document's serialized bytes together with the document itself.
    pub async fn updated_for(
        &self,
        head: &ObjectId,
        entry: FileEntry,
    ) -> ManifestResult<(Manifest, Vec<u8>)> {
        let mut manifest = self.load_or_default(head).await?;
        manifest.record_upload(entry, Utc::now());
        let bytes = manifest.to_pretty_json()?;
        debug!(
            version = %manifest.version,
            entries = manifest.files.len(),
            "manifest updated"
        );
        Ok((manifest, bytes))
    }
}
