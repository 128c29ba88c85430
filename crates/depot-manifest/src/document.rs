//! Manifest document and entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::version::bump_version;

/// One uploaded artifact recorded in the manifest.
///
/// Immutable once written; the manifest as a whole is replaced, never
/// patched in place. `dir` and `path` are absolute within the repository
/// and carry a leading slash; the repository root is `"/"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Directory the artifact lives in, leading slash (e.g. "/images").
    pub dir: String,
    /// Final file name (e.g. "photo.png").
    pub name: String,
    /// Full path, leading slash (e.g. "/images/photo.png").
    pub path: String,
    /// Declared content type of the upload. Advisory only, may be absent.
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    /// Free-form description. Empty on upload.
    pub description: String,
    /// When the upload happened.
    pub uploaded_at: DateTime<Utc>,
}

impl FileEntry {
    /// Build an entry for a freshly resolved repository path.
    ///
    /// `final_path` is repository-relative with no leading slash; the
    /// leading slashes of `dir` and `path` are added here and nowhere else.
    pub fn for_upload(
        final_path: &str,
        content_type: Option<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        let (dir, name) = match final_path.rsplit_once('/') {
            Some((dir, name)) => (format!("/{dir}"), name.to_string()),
            None => ("/".to_string(), final_path.to_string()),
        };
        Self {
            dir,
            name,
            path: format!("/{final_path}"),
            content_type,
            description: String::new(),
            uploaded_at,
        }
    }
}

/// The manifest document: a versioned, newest-first index of uploads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// "major.minor" version string. Non-decreasing; each upload bumps the
    /// minor component by one.
    pub version: String,
    /// When this document was produced.
    pub generated_at: DateTime<Utc>,
    /// All recorded uploads, most recent first.
    pub files: Vec<FileEntry>,
}

impl Manifest {
    /// The initial document used when no manifest exists yet (or the stored
    /// one is undecodable).
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            version: "1".to_string(),
            generated_at: now,
            files: Vec::new(),
        }
    }

    /// Decode stored bytes, falling back to [`Manifest::initial`].
    ///
    /// Manifest corruption is self-healing by replacement, so a decode
    /// failure is logged and swallowed, never returned.
    pub fn decode_or_initial(bytes: &[u8], now: DateTime<Utc>) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(error = %e, "stored manifest undecodable, reinitializing");
                Self::initial(now)
            }
        }
    }

    /// Record an upload: prepend the entry, bump the minor version, refresh
    /// `generated_at`.
    pub fn record_upload(&mut self, entry: FileEntry, now: DateTime<Utc>) {
        self.files.insert(0, entry);
        self.version = bump_version(Some(&self.version));
        self.generated_at = now;
    }

    /// Serialize deterministically: stable field order, pretty-printed,
    /// trailing newline. Identical content always yields identical bytes,
    /// which keeps the stored blob content-addressable.
    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
