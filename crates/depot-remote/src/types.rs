//! Core object-model types shared by all remote backends.

use serde::{Deserialize, Serialize};

/// Content-addressed identifier of a remote object (blob, tree, or commit).
///
/// The remote assigns ids; this side treats them as opaque lowercase hex
/// strings and never recomputes them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap a raw identifier string as received from the remote.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A shortened prefix for log output.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The kind of object a path resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content (file contents).
    Blob,
    /// Directory listing.
    Tree,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

/// File mode for a tree entry, carried as a POSIX mode string on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (100644).
    Regular,
    /// Executable file (100755).
    Executable,
    /// Symbolic link (120000).
    Symlink,
    /// Subtree / directory (040000).
    Directory,
}

impl EntryMode {
    /// The wire representation ("100644" etc.).
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Directory => "040000",
        }
    }

    /// Parse from the wire representation.
    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "100644" => Some(Self::Regular),
            "100755" => Some(Self::Executable),
            "120000" => Some(Self::Symlink),
            "040000" | "40000" => Some(Self::Directory),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// A commit as read back from the remote: its tree and parent chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit's own identifier.
    pub id: ObjectId,
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Parent commit ids, in order. Empty for a root commit.
    pub parents: Vec<ObjectId>,
}

/// What a repository path points at within a given commit's tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathObject {
    /// Blob for a file, tree for a directory.
    pub kind: ObjectKind,
    /// Identifier of the referenced object.
    pub id: ObjectId,
}

impl PathObject {
    /// Returns `true` if the path refers to a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == ObjectKind::Blob
    }
}

/// One override entry when building a tree on top of a base tree.
///
/// Paths are repository-relative, slash-separated, with no leading or
/// trailing separator. Entries not named here are inherited from the base
/// tree unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeWriteEntry {
    /// Full repository-relative path of the entry.
    pub path: String,
    /// File mode for the entry.
    pub mode: EntryMode,
    /// Blob id the path should point at.
    pub blob: ObjectId,
}

impl TreeWriteEntry {
    /// A regular-file entry at `path` pointing at `blob`.
    pub fn file(path: impl Into<String>, blob: ObjectId) -> Self {
        Self {
            path: path.into(),
            mode: EntryMode::Regular,
            blob,
        }
    }
}
