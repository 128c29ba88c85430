//! The [`ChangeSet`]: the unit of work the coordinator commits atomically.

use std::collections::BTreeMap;

/// An ordered mapping of repository paths to new byte content.
///
/// For an upload this holds at minimum the artifact and the updated
/// manifest document. Paths are repository-relative, slash-separated, with
/// no leading or trailing separator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl ChangeSet {
    /// An empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the content for `path`.
    pub fn put(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Number of paths in the change-set.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no paths have been added.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over `(path, content)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_slice()))
    }

    /// The paths in this change-set, in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}
