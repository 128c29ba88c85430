//! Final-path resolution for artifact uploads.
//!
//! Given an already-sanitized directory and filename plus an overwrite
//! flag, the resolver decides where the artifact lands in the repository.
//! Without overwrite it probes the current branch head for an existing
//! object and, on a hit, prepends a timestamp-plus-random prefix to the
//! filename. The probe and the eventual commit are two separate steps, so
//! two concurrent resolvers can in principle draw the same prefix; this is
//! an accepted probabilistic weakness, not a guarantee.

pub mod error;
pub mod resolver;

pub use error::{ResolveError, ResolveResult};
pub use resolver::{ensure_extension, PathResolver, ResolvedPath};
