//! Upload service configuration.

use depot_commit::RetryPolicy;

/// Settings for an [`UploadService`](crate::UploadService).
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Branch all uploads commit to.
    pub branch: String,
    /// Repository-relative path of the manifest document.
    pub manifest_path: String,
    /// Base URL for raw content links, without a trailing slash
    /// (e.g. `https://raw.example.com/acme/assets/main`). Empty disables
    /// raw URLs in the outcome.
    pub raw_base_url: String,
    /// Retry policy handed to the commit coordinator.
    pub retry: RetryPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            manifest_path: "manifest.json".to_string(),
            raw_base_url: String::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl UploadConfig {
    /// The raw content URL for a committed repository path, if raw URLs
    /// are configured.
    pub fn raw_url(&self, path: &str) -> Option<String> {
        if self.raw_base_url.is_empty() {
            None
        } else {
            Some(format!("{}/{path}", self.raw_base_url))
        }
    }
}
