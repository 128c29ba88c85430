//! REST adapter for the git-data wire contract.
//!
//! Request and response bodies are JSON; blob content travels base64
//! encoded; tree entries carry POSIX mode strings; refs are addressed by
//! symbolic branch name under `refs/heads/`. Every non-2xx response is
//! classified into the [`RemoteError`] taxonomy here so the layers above
//! never see raw HTTP.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RemoteError, RemoteResult};
use crate::traits::RemoteObjectStore;
use crate::types::{CommitInfo, ObjectId, ObjectKind, PathObject, TreeWriteEntry};

/// Connection settings for a [`RestObjectStore`].
#[derive(Clone, Debug)]
pub struct RestConfig {
    /// Repository root of the remote API, without a trailing slash
    /// (e.g. `https://api.example.com/repos/acme/assets`).
    pub base_url: String,
    /// Bearer token sent on every request. Token lifecycle is the caller's
    /// concern.
    pub token: Option<String>,
    /// User-Agent header value.
    pub user_agent: String,
}

impl RestConfig {
    /// Config for the given repository root with no auth token.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            token: None,
            user_agent: concat!("depot/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Attach a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Wire bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ShaObject,
    #[serde(default)]
    parents: Vec<ShaObject>,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItemResponse>,
}

#[derive(Debug, Deserialize)]
struct TreeItemResponse {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewBlobRequest<'a> {
    content: &'a str,
    encoding: &'static str,
}

#[derive(Debug, Serialize)]
struct NewTreeRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a str>,
    tree: Vec<NewTreeEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct NewTreeEntry<'a> {
    path: &'a str,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: &'a str,
}

#[derive(Debug, Serialize)]
struct NewCommitRequest<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct RefUpdateRequest<'a> {
    sha: &'a str,
    force: bool,
}

/// Classify a non-2xx response into the error taxonomy.
///
/// 404 is a missing object, 409/422 is the remote refusing a structurally
/// conflicting write (most importantly a non-fast-forward ref move), 5xx is
/// transient, and anything else is fatal with the body kept verbatim.
fn classify_failure(status: u16, what: &str, body: String) -> RemoteError {
    match status {
        404 => RemoteError::NotFound { what: what.to_string() },
        409 | 422 => RemoteError::Conflict {
            detail: format!("{what}: {body}"),
        },
        500..=599 => RemoteError::Transient { status, detail: body },
        _ => RemoteError::Fatal { status, body },
    }
}

/// reqwest-backed [`RemoteObjectStore`] implementation.
pub struct RestObjectStore {
    client: Client,
    config: RestConfig,
}

impl RestObjectStore {
    /// Build a store over a fresh HTTP client.
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.base_url, path);
        let mut request = self
            .client
            .request(method, url)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", "application/json");
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send a request and decode a 2xx JSON body, classifying failures.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> RemoteResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), what, body));
        }
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode {
            detail: format!("{what}: {e}"),
        })
    }

    /// Same as [`Self::send`], but 404 becomes `Ok(None)`.
    async fn send_optional<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> RemoteResult<Option<T>> {
        match self.send(request, what).await {
            Ok(value) => Ok(Some(value)),
            Err(RemoteError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RemoteObjectStore for RestObjectStore {
    async fn read_ref(&self, branch: &str) -> RemoteResult<Option<ObjectId>> {
        let what = format!("refs/heads/{branch}");
        let request = self.request(Method::GET, &format!("git/ref/heads/{branch}"));
        let response: Option<RefResponse> = self.send_optional(request, &what).await?;
        Ok(response.map(|r| ObjectId::new(r.object.sha)))
    }

    async fn read_commit(&self, id: &ObjectId) -> RemoteResult<CommitInfo> {
        let what = format!("commit {id}");
        let request = self.request(Method::GET, &format!("git/commits/{id}"));
        let response: CommitResponse = self.send(request, &what).await?;
        Ok(CommitInfo {
            id: ObjectId::new(response.sha),
            tree: ObjectId::new(response.tree.sha),
            parents: response.parents.into_iter().map(|p| ObjectId::new(p.sha)).collect(),
        })
    }

    async fn read_blob(&self, id: &ObjectId) -> RemoteResult<Vec<u8>> {
        let what = format!("blob {id}");
        let request = self.request(Method::GET, &format!("git/blobs/{id}"));
        let response: BlobResponse = self.send(request, &what).await?;
        if response.encoding != "base64" {
            return Err(RemoteError::Decode {
                detail: format!("{what}: unexpected encoding {}", response.encoding),
            });
        }
        // The remote wraps base64 payloads with newlines.
        let compact: String = response.content.split_whitespace().collect();
        BASE64.decode(compact).map_err(|e| RemoteError::Decode {
            detail: format!("{what}: {e}"),
        })
    }

    async fn read_path(
        &self,
        commit: &ObjectId,
        path: &str,
    ) -> RemoteResult<Option<PathObject>> {
        let info = self.read_commit(commit).await?;
        let what = format!("tree {}", info.tree);
        let request = self.request(
            Method::GET,
            &format!("git/trees/{}?recursive=1", info.tree),
        );
        let response: TreeResponse = self.send(request, &what).await?;
        for item in response.tree {
            if item.path != path {
                continue;
            }
            let kind = match item.kind.as_str() {
                "blob" => ObjectKind::Blob,
                "tree" => ObjectKind::Tree,
                other => {
                    return Err(RemoteError::Decode {
                        detail: format!("{what}: unknown entry type {other}"),
                    })
                }
            };
            let sha = item.sha.ok_or_else(|| RemoteError::Decode {
                detail: format!("{what}: entry {path} has no sha"),
            })?;
            return Ok(Some(PathObject { kind, id: ObjectId::new(sha) }));
        }
        Ok(None)
    }

    async fn create_blob(&self, content: &[u8]) -> RemoteResult<ObjectId> {
        let encoded = BASE64.encode(content);
        let request = self
            .request(Method::POST, "git/blobs")
            .json(&NewBlobRequest { content: &encoded, encoding: "base64" });
        let response: ShaObject = self.send(request, "create blob").await?;
        debug!(blob = %response.sha, bytes = content.len(), "created blob");
        Ok(ObjectId::new(response.sha))
    }

    async fn create_tree(
        &self,
        base: Option<&ObjectId>,
        entries: &[TreeWriteEntry],
    ) -> RemoteResult<ObjectId> {
        let body = NewTreeRequest {
            base_tree: base.map(ObjectId::as_str),
            tree: entries
                .iter()
                .map(|entry| NewTreeEntry {
                    path: &entry.path,
                    mode: entry.mode.as_wire_str(),
                    kind: "blob",
                    sha: entry.blob.as_str(),
                })
                .collect(),
        };
        let request = self.request(Method::POST, "git/trees").json(&body);
        let response: ShaObject = self.send(request, "create tree").await?;
        debug!(tree = %response.sha, entries = entries.len(), "created tree");
        Ok(ObjectId::new(response.sha))
    }

    async fn create_commit(
        &self,
        tree: &ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> RemoteResult<ObjectId> {
        let body = NewCommitRequest {
            message,
            tree: tree.as_str(),
            parents: parents.iter().map(ObjectId::as_str).collect(),
        };
        let request = self.request(Method::POST, "git/commits").json(&body);
        let response: ShaObject = self.send(request, "create commit").await?;
        debug!(commit = %response.sha, "created commit");
        Ok(ObjectId::new(response.sha))
    }

    async fn update_ref(
        &self,
        branch: &str,
        expected_parent: &ObjectId,
        new_commit: &ObjectId,
    ) -> RemoteResult<()> {
        // The compare-and-swap expectation is carried by the commit itself:
        // `new_commit` names `expected_parent` as its parent, and a
        // non-forced update is rejected unless it is a fast-forward from
        // the current head. A moved head therefore comes back as Conflict.
        let what = format!("refs/heads/{branch}");
        let body = RefUpdateRequest { sha: new_commit.as_str(), force: false };
        let request = self
            .request(Method::PATCH, &format!("git/refs/heads/{branch}"))
            .json(&body);
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(
                branch,
                from = %expected_parent.short(),
                to = %new_commit.short(),
                "ref updated"
            );
            return Ok(());
        }
        let body = response.text().await?;
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound { what });
        }
        Err(classify_failure(status.as_u16(), &what, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryMode;

    #[test]
    fn classify_maps_status_families() {
        assert!(matches!(
            classify_failure(404, "blob x", String::new()),
            RemoteError::NotFound { .. }
        ));
        assert!(matches!(
            classify_failure(409, "refs/heads/main", "not a fast forward".into()),
            RemoteError::Conflict { .. }
        ));
        assert!(matches!(
            classify_failure(422, "refs/heads/main", String::new()),
            RemoteError::Conflict { .. }
        ));
        assert!(matches!(
            classify_failure(503, "create blob", String::new()),
            RemoteError::Transient { status: 503, .. }
        ));
        assert!(matches!(
            classify_failure(403, "create blob", "rate limited".into()),
            RemoteError::Fatal { status: 403, .. }
        ));
    }

    #[test]
    fn fatal_keeps_body_verbatim() {
        let err = classify_failure(403, "create blob", "secondary rate limit hit".into());
        match err {
            RemoteError::Fatal { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "secondary rate limit hit");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn tree_request_serializes_wire_contract() {
        let body = NewTreeRequest {
            base_tree: Some("abc"),
            tree: vec![NewTreeEntry {
                path: "images/photo.png",
                mode: EntryMode::Regular.as_wire_str(),
                kind: "blob",
                sha: "def",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["base_tree"], "abc");
        assert_eq!(json["tree"][0]["path"], "images/photo.png");
        assert_eq!(json["tree"][0]["mode"], "100644");
        assert_eq!(json["tree"][0]["type"], "blob");
        assert_eq!(json["tree"][0]["sha"], "def");
    }

    #[test]
    fn tree_request_omits_absent_base() {
        let body = NewTreeRequest { base_tree: None, tree: vec![] };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("base_tree").is_none());
    }

    #[test]
    fn blob_request_is_base64() {
        let encoded = BASE64.encode(b"\x00\x01binary");
        let body = NewBlobRequest { content: &encoded, encoding: "base64" };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["encoding"], "base64");
        assert_eq!(
            BASE64.decode(json["content"].as_str().unwrap()).unwrap(),
            b"\x00\x01binary"
        );
    }

    #[test]
    fn config_strips_trailing_slash() {
        let config = RestConfig::new("https://api.example.com/repos/acme/assets/");
        assert_eq!(config.base_url, "https://api.example.com/repos/acme/assets");
    }
}
