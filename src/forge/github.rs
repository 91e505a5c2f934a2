//! forge::github
//!
//! GitHub git-data implementation of [`GitHost`] using the REST API.
//!
//! # Endpoints
//!
//! - `GET   /repos/{owner}/{repo}/git/refs` - list refs
//! - `GET   /repos/{owner}/{repo}/git/ref/{ref}` - read one ref
//! - `GET   /repos/{owner}/{repo}/git/commits/{sha}` - read a commit
//! - `PATCH /repos/{owner}/{repo}/git/refs/{ref}` - move a ref (`force` allowed)
//!
//! `{ref}` is the ref name without its leading `refs/`.
//!
//! # Authentication
//!
//! A static bearer token, resolved by the caller from the cluster secret
//! store. The token never appears in `Debug` output or errors.
//!
//! # Rate Limiting
//!
//! Returns `ForgeError::RateLimited` on 429. No automatic retry.
//! A 403 is `ForgeError::PermissionDenied`, with GitHub's required
//! permissions appended when the response names them.
//!
//! # Example
//!
//! ```ignore
//! use gitops_guard::core::types::GitRepositoryRef;
//! use gitops_guard::forge::github::GitHubHost;
//! use gitops_guard::forge::GitHost;
//!
//! let repo = GitRepositoryRef::parse("https://github.com/acme/templates")?;
//! let host = GitHubHost::new("ghp_xxx", repo);
//! let refs = host.list_refs().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::traits::{Commit, ForgeError, GitHost, GitRef, HostConnector, UpdateRefRequest};
use crate::core::config::{DEFAULT_API_BASE, DEFAULT_USER_AGENT};
use crate::core::types::{GitRepositoryRef, ObjectSha, RefName};

/// GitHub host bound to one repository.
pub struct GitHubHost {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// Repository this host operates on
    repository: GitRepositoryRef,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    /// User-Agent header value
    user_agent: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubHost")
            .field("has_token", &!self.token.is_empty())
            .field("repository", &self.repository)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubHost {
    /// Create a host for `repository` against `api.github.com`.
    pub fn new(token: impl Into<String>, repository: GitRepositoryRef) -> Self {
        Self::with_client(
            Client::new(),
            token,
            repository,
            DEFAULT_API_BASE,
            DEFAULT_USER_AGENT,
        )
    }

    /// Create a host against a custom API base URL (GitHub Enterprise, tests).
    pub fn with_api_base(
        token: impl Into<String>,
        repository: GitRepositoryRef,
        api_base: impl Into<String>,
    ) -> Self {
        Self::with_client(
            Client::new(),
            token,
            repository,
            api_base,
            DEFAULT_USER_AGENT,
        )
    }

    fn with_client(
        client: Client,
        token: impl Into<String>,
        repository: GitRepositoryRef,
        api_base: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token: token.into(),
            repository,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let agent = HeaderValue::from_str(&self.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(USER_AGENT, agent);
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    ///
    /// Each segment is percent-encoded, so ref names containing `#` or `%`
    /// stay inside the path.
    fn repo_url(&self, segments: &[&str]) -> Result<Url, ForgeError> {
        let invalid = |reason: String| ForgeError::NetworkError(format!("invalid API base '{}': {}", self.api_base, reason));
        let mut url = Url::parse(&self.api_base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["repos", self.repository.owner(), self.repository.name()])
            .extend(segments);
        Ok(url)
    }

    /// URL for `git/{endpoint}/{ref without refs/}`.
    fn ref_url(&self, endpoint: &str, name: &RefName) -> Result<Url, ForgeError> {
        let mut segments = vec!["git", endpoint];
        segments.extend(name.api_path().split('/'));
        self.repo_url(&segments)
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        // Read permission hints before the body consumes the response.
        let required_permissions = response
            .headers()
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        tracing::debug!(status = status.as_u16(), %message, "github request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN => {
                let mut err_msg = message;
                if let Some(perms) = required_permissions {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                }
                ForgeError::PermissionDenied(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl GitHost for GitHubHost {
    fn name(&self) -> &'static str {
        "github"
    }

    fn repository(&self) -> &GitRepositoryRef {
        &self.repository
    }

    async fn list_refs(&self) -> Result<Vec<GitRef>, ForgeError> {
        let url = self.repo_url(&["git", "refs"])?;
        tracing::debug!(%url, "listing refs");

        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let refs: Vec<GitHubRef> = self.handle_response(response).await?;
        refs.into_iter().map(GitRef::try_from).collect()
    }

    async fn get_ref(&self, name: &RefName) -> Result<GitRef, ForgeError> {
        let url = self.ref_url("ref", name)?;
        tracing::debug!(%url, "reading ref");

        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let gh_ref: GitHubRef = self.handle_response(response).await?;
        gh_ref.try_into()
    }

    async fn get_commit(&self, sha: &ObjectSha) -> Result<Commit, ForgeError> {
        let url = self.repo_url(&["git", "commits", sha.as_str()])?;
        tracing::debug!(%url, "reading commit");

        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let commit: GitHubCommit = self.handle_response(response).await?;
        commit.try_into()
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<GitRef, ForgeError> {
        let url = self.ref_url("refs", &request.name)?;
        tracing::debug!(%url, sha = %request.sha, force = request.force, "updating ref");

        let body = UpdateRefBody {
            sha: request.sha.as_str(),
            force: request.force,
        };

        let response = self
            .client
            .patch(url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let gh_ref: GitHubRef = self.handle_response(response).await?;
        gh_ref.try_into()
    }
}

/// Connector producing [`GitHubHost`] values that share one HTTP client.
#[derive(Debug, Clone)]
pub struct GitHubConnector {
    client: Client,
    api_base: String,
    user_agent: String,
}

impl GitHubConnector {
    /// Create a connector for an API base URL.
    pub fn new(api_base: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Create a connector from loaded configuration.
    pub fn from_config(config: &crate::core::config::Config) -> Self {
        Self::new(config.api_base(), config.user_agent())
    }

    /// The API base URL hosts will use.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

impl Default for GitHubConnector {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_USER_AGENT)
    }
}

impl HostConnector for GitHubConnector {
    fn connect(
        &self,
        repository: &GitRepositoryRef,
        token: &str,
    ) -> Result<Arc<dyn GitHost>, ForgeError> {
        if token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }
        Ok(Arc::new(GitHubHost::with_client(
            self.client.clone(),
            token,
            repository.clone(),
            self.api_base.clone(),
            self.user_agent.clone(),
        )))
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Ref as returned by the git-data API.
#[derive(Debug, Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
    object: GitHubObject,
}

/// Object pointer inside refs and commit parents.
#[derive(Debug, Deserialize)]
struct GitHubObject {
    sha: String,
}

/// Commit as returned by the git-data API.
#[derive(Debug, Deserialize)]
struct GitHubCommit {
    sha: String,
    #[serde(default)]
    parents: Vec<GitHubObject>,
    #[serde(default)]
    message: Option<String>,
}

/// Error response body.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

fn malformed(what: &str, err: impl std::fmt::Display) -> ForgeError {
    ForgeError::ApiError {
        status: 200,
        message: format!("malformed {} in response: {}", what, err),
    }
}

impl TryFrom<GitHubRef> for GitRef {
    type Error = ForgeError;

    fn try_from(gh: GitHubRef) -> Result<Self, Self::Error> {
        Ok(GitRef {
            name: RefName::new(gh.ref_name).map_err(|e| malformed("ref", e))?,
            sha: ObjectSha::new(gh.object.sha).map_err(|e| malformed("ref", e))?,
        })
    }
}

impl TryFrom<GitHubCommit> for Commit {
    type Error = ForgeError;

    fn try_from(gh: GitHubCommit) -> Result<Self, Self::Error> {
        let parents = gh
            .parents
            .into_iter()
            .map(|p| ObjectSha::new(p.sha).map_err(|e| malformed("commit parent", e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Commit {
            sha: ObjectSha::new(gh.sha).map_err(|e| malformed("commit", e))?,
            parents,
            message: gh.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> GitRepositoryRef {
        GitRepositoryRef::new("acme", "templates").unwrap()
    }

    #[test]
    fn new_binds_repository() {
        let host = GitHubHost::new("token", repo());
        assert_eq!(host.name(), "github");
        assert_eq!(host.repository().to_string(), "acme/templates");
        assert_eq!(host.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn repo_url_format() {
        let host = GitHubHost::new("token", repo());
        assert_eq!(
            host.repo_url(&["git", "refs"]).unwrap().as_str(),
            "https://api.github.com/repos/acme/templates/git/refs"
        );
    }

    #[test]
    fn api_base_trailing_slash_trimmed() {
        let host = GitHubHost::with_api_base("token", repo(), "https://ghe.example.com/api/v3/");
        assert_eq!(
            host.repo_url(&["git", "refs"]).unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/acme/templates/git/refs"
        );
    }

    #[test]
    fn ref_url_encodes_each_segment() {
        let host = GitHubHost::new("token", repo());
        let name = RefName::new("refs/heads/feat#1%done").unwrap();
        assert_eq!(
            host.ref_url("refs", &name).unwrap().as_str(),
            "https://api.github.com/repos/acme/templates/git/refs/heads/feat%231%25done"
        );
        let nested = RefName::new("refs/heads/team/fix").unwrap();
        assert_eq!(
            host.ref_url("ref", &nested).unwrap().path(),
            "/repos/acme/templates/git/ref/heads/team/fix"
        );
    }

    #[test]
    fn unparseable_api_base_is_an_error() {
        let host = GitHubHost::with_api_base("token", repo(), "not a url");
        assert!(matches!(
            host.repo_url(&["git", "refs"]),
            Err(ForgeError::NetworkError(_))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let host = GitHubHost::new("secret_token_abc123", repo());
        let debug_output = format!("{:?}", host);
        assert!(!debug_output.contains("secret_token_abc123"));
        assert!(debug_output.contains("has_token"));
    }

    #[test]
    fn empty_token_requires_auth() {
        let host = GitHubHost::new("", repo());
        assert_eq!(host.headers().unwrap_err(), ForgeError::AuthRequired);

        let connector = GitHubConnector::default();
        assert!(matches!(
            connector.connect(&repo(), ""),
            Err(ForgeError::AuthRequired)
        ));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let host = GitHubHost::new("abc\ndef", repo());
        assert!(matches!(host.headers(), Err(ForgeError::AuthFailed(_))));
    }

    #[test]
    fn connector_builds_bound_host() {
        let connector = GitHubConnector::new("http://localhost:9999", "test-agent");
        let host = connector.connect(&repo(), "token").unwrap();
        assert_eq!(host.repository(), &repo());
        assert_eq!(connector.api_base(), "http://localhost:9999");
    }

    mod conversions {
        use super::*;

        #[test]
        fn ref_from_json() {
            let json = r#"{
                "ref": "refs/heads/main",
                "node_id": "MDM6UmVmcmVmcy9oZWFkcy9mZWF0dXJlQQ==",
                "url": "https://api.github.com/repos/acme/templates/git/refs/heads/main",
                "object": { "type": "commit", "sha": "abc123", "url": "https://example" }
            }"#;
            let gh: GitHubRef = serde_json::from_str(json).unwrap();
            let git_ref = GitRef::try_from(gh).unwrap();
            assert_eq!(git_ref.name.as_str(), "refs/heads/main");
            assert_eq!(git_ref.sha.as_str(), "abc123");
        }

        #[test]
        fn commit_from_json_keeps_parent_order() {
            let json = r#"{
                "sha": "abc123",
                "message": "Merge pull request #7",
                "parents": [ { "sha": "def456", "url": "u1" }, { "sha": "fed987", "url": "u2" } ]
            }"#;
            let gh: GitHubCommit = serde_json::from_str(json).unwrap();
            let commit = Commit::try_from(gh).unwrap();
            assert_eq!(commit.parents[0].as_str(), "def456");
            assert_eq!(commit.parents[1].as_str(), "fed987");
            assert_eq!(commit.message.as_deref(), Some("Merge pull request #7"));
        }

        #[test]
        fn root_commit_has_no_parents() {
            let gh: GitHubCommit = serde_json::from_str(r#"{ "sha": "abc123" }"#).unwrap();
            let commit = Commit::try_from(gh).unwrap();
            assert!(commit.is_root());
        }

        #[test]
        fn malformed_sha_is_an_api_error() {
            let gh = GitHubRef {
                ref_name: "refs/heads/main".into(),
                object: GitHubObject {
                    sha: "zzz".into(),
                },
            };
            let err = GitRef::try_from(gh).unwrap_err();
            assert!(err.to_string().contains("malformed ref"));
        }
    }
}
