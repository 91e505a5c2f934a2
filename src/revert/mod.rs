//! revert
//!
//! Roll a template repository's tracked branch back by one commit.
//!
//! # Algorithm
//!
//! [`RefResolver::revert_tip`]:
//!
//! 1. Parse `owner/name` from the resource's template URI
//! 2. Read the access token from the resource's credential secret
//! 3. Take the per-repository lock (reject if a revert is in flight)
//! 4. Read the configured branch's ref, or list refs and take the first
//! 5. Fetch the commit the ref points at
//! 6. Force-update the ref to that commit's *first* parent
//! 7. Optionally read the ref back and check it moved
//!
//! Steps 1 and 2 fail with `RevertError::Config` before any git host
//! call. A root commit fails with `RevertError::Precondition` and no update
//! is sent.
//!
//! # Idempotence
//!
//! None. Each successful call moves the ref back one more commit, which is
//! why concurrent calls for the same repository are rejected rather than
//! queued. Never retry blindly after a `Remote` error from `update ref`:
//! the update may have landed.

mod locks;

pub use locks::{RevertGuard, RevertLocks};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::Instrument;

use crate::core::config::{Config, DEFAULT_TOKEN_KEY};
use crate::core::types::{GitOpsConfig, GitRepositoryRef, ObjectSha, RefName};
use crate::forge::{Commit, ForgeError, GitHost, GitRef, HostConnector, UpdateRefRequest};
use crate::secrets::{CredentialSource, SecretError, SecretRef};

/// Broad category of a [`RevertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertErrorKind {
    Config,
    Precondition,
    Remote,
    Busy,
    Unconverged,
}

/// Errors from [`RefResolver::revert_tip`].
#[derive(Debug, Error)]
pub enum RevertError {
    /// Bad URI, missing secret, missing or empty token.
    #[error("configuration error: {0}")]
    Config(String),

    /// The credential store could not be read.
    #[error("configuration error: cannot read credential secret {secret}: {source}")]
    Credentials {
        secret: SecretRef,
        #[source]
        source: SecretError,
    },

    /// The remote state does not allow a revert.
    #[error("cannot revert {repository}: {reason}")]
    Precondition {
        repository: GitRepositoryRef,
        reason: String,
    },

    /// A git host call failed.
    #[error("{operation} failed for {repository}: {source}")]
    Remote {
        repository: GitRepositoryRef,
        operation: &'static str,
        #[source]
        source: ForgeError,
    },

    /// Another revert of the same repository is in flight.
    #[error("a revert of {0} is already in progress")]
    Busy(GitRepositoryRef),

    /// Read-back after the update did not show the target.
    #[error("{ref_name} in {repository} is at {actual} after update, expected {expected}")]
    Unconverged {
        repository: GitRepositoryRef,
        ref_name: RefName,
        expected: ObjectSha,
        actual: ObjectSha,
    },
}

impl RevertError {
    pub fn kind(&self) -> RevertErrorKind {
        match self {
            RevertError::Config(_) | RevertError::Credentials { .. } => RevertErrorKind::Config,
            RevertError::Precondition { .. } => RevertErrorKind::Precondition,
            RevertError::Remote { .. } => RevertErrorKind::Remote,
            RevertError::Busy(_) => RevertErrorKind::Busy,
            RevertError::Unconverged { .. } => RevertErrorKind::Unconverged,
        }
    }
}

/// The revert computed for one call: the ref, its commit, and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertOperation {
    pub current_ref: GitRef,
    pub current_commit: Commit,
    pub target: ObjectSha,
}

impl RevertOperation {
    /// Plan a first-parent revert of `current_ref`.
    ///
    /// Returns `None` for a root commit.
    pub fn plan(current_ref: GitRef, current_commit: Commit) -> Option<Self> {
        let target = current_commit.first_parent()?.clone();
        Some(Self {
            current_ref,
            current_commit,
            target,
        })
    }

    pub fn request(&self) -> UpdateRefRequest {
        UpdateRefRequest::forced(self.current_ref.name.clone(), self.target.clone())
    }
}

/// A completed revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertOutcome {
    pub repository: GitRepositoryRef,
    pub ref_name: RefName,
    pub from: ObjectSha,
    pub to: ObjectSha,
    pub reverted_at: DateTime<Utc>,
}

/// Knobs for [`RefResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertOptions {
    /// Branch to revert; `None` takes the first ref the host lists.
    pub branch: Option<String>,
    /// Re-read the ref after updating it.
    pub verify_update: bool,
    /// Key of the token inside the credential secret.
    pub token_key: String,
}

impl Default for RevertOptions {
    fn default() -> Self {
        Self {
            branch: None,
            verify_update: false,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
        }
    }
}

impl RevertOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            branch: config.revert_branch().map(String::from),
            verify_update: config.verify_update(),
            token_key: config.token_key().to_string(),
        }
    }
}

/// Moves a template repository's tracked ref back to its first parent.
pub struct RefResolver {
    connector: Arc<dyn HostConnector>,
    credentials: Arc<dyn CredentialSource>,
    locks: RevertLocks,
    options: RevertOptions,
    span: tracing::Span,
}

impl std::fmt::Debug for RefResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RefResolver {
    pub fn new(connector: Arc<dyn HostConnector>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            connector,
            credentials,
            locks: RevertLocks::new(),
            options: RevertOptions::default(),
            span: tracing::info_span!("revert"),
        }
    }

    /// Share a lock registry with other resolvers.
    pub fn with_locks(mut self, locks: RevertLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_options(mut self, options: RevertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn locks(&self) -> &RevertLocks {
        &self.locks
    }

    pub fn options(&self) -> &RevertOptions {
        &self.options
    }

    /// Revert the tracked branch of `config`'s template repository by one
    /// commit.
    ///
    /// # Errors
    ///
    /// - `Config` / `Credentials` before any git host call
    /// - `Busy` if a revert of the same repository is in flight
    /// - `Precondition` for an empty ref list, a missing branch or a root commit
    /// - `Remote` when a git host call fails
    /// - `Unconverged` when read-back is enabled and the ref did not move
    pub async fn revert_tip(&self, config: &GitOpsConfig) -> Result<RevertOutcome, RevertError> {
        let span = self.span.clone();
        async {
            let repository = GitRepositoryRef::parse(&config.template_source.uri)
                .map_err(|e| RevertError::Config(e.to_string()))?;
            tracing::info!(%repository, resource = %config.name, "reverting template repository");

            let token = self.resolve_token(config).await?;
            let host = self
                .connector
                .connect(&repository, &token)
                .map_err(|e| RevertError::Config(format!("cannot create client for {}: {}", repository, e)))?;

            let _guard = self
                .locks
                .try_acquire(&repository)
                .ok_or_else(|| RevertError::Busy(repository.clone()))?;

            self.revert_locked(host.as_ref(), &repository).await
        }
        .instrument(span)
        .await
    }

    async fn resolve_token(&self, config: &GitOpsConfig) -> Result<String, RevertError> {
        let secret_name = config
            .template_source
            .secret_ref
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RevertError::Config(format!(
                    "{}/{} has no templateSource.secretRef",
                    config.namespace, config.name
                ))
            })?;
        let secret = SecretRef::new(&config.namespace, secret_name);
        let key = self.options.token_key.as_str();

        let token = self
            .credentials
            .get(&secret, key)
            .await
            .map_err(|source| RevertError::Credentials {
                secret: secret.clone(),
                source,
            })?;

        match token {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Some(_) => Err(RevertError::Config(format!(
                "key '{}' in secret {} is empty",
                key, secret
            ))),
            None => Err(RevertError::Config(format!(
                "secret {} has no key '{}'",
                secret, key
            ))),
        }
    }

    async fn revert_locked(
        &self,
        host: &dyn GitHost,
        repository: &GitRepositoryRef,
    ) -> Result<RevertOutcome, RevertError> {
        let remote = |operation: &'static str| {
            move |source: ForgeError| RevertError::Remote {
                repository: repository.clone(),
                operation,
                source,
            }
        };

        let current_ref = self.resolve_ref(host, repository).await?;
        tracing::debug!(ref_name = %current_ref.name, sha = %current_ref.sha, "selected ref");

        let commit = host
            .get_commit(&current_ref.sha)
            .await
            .map_err(remote("get commit"))?;
        if commit.is_merge() {
            tracing::debug!(sha = %commit.sha, parents = commit.parents.len(), "tip is a merge, following first parent");
        }

        let operation = RevertOperation::plan(current_ref, commit).ok_or_else(|| {
            RevertError::Precondition {
                repository: repository.clone(),
                reason: "tip commit has no parent".to_string(),
            }
        })?;

        host.update_ref(operation.request())
            .await
            .map_err(remote("update ref"))?;

        if self.options.verify_update {
            let after = host
                .get_ref(&operation.current_ref.name)
                .await
                .map_err(remote("read back ref"))?;
            if after.sha != operation.target {
                return Err(RevertError::Unconverged {
                    repository: repository.clone(),
                    ref_name: operation.current_ref.name.clone(),
                    expected: operation.target.clone(),
                    actual: after.sha,
                });
            }
        }

        tracing::info!(
            %repository,
            ref_name = %operation.current_ref.name,
            from = %operation.current_ref.sha,
            to = %operation.target,
            "reverted"
        );

        Ok(RevertOutcome {
            repository: repository.clone(),
            ref_name: operation.current_ref.name,
            from: operation.current_ref.sha,
            to: operation.target,
            reverted_at: Utc::now(),
        })
    }

    /// The ref to move: the configured branch, read directly, or else the
    /// first ref the host lists.
    async fn resolve_ref(
        &self,
        host: &dyn GitHost,
        repository: &GitRepositoryRef,
    ) -> Result<GitRef, RevertError> {
        let precondition = |reason: String| RevertError::Precondition {
            repository: repository.clone(),
            reason,
        };
        let remote = |operation: &'static str| {
            move |source: ForgeError| RevertError::Remote {
                repository: repository.clone(),
                operation,
                source,
            }
        };

        match self.options.branch.as_deref() {
            Some(branch) => {
                let wanted = RefName::for_branch(branch).map_err(|e| RevertError::Config(e.to_string()))?;
                match host.get_ref(&wanted).await {
                    Ok(found) => Ok(found),
                    Err(ForgeError::NotFound(_)) => {
                        Err(precondition(format!("{} does not exist", wanted)))
                    }
                    Err(e) => Err(remote("get ref")(e)),
                }
            }
            None => host
                .list_refs()
                .await
                .map_err(remote("list refs"))?
                .into_iter()
                .next()
                .ok_or_else(|| precondition("repository has no refs".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockGitHost, MockOperation};
    use crate::secrets::StaticCredentials;

    const URI: &str = "https://github.com/acme/templates";

    fn config() -> GitOpsConfig {
        GitOpsConfig::new("templates", "team-a", URI, Some("gh-token".into()))
    }

    fn credentials() -> StaticCredentials {
        StaticCredentials::new().with_secret("team-a", "gh-token", "token", "ghp_test")
    }

    fn resolver(host: &MockGitHost, creds: StaticCredentials) -> RefResolver {
        RefResolver::new(Arc::new(host.clone()), Arc::new(creds))
    }

    fn sha(s: &str) -> ObjectSha {
        ObjectSha::new(s).unwrap()
    }

    #[tokio::test]
    async fn reverts_to_first_parent_with_force() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "abc123")
            .with_commit("abc123", &["def456"]);

        let outcome = resolver(&host, credentials()).revert_tip(&config()).await.unwrap();

        assert_eq!(outcome.from, sha("abc123"));
        assert_eq!(outcome.to, sha("def456"));
        assert_eq!(outcome.ref_name.as_str(), "refs/heads/main");
        assert_eq!(host.ref_sha("refs/heads/main").as_deref(), Some("def456"));
        assert_eq!(
            host.api_calls(),
            vec![
                MockOperation::ListRefs,
                MockOperation::GetCommit { sha: "abc123".into() },
                MockOperation::UpdateRef {
                    name: "refs/heads/main".into(),
                    sha: "def456".into(),
                    force: true,
                },
            ]
        );
    }

    #[tokio::test]
    async fn merge_commit_follows_first_parent() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "aaa111")
            .with_commit("aaa111", &["bbb222", "ccc333"]);

        let outcome = resolver(&host, credentials()).revert_tip(&config()).await.unwrap();
        assert_eq!(outcome.to, sha("bbb222"));
    }

    #[tokio::test]
    async fn root_commit_is_precondition_without_update() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "abc123")
            .with_commit("abc123", &[]);

        let err = resolver(&host, credentials()).revert_tip(&config()).await.unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Precondition);
        assert!(!host
            .api_calls()
            .iter()
            .any(|op| matches!(op, MockOperation::UpdateRef { .. })));
    }

    #[tokio::test]
    async fn empty_ref_list_is_precondition() {
        let host = MockGitHost::new("acme", "templates");
        let err = resolver(&host, credentials()).revert_tip(&config()).await.unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Precondition);
        assert_eq!(host.api_calls(), vec![MockOperation::ListRefs]);
    }

    #[tokio::test]
    async fn missing_secret_ref_is_config_error_without_calls() {
        let host = MockGitHost::new("acme", "templates").with_ref("refs/heads/main", "abc123");
        let mut cfg = config();
        cfg.template_source.secret_ref = None;

        let err = resolver(&host, credentials()).revert_tip(&cfg).await.unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Config);
        assert!(host.operations().is_empty());
    }

    #[tokio::test]
    async fn absent_secret_is_config_error_without_calls() {
        let host = MockGitHost::new("acme", "templates").with_ref("refs/heads/main", "abc123");
        let err = resolver(&host, StaticCredentials::new())
            .revert_tip(&config())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Config);
        assert!(host.operations().is_empty());
    }

    #[tokio::test]
    async fn blank_token_is_config_error() {
        let host = MockGitHost::new("acme", "templates").with_ref("refs/heads/main", "abc123");
        let creds = StaticCredentials::new().with_secret("team-a", "gh-token", "token", "  ");
        let err = resolver(&host, creds).revert_tip(&config()).await.unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Config);
        assert!(host.operations().is_empty());
    }

    #[tokio::test]
    async fn bad_uri_is_config_error_before_secret_lookup() {
        let host = MockGitHost::new("acme", "templates");
        let creds = credentials();
        let cfg = GitOpsConfig::new("templates", "team-a", "templates", Some("gh-token".into()));
        let err = resolver(&host, creds.clone()).revert_tip(&cfg).await.unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Config);
        assert!(creds.lookups().is_empty());
        assert!(host.operations().is_empty());
    }

    #[tokio::test]
    async fn remote_error_names_repository_and_operation() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "abc123")
            .with_commit("abc123", &["def456"])
            .fail_on(FailOn::UpdateRef(ForgeError::ApiError {
                status: 422,
                message: "Reference update failed".into(),
            }));

        let err = resolver(&host, credentials()).revert_tip(&config()).await.unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Remote);
        let message = err.to_string();
        assert!(message.contains("acme/templates"));
        assert!(message.contains("update ref"));
    }

    #[tokio::test]
    async fn explicit_branch_is_selected() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/feature", "fff000")
            .with_ref("refs/heads/main", "abc123")
            .with_commit("abc123", &["def456"]);
        let options = RevertOptions {
            branch: Some("main".into()),
            ..Default::default()
        };

        let outcome = resolver(&host, credentials())
            .with_options(options)
            .revert_tip(&config())
            .await
            .unwrap();
        assert_eq!(outcome.ref_name.as_str(), "refs/heads/main");
        assert_eq!(host.ref_sha("refs/heads/feature").as_deref(), Some("fff000"));
        assert_eq!(
            host.api_calls()[0],
            MockOperation::GetRef {
                name: "refs/heads/main".into()
            }
        );
        assert!(!host.api_calls().contains(&MockOperation::ListRefs));
    }

    #[tokio::test]
    async fn missing_explicit_branch_is_precondition() {
        let host = MockGitHost::new("acme", "templates").with_ref("refs/heads/main", "abc123");
        let options = RevertOptions {
            branch: Some("release".into()),
            ..Default::default()
        };
        let err = resolver(&host, credentials())
            .with_options(options)
            .revert_tip(&config())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Precondition);
        assert!(err.to_string().contains("refs/heads/release"));
    }

    #[tokio::test]
    async fn explicit_branch_lookup_failure_is_remote() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "abc123")
            .fail_on(FailOn::GetRef(ForgeError::RateLimited));
        let options = RevertOptions {
            branch: Some("main".into()),
            ..Default::default()
        };
        let err = resolver(&host, credentials())
            .with_options(options)
            .revert_tip(&config())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Remote);
        assert!(err.to_string().contains("get ref"));
    }

    #[tokio::test]
    async fn read_back_detects_unmoved_ref() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "abc123")
            .with_commit("abc123", &["def456"])
            .ignoring_updates();
        let options = RevertOptions {
            verify_update: true,
            ..Default::default()
        };

        let err = resolver(&host, credentials())
            .with_options(options)
            .revert_tip(&config())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Unconverged);
    }

    #[tokio::test]
    async fn read_back_passes_when_ref_moved() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "abc123")
            .with_commit("abc123", &["def456"]);
        let options = RevertOptions {
            verify_update: true,
            ..Default::default()
        };

        resolver(&host, credentials())
            .with_options(options)
            .revert_tip(&config())
            .await
            .unwrap();
        assert!(matches!(
            host.api_calls().last(),
            Some(MockOperation::GetRef { .. })
        ));
    }

    #[tokio::test]
    async fn in_flight_revert_rejects_second_call() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "abc123")
            .with_commit("abc123", &["def456"]);
        let locks = RevertLocks::new();
        let repository = GitRepositoryRef::new("acme", "templates").unwrap();
        let _held = locks.try_acquire(&repository).unwrap();

        let err = resolver(&host, credentials())
            .with_locks(locks)
            .revert_tip(&config())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), RevertErrorKind::Busy);
        assert!(host.api_calls().is_empty());
    }

    #[tokio::test]
    async fn second_revert_moves_one_more_commit() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "ccc333")
            .with_commit("ccc333", &["bbb222"])
            .with_commit("bbb222", &["aaa111"]);
        let resolver = resolver(&host, credentials());

        resolver.revert_tip(&config()).await.unwrap();
        let second = resolver.revert_tip(&config()).await.unwrap();
        assert_eq!(second.to, sha("aaa111"));
    }
}
