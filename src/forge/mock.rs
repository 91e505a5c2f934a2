//! forge::mock
//!
//! Mock git host for deterministic testing.
//!
//! # Design
//!
//! `MockGitHost` keeps refs and commits in memory, records every call, and
//! can be told to fail a specific operation. It also implements
//! [`HostConnector`], handing out clones of itself, so a test can hand it
//! to the resolver and afterwards inspect exactly which calls were made.
//!
//! # Example
//!
//! ```
//! use gitops_guard::forge::mock::{MockGitHost, MockOperation};
//! use gitops_guard::forge::GitHost;
//!
//! # tokio_test_block_on(async {
//! let host = MockGitHost::new("acme", "templates")
//!     .with_ref("refs/heads/main", "abc123")
//!     .with_commit("abc123", &["def456"]);
//!
//! let refs = host.list_refs().await.unwrap();
//! assert_eq!(refs[0].sha.as_str(), "abc123");
//! assert!(matches!(host.operations()[0], MockOperation::ListRefs));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{Commit, ForgeError, GitHost, GitRef, HostConnector, UpdateRefRequest};
use crate::core::types::{GitRepositoryRef, ObjectSha, RefName};

/// Mock git host for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockGitHost {
    repository: GitRepositoryRef,
    inner: Arc<Mutex<MockGitHostInner>>,
}

#[derive(Debug)]
struct MockGitHostInner {
    /// Refs in listing order.
    refs: Vec<GitRef>,
    /// Commits by sha.
    commits: HashMap<ObjectSha, Commit>,
    /// Operation to fail (for testing error paths).
    fail_on: Option<FailOn>,
    /// When set, `update_ref` reports success without moving the ref.
    ignore_updates: bool,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail `connect` with the given error.
    Connect(ForgeError),
    /// Fail `list_refs` with the given error.
    ListRefs(ForgeError),
    /// Fail `get_ref` with the given error.
    GetRef(ForgeError),
    /// Fail `get_commit` with the given error.
    GetCommit(ForgeError),
    /// Fail `update_ref` with the given error.
    UpdateRef(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Connect { repository: String },
    ListRefs,
    GetRef { name: String },
    GetCommit { sha: String },
    UpdateRef { name: String, sha: String, force: bool },
}

impl MockGitHost {
    /// Create an empty mock host for `owner/name`.
    ///
    /// # Panics
    ///
    /// Panics if either part is empty.
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            repository: GitRepositoryRef::new(owner, name).expect("valid mock repository"),
            inner: Arc::new(Mutex::new(MockGitHostInner {
                refs: Vec::new(),
                commits: HashMap::new(),
                fail_on: None,
                ignore_updates: false,
                operations: Vec::new(),
            })),
        }
    }

    /// Append a ref (listing order is insertion order).
    ///
    /// # Panics
    ///
    /// Panics on an invalid ref name or sha.
    pub fn with_ref(self, name: &str, sha: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.refs.push(GitRef {
                name: RefName::new(name).expect("valid mock ref name"),
                sha: ObjectSha::new(sha).expect("valid mock sha"),
            });
        }
        self
    }

    /// Add a commit with the given parents.
    ///
    /// # Panics
    ///
    /// Panics on an invalid sha.
    pub fn with_commit(self, sha: &str, parents: &[&str]) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let sha = ObjectSha::new(sha).expect("valid mock sha");
            let parents = parents
                .iter()
                .map(|p| ObjectSha::new(*p).expect("valid mock sha"))
                .collect();
            inner.commits.insert(
                sha.clone(),
                Commit {
                    sha,
                    parents,
                    message: None,
                },
            );
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Make `update_ref` succeed without moving anything, so read-back
    /// verification can be exercised.
    pub fn ignoring_updates(self) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.ignore_updates = true;
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Recorded operations excluding `Connect` (i.e. actual API calls).
    pub fn api_calls(&self) -> Vec<MockOperation> {
        self.operations()
            .into_iter()
            .filter(|op| !matches!(op, MockOperation::Connect { .. }))
            .collect()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Current sha of a ref (for test verification).
    pub fn ref_sha(&self, name: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .refs
            .iter()
            .find(|r| r.name.as_str() == name)
            .map(|r| r.sha.to_string())
    }

    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Option<ForgeError> {
        let inner = self.inner.lock().unwrap();
        match &inner.fail_on {
            Some(FailOn::Connect(e)) if expected == "connect" => Some(e.clone()),
            Some(FailOn::ListRefs(e)) if expected == "list_refs" => Some(e.clone()),
            Some(FailOn::GetRef(e)) if expected == "get_ref" => Some(e.clone()),
            Some(FailOn::GetCommit(e)) if expected == "get_commit" => Some(e.clone()),
            Some(FailOn::UpdateRef(e)) if expected == "update_ref" => Some(e.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl GitHost for MockGitHost {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn repository(&self) -> &GitRepositoryRef {
        &self.repository
    }

    async fn list_refs(&self) -> Result<Vec<GitRef>, ForgeError> {
        self.record(MockOperation::ListRefs);

        if let Some(err) = self.check_fail("list_refs") {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner.refs.clone())
    }

    async fn get_ref(&self, name: &RefName) -> Result<GitRef, ForgeError> {
        self.record(MockOperation::GetRef {
            name: name.to_string(),
        });

        if let Some(err) = self.check_fail("get_ref") {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        inner
            .refs
            .iter()
            .find(|r| &r.name == name)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(name.to_string()))
    }

    async fn get_commit(&self, sha: &ObjectSha) -> Result<Commit, ForgeError> {
        self.record(MockOperation::GetCommit {
            sha: sha.to_string(),
        });

        if let Some(err) = self.check_fail("get_commit") {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        inner
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("commit {}", sha)))
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<GitRef, ForgeError> {
        self.record(MockOperation::UpdateRef {
            name: request.name.to_string(),
            sha: request.sha.to_string(),
            force: request.force,
        });

        if let Some(err) = self.check_fail("update_ref") {
            return Err(err);
        }

        let mut inner = self.inner.lock().unwrap();
        let ignore = inner.ignore_updates;
        let existing = inner
            .refs
            .iter_mut()
            .find(|r| r.name == request.name)
            .ok_or_else(|| ForgeError::NotFound(request.name.to_string()))?;

        if !ignore {
            existing.sha = request.sha.clone();
        }
        Ok(GitRef {
            name: request.name,
            sha: request.sha,
        })
    }
}

impl HostConnector for MockGitHost {
    fn connect(
        &self,
        repository: &GitRepositoryRef,
        _token: &str,
    ) -> Result<Arc<dyn GitHost>, ForgeError> {
        self.record(MockOperation::Connect {
            repository: repository.to_string(),
        });

        if let Some(err) = self.check_fail("connect") {
            return Err(err);
        }

        Ok(Arc::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_moves_ref_and_records() {
        let host = MockGitHost::new("acme", "templates").with_ref("refs/heads/main", "abc123");

        host.update_ref(UpdateRefRequest::forced(
            RefName::new("refs/heads/main").unwrap(),
            ObjectSha::new("def456").unwrap(),
        ))
        .await
        .unwrap();

        assert_eq!(host.ref_sha("refs/heads/main").as_deref(), Some("def456"));
        assert_eq!(
            host.operations(),
            vec![MockOperation::UpdateRef {
                name: "refs/heads/main".into(),
                sha: "def456".into(),
                force: true,
            }]
        );
    }

    #[tokio::test]
    async fn ignoring_updates_leaves_ref() {
        let host = MockGitHost::new("acme", "templates")
            .with_ref("refs/heads/main", "abc123")
            .ignoring_updates();

        host.update_ref(UpdateRefRequest::forced(
            RefName::new("refs/heads/main").unwrap(),
            ObjectSha::new("def456").unwrap(),
        ))
        .await
        .unwrap();

        assert_eq!(host.ref_sha("refs/heads/main").as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn fail_on_returns_configured_error() {
        let host = MockGitHost::new("acme", "templates").fail_on(FailOn::ListRefs(
            ForgeError::ApiError {
                status: 500,
                message: "boom".into(),
            },
        ));

        let err = host.list_refs().await.unwrap_err();
        assert_eq!(err.status(), Some(500));

        host.clear_fail_on();
        assert!(host.list_refs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_commit_is_not_found() {
        let host = MockGitHost::new("acme", "templates");
        let err = host
            .get_commit(&ObjectSha::new("abc123").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::NotFound(_)));
    }

    #[test]
    fn connect_shares_state() {
        let host = MockGitHost::new("acme", "templates");
        let repo = GitRepositoryRef::new("acme", "templates").unwrap();
        let connected = host.connect(&repo, "token").unwrap();
        assert_eq!(connected.name(), "mock");
        assert_eq!(
            host.operations(),
            vec![MockOperation::Connect {
                repository: "acme/templates".into()
            }]
        );
        assert!(host.api_calls().is_empty());
    }
}
