//! forge::traits
//!
//! Git host trait definition for inspecting and moving remote refs.
//!
//! # Design
//!
//! The `GitHost` trait is async because every operation is network I/O.
//! A host value is bound to a single repository (`owner/name`); the
//! [`HostConnector`] seam builds one per repository and token, so callers
//! never hold a host across repositories.
//!
//! Each method is a single bounded request. Implementations do not retry.
//!
//! # Example
//!
//! ```ignore
//! use gitops_guard::forge::{GitHost, UpdateRefRequest};
//!
//! async fn step_back(host: &dyn GitHost) -> Result<(), ForgeError> {
//!     let refs = host.list_refs().await?;
//!     let commit = host.get_commit(&refs[0].sha).await?;
//!     if let Some(parent) = commit.first_parent() {
//!         host.update_ref(UpdateRefRequest::forced(refs[0].name.clone(), parent.clone()))
//!             .await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{GitRepositoryRef, ObjectSha, RefName};

/// Errors from git host operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid or expired token).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The token is valid but lacks permission for the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The operation is not supported by this host.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl ForgeError {
    /// HTTP status associated with this error, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            ForgeError::AuthFailed(_) => Some(401),
            ForgeError::PermissionDenied(_) => Some(403),
            ForgeError::NotFound(_) => Some(404),
            ForgeError::RateLimited => Some(429),
            ForgeError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A named reference and the object it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    /// Full ref name, e.g. `refs/heads/main`
    pub name: RefName,
    /// Object the ref points to
    pub sha: ObjectSha,
}

/// A commit as reported by the host.
///
/// Parents are in the host's order: `parents[0]` is the first parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Commit sha
    pub sha: ObjectSha,
    /// Parent shas; empty for a root commit, two or more for a merge
    pub parents: Vec<ObjectSha>,
    /// Commit message, when the host returns one
    pub message: Option<String>,
}

impl Commit {
    /// The first parent, following first-parent history.
    pub fn first_parent(&self) -> Option<&ObjectSha> {
        self.parents.first()
    }

    /// Whether this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Whether this commit is a merge (two or more parents).
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Request to move a ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRefRequest {
    /// Ref to move
    pub name: RefName,
    /// New target
    pub sha: ObjectSha,
    /// Allow a non-fast-forward move
    pub force: bool,
}

impl UpdateRefRequest {
    /// A forced update, allowed to move the ref backwards.
    pub fn forced(name: RefName, sha: ObjectSha) -> Self {
        Self {
            name,
            sha,
            force: true,
        }
    }
}

/// The GitHost trait for reading and moving refs on a remote repository.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Any non-2xx response is an
/// error; callers decide whether it is fatal.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Get the host name (e.g., "github").
    fn name(&self) -> &'static str;

    /// The repository this host is bound to.
    fn repository(&self) -> &GitRepositoryRef;

    /// List the repository's refs in the order the host returns them.
    async fn list_refs(&self) -> Result<Vec<GitRef>, ForgeError>;

    /// Read a single ref.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ref doesn't exist
    async fn get_ref(&self, name: &RefName) -> Result<GitRef, ForgeError>;

    /// Fetch the commit object for a sha.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the commit doesn't exist
    async fn get_commit(&self, sha: &ObjectSha) -> Result<Commit, ForgeError>;

    /// Point a ref at a new object.
    ///
    /// # Returns
    ///
    /// The ref as the host reports it after the update.
    ///
    /// # Errors
    ///
    /// - `ApiError` with status 422 if a non-forced update is not a fast-forward
    async fn update_ref(&self, request: UpdateRefRequest) -> Result<GitRef, ForgeError>;
}

/// Builds a [`GitHost`] for a repository and access token.
///
/// Connecting performs no network I/O.
pub trait HostConnector: Send + Sync {
    /// Create a host bound to `repository`, authenticating with `token`.
    fn connect(
        &self,
        repository: &GitRepositoryRef,
        token: &str,
    ) -> Result<Arc<dyn GitHost>, ForgeError>;
}
