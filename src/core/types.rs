//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ObjectSha`] - Git object identifier as reported by the hosting API
//! - [`RefName`] - Validated Git reference name (`refs/...`)
//! - [`GitRepositoryRef`] - Owner and repository name parsed from a URI
//! - [`TemplateSource`] / [`GitOpsConfig`] - The custom-resource fields we consume
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a malformed URI fails before any network call.
//!
//! # Examples
//!
//! ```
//! use gitops_guard::core::types::{GitRepositoryRef, ObjectSha, RefName};
//!
//! let repo = GitRepositoryRef::parse("https://github.com/acme/templates").unwrap();
//! assert_eq!(repo.owner(), "acme");
//! assert_eq!(repo.name(), "templates");
//!
//! let sha = ObjectSha::new("ABC123").unwrap();
//! assert_eq!(sha.as_str(), "abc123");
//!
//! let main = RefName::for_branch("main").unwrap();
//! assert_eq!(main.as_str(), "refs/heads/main");
//!
//! assert!(GitRepositoryRef::parse("templates").is_err());
//! assert!(ObjectSha::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object sha: {0}")]
    InvalidSha(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid repository uri '{uri}': {reason}")]
    InvalidRepositoryUri { uri: String, reason: String },
}

/// A Git object identifier.
///
/// Normalized to lowercase. Full digests are 40 (SHA-1) or 64 (SHA-256)
/// hex characters; abbreviated identifiers are accepted because some
/// hosting APIs and fixtures report them.
///
/// # Example
///
/// ```
/// use gitops_guard::core::types::ObjectSha;
///
/// let sha = ObjectSha::new("DEF4567890abc123def4567890abc123def45678").unwrap();
/// assert_eq!(sha.short(7), "def4567");
/// assert!(sha.is_full());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectSha(String);

impl ObjectSha {
    /// Longest digest we accept (SHA-256).
    const MAX_LEN: usize = 64;

    /// Create a new validated object sha.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidSha` if the string is empty, too long,
    /// or not hexadecimal.
    pub fn new(sha: impl Into<String>) -> Result<Self, TypeError> {
        let sha = sha.into().to_ascii_lowercase();
        if sha.is_empty() {
            return Err(TypeError::InvalidSha("object sha cannot be empty".into()));
        }
        if sha.len() > Self::MAX_LEN {
            return Err(TypeError::InvalidSha(format!(
                "expected at most {} hex characters, got {}",
                Self::MAX_LEN,
                sha.len()
            )));
        }
        if !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidSha(format!(
                "'{sha}' is not hexadecimal"
            )));
        }
        Ok(Self(sha))
    }

    /// Whether this is a full SHA-1 or SHA-256 digest.
    pub fn is_full(&self) -> bool {
        self.0.len() == 40 || self.0.len() == 64
    }

    /// Get an abbreviated form of the sha.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the sha as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectSha {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectSha> for String {
    fn from(sha: ObjectSha) -> Self {
        sha.0
    }
}

impl AsRef<str> for ObjectSha {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectSha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name, always under `refs/`.
///
/// # Example
///
/// ```
/// use gitops_guard::core::types::RefName;
///
/// let name = RefName::new("refs/heads/release/1.x").unwrap();
/// assert_eq!(name.api_path(), "heads/release/1.x");
/// assert_eq!(name.branch(), Some("release/1.x"));
///
/// assert!(RefName::new("heads/main").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    const PREFIX: &'static str = "refs/";
    const HEADS: &'static str = "refs/heads/";

    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name is not under `refs/`
    /// or contains characters Git forbids in ref names.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Create the ref name for a branch (`refs/heads/<branch>`).
    ///
    /// Accepts either a bare branch name or an already-qualified ref.
    pub fn for_branch(branch: &str) -> Result<Self, TypeError> {
        if branch.starts_with(Self::PREFIX) {
            Self::new(branch)
        } else {
            Self::new(format!("{}{}", Self::HEADS, branch))
        }
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let rest = name.strip_prefix(Self::PREFIX).ok_or_else(|| {
            TypeError::InvalidRefName(format!("'{name}' must start with 'refs/'"))
        })?;
        if rest.is_empty() || rest.ends_with('/') {
            return Err(TypeError::InvalidRefName(format!(
                "'{name}' has an empty path component"
            )));
        }
        if name.contains("..") || name.contains("//") || name.contains("@{") {
            return Err(TypeError::InvalidRefName(format!(
                "'{name}' contains a forbidden sequence"
            )));
        }
        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if name
            .chars()
            .any(|c| INVALID_CHARS.contains(&c) || c.is_ascii_control())
        {
            return Err(TypeError::InvalidRefName(format!(
                "'{name}' contains a forbidden character"
            )));
        }
        Ok(())
    }

    /// The ref path as used in the hosting API's `git/refs/{path}` routes
    /// (the name without its leading `refs/`).
    pub fn api_path(&self) -> &str {
        &self.0[Self::PREFIX.len()..]
    }

    /// The branch name if this is a `refs/heads/` ref.
    pub fn branch(&self) -> Option<&str> {
        self.0.strip_prefix(Self::HEADS)
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tracked repository on the git host: `owner/name`.
///
/// Parsed from a repository URI by taking its last two `/`-delimited
/// segments. The scheme and host are ignored, trailing slashes are
/// dropped.
///
/// # Example
///
/// ```
/// use gitops_guard::core::types::GitRepositoryRef;
///
/// let repo = GitRepositoryRef::parse("github.com/acme/templates/").unwrap();
/// assert_eq!(repo.to_string(), "acme/templates");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitRepositoryRef {
    owner: String,
    name: String,
}

impl GitRepositoryRef {
    /// Create a repository reference from its parts.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepositoryUri` if either part is empty.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() || name.is_empty() {
            return Err(TypeError::InvalidRepositoryUri {
                uri: format!("{owner}/{name}"),
                reason: "owner and repository name must be non-empty".into(),
            });
        }
        Ok(Self { owner, name })
    }

    /// Parse a repository URI into owner and repository name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepositoryUri` if the URI has fewer than
    /// two `/`-delimited segments or either of the last two is empty.
    pub fn parse(uri: &str) -> Result<Self, TypeError> {
        let trimmed = uri.trim().trim_end_matches('/');
        let mut segments = trimmed.rsplit('/');
        let (name, owner) = match (segments.next(), segments.next()) {
            (Some(name), Some(owner)) => (name, owner),
            _ => {
                return Err(TypeError::InvalidRepositoryUri {
                    uri: uri.to_string(),
                    reason: "expected at least two '/'-separated segments (owner/repository)"
                        .into(),
                })
            }
        };
        if owner.is_empty() || name.is_empty() {
            return Err(TypeError::InvalidRepositoryUri {
                uri: uri.to_string(),
                reason: "owner and repository name must be non-empty".into(),
            });
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// The repository owner (user or organization).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for GitRepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Where a GitOps resource's templates live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSource {
    /// Repository URI (`spec.templateSource.uri`)
    pub uri: String,
    /// Name of the secret holding the access token (`spec.templateSource.secretRef`)
    #[serde(default)]
    pub secret_ref: Option<String>,
}

/// The slice of a GitOps custom resource this crate consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitOpsConfig {
    /// `metadata.name`
    pub name: String,
    /// `metadata.namespace`; the credential secret is looked up here
    pub namespace: String,
    /// `spec.templateSource`
    pub template_source: TemplateSource,
}

impl GitOpsConfig {
    /// Convenience constructor used by the CLI and tests.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        uri: impl Into<String>,
        secret_ref: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            template_source: TemplateSource {
                uri: uri.into(),
                secret_ref,
            },
        }
    }
}
