//! secrets::traits
//!
//! Credential lookup trait definition.
//!
//! # Design
//!
//! A credential is a key inside a named secret in a namespace, the way a
//! GitOps resource's `spec.templateSource.secretRef` points at a cluster
//! secret holding a `token` key.
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include secret values in error messages
//! - Be thread-safe (Send + Sync)

use async_trait::async_trait;
use thiserror::Error;

/// Errors from credential lookups.
///
/// Note: Error messages intentionally do not include secret values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    /// Secret not found for the given reference.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// Failed to read from secret storage.
    #[error("failed to read secret: {0}")]
    ReadError(String),

    /// Permission denied accessing secret storage.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Provider not available or not configured.
    #[error("secret provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// Location of a secret: `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

impl SecretRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for SecretRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Trait for credential providers.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Read `key` from the secret at `secret`.
    ///
    /// Returns `Ok(Some(value))` if the secret and key exist.
    /// Returns `Ok(None)` if either the secret or the key does not exist.
    /// Returns `Err` if the store could not be queried.
    ///
    /// # Security
    ///
    /// The returned value is the raw secret. Do not log or print it.
    async fn get(&self, secret: &SecretRef, key: &str) -> Result<Option<String>, SecretError>;
}
