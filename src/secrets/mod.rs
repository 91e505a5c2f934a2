//! secrets
//!
//! Credential lookup abstraction for git host tokens.
//!
//! # Architecture
//!
//! Tokens are read through the `CredentialSource` trait, which has two
//! implementations:
//!
//! - [`KubeSecretSource`]: Reads a key from a cluster `Secret`
//! - [`StaticCredentials`]: Fixed in-memory values (CLI env tokens, tests)
//!
//! # Security
//!
//! Secrets are **never** logged or included in error messages.
//!
//! # Example
//!
//! ```ignore
//! use gitops_guard::secrets::{CredentialSource, KubeSecretSource, SecretRef};
//!
//! let source = KubeSecretSource::try_default().await?;
//! if let Some(token) = source.get(&SecretRef::new("team-a", "gh-token"), "token").await? {
//!     // Use token (never print it!)
//! }
//! ```

mod kube_store;
mod static_store;
mod traits;

pub use kube_store::KubeSecretSource;
pub use static_store::StaticCredentials;
pub use traits::{CredentialSource, SecretError, SecretRef};
