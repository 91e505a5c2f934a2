//! forge
//!
//! Abstraction for remote git hosts.
//!
//! # Architecture
//!
//! The `GitHost` trait defines the three git-data operations a revert needs
//! (list refs, get commit, update ref) plus a single-ref read used for
//! optional read-back. The revert logic depends only on the trait and on
//! [`HostConnector`]; it never imports a concrete host.
//!
//! # Modules
//!
//! - `traits`: Core `GitHost` / `HostConnector` traits and value types
//! - [`github`]: GitHub implementation using the REST git-data API
//! - [`mock`]: Mock implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use gitops_guard::core::types::GitRepositoryRef;
//! use gitops_guard::forge::{github::GitHubConnector, HostConnector};
//!
//! let connector = GitHubConnector::default();
//! let repo = GitRepositoryRef::parse("https://github.com/acme/templates")?;
//! let host = connector.connect(&repo, &token)?;
//! let refs = host.list_refs().await?;
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
