//! core
//!
//! Core domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ObjectSha, RefName, GitRepositoryRef, GitOpsConfig
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Malformed input is rejected before any network call

pub mod config;
pub mod types;
