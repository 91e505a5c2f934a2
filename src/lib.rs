//! gitops-guard - rollback and readiness support for GitOps controllers
//!
//! Two independent capabilities a GitOps reconcile loop calls into:
//!
//! - Undo the last commit of a template repository's tracked branch by
//!   force-moving the ref to its first parent through the git host API
//! - Block until cluster workloads reach (or leave) a state, with a hard
//!   deadline, fatal-error abort and cancellation
//!
//! # Architecture
//!
//! - [`core`] - Domain types and configuration
//! - [`forge`] - Remote git host seam (GitHub REST, mock)
//! - [`secrets`] - Credential lookup seam (cluster secrets, static)
//! - [`revert`] - `RefResolver`, the one-commit rollback
//! - [`poll`] - `ConditionPoller`, bounded waits
//! - [`cluster`] - `ResourceLocator` and readiness checks over Pods and CronJobs
//! - [`cli`] - Command-line front end
//! - [`logging`] - Subscriber setup for the binary
//!
//! # Invariants
//!
//! 1. A revert targets the first parent only, and a root commit is never updated
//! 2. A missing credential fails before any git host call
//! 3. At most one revert per repository is in flight per lock registry
//! 4. A wait never outlives its timeout by more than one interval

pub mod cli;
pub mod cluster;
pub mod core;
pub mod forge;
pub mod logging;
pub mod poll;
pub mod revert;
pub mod secrets;
