//! cluster
//!
//! Read access to cluster workloads and readiness waits.
//!
//! # Modules
//!
//! - `traits`: `WorkloadSource` trait, `Workload` view and `ClusterError`
//! - [`locator`]: `ResourceLocator`, prefix + matcher search with paging
//! - [`readiness`]: running / running-by-image / absence / cronjob waits
//! - [`kube_source`]: Kubernetes API implementation
//! - [`mock`]: in-memory implementation for tests

pub mod kube_source;
pub mod locator;
pub mod mock;
pub mod readiness;
mod traits;

pub use kube_source::KubeWorkloadSource;
pub use locator::ResourceLocator;
pub use readiness::ReadinessChecks;
pub use traits::*;
