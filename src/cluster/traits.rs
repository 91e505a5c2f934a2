//! cluster::traits
//!
//! Workload listing trait and value types.
//!
//! # Design
//!
//! The locator and readiness checks only need a thin read view of Pods and
//! CronJobs: name, namespace, phase, container images. `WorkloadSource`
//! exposes exactly that, one page at a time, so the Kubernetes client can
//! be swapped for [`super::mock::MockWorkloadSource`] in tests.

use async_trait::async_trait;
use thiserror::Error;

/// Pod phase meaning the pod is up.
pub const PHASE_RUNNING: &str = "Running";

/// Phase treated as "gone" by absence checks.
pub const PHASE_TERMINATED: &str = "Terminated";

/// Errors from cluster reads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    /// The named object does not exist.
    #[error("{kind} \"{name}\" not found in namespace \"{namespace}\"")]
    NotFound {
        kind: WorkloadKind,
        namespace: String,
        name: String,
    },

    /// API server returned an error status.
    #[error("cluster API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Client-side or transport failure.
    #[error("cluster client error: {0}")]
    Client(String),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }
}

/// Kinds of workload the locator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Pod,
    CronJob,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Pod => "pod",
            WorkloadKind::CronJob => "cronjob",
        }
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read view of a Pod or CronJob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    /// `status.phase`; CronJobs have none.
    pub phase: Option<String>,
    /// Container images in declaration order.
    pub images: Vec<String>,
}

impl Workload {
    pub fn pod(namespace: &str, name: &str, phase: &str, images: &[&str]) -> Self {
        Self {
            kind: WorkloadKind::Pod,
            namespace: namespace.to_string(),
            name: name.to_string(),
            phase: Some(phase.to_string()).filter(|p| !p.is_empty()),
            images: images.iter().map(|i| i.to_string()).collect(),
        }
    }

    pub fn cron_job(namespace: &str, name: &str, images: &[&str]) -> Self {
        Self {
            kind: WorkloadKind::CronJob,
            namespace: namespace.to_string(),
            name: name.to_string(),
            phase: None,
            images: images.iter().map(|i| i.to_string()).collect(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase.as_deref() == Some(PHASE_RUNNING)
    }

    pub fn is_terminated(&self) -> bool {
        self.phase.as_deref() == Some(PHASE_TERMINATED)
    }

    /// True if any container image contains `needle`.
    pub fn has_image_containing(&self, needle: &str) -> bool {
        self.images.iter().any(|image| image.contains(needle))
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadPage {
    pub items: Vec<Workload>,
    /// Token for the next page; `None` when the listing is complete.
    pub continue_token: Option<String>,
}

/// Source of workload listings.
#[async_trait]
pub trait WorkloadSource: Send + Sync {
    /// List one page of `kind` in `namespace`.
    ///
    /// Order is whatever the API returns. Pass the previous page's
    /// `continue_token` to get the next page.
    async fn list(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<WorkloadPage, ClusterError>;

    /// Get a workload by exact name.
    ///
    /// # Errors
    ///
    /// `ClusterError::NotFound` if it does not exist.
    async fn get(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<Workload, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_helpers() {
        let pod = Workload::pod("ns", "web-1", "Running", &["nginx:1.25"]);
        assert!(pod.is_running());
        assert!(!pod.is_terminated());

        let gone = Workload::pod("ns", "web-1", "Terminated", &[]);
        assert!(gone.is_terminated());

        let pending = Workload::pod("ns", "web-1", "", &[]);
        assert_eq!(pending.phase, None);
        assert!(!pending.is_running());
    }

    #[test]
    fn image_substring_match() {
        let pod = Workload::pod("ns", "web-1", "Running", &["sidecar:1", "quay.io/acme/web:2.0"]);
        assert!(pod.has_image_containing("acme/web"));
        assert!(!pod.has_image_containing("acme/api"));
    }

    #[test]
    fn not_found_display() {
        let err = ClusterError::NotFound {
            kind: WorkloadKind::Pod,
            namespace: "team-a".into(),
            name: "web-0".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "pod \"web-0\" not found in namespace \"team-a\"");
    }
}
