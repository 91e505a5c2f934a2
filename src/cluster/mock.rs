//! cluster::mock
//!
//! Mock workload source for deterministic testing.
//!
//! # Design
//!
//! The mock holds a queue of cluster *snapshots*. Each snapshot is the
//! full set of workloads at one moment. A new observation (a first-page
//! `list` or a `get`) advances to the next snapshot, and the last one
//! sticks. That lets a test script "pod appears, then starts running" for
//! a poller without real time passing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::traits::{ClusterError, Workload, WorkloadKind, WorkloadPage, WorkloadSource};

/// Mock workload source for testing.
#[derive(Debug, Clone, Default)]
pub struct MockWorkloadSource {
    inner: Arc<Mutex<MockWorkloadSourceInner>>,
}

#[derive(Debug, Default)]
struct MockWorkloadSourceInner {
    snapshots: Vec<Vec<Workload>>,
    /// Index of the snapshot being observed; `None` before the first observation.
    position: Option<usize>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    List(ClusterError),
    Get(ClusterError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    List {
        kind: WorkloadKind,
        namespace: String,
        limit: u32,
        continue_token: Option<String>,
    },
    Get {
        kind: WorkloadKind,
        namespace: String,
        name: String,
    },
}

impl MockWorkloadSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose cluster never changes.
    pub fn with_workloads(workloads: Vec<Workload>) -> Self {
        Self::new().then(workloads)
    }

    /// Append a snapshot to the queue.
    pub fn then(self, workloads: Vec<Workload>) -> Self {
        self.inner.lock().unwrap().snapshots.push(workloads);
        self
    }

    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner.lock().unwrap().fail_on = Some(fail_on);
        self
    }

    pub fn clear_fail_on(&self) {
        self.inner.lock().unwrap().fail_on = None;
    }

    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Number of list calls made (all pages).
    pub fn list_calls(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::List { .. }))
            .count()
    }

    fn observe(&self) {
        let mut inner = self.inner.lock().unwrap();
        let last = inner.snapshots.len().saturating_sub(1);
        inner.position = Some(match inner.position {
            Some(at) => (at + 1).min(last),
            None => 0,
        });
    }

    fn snapshot(&self, kind: WorkloadKind, namespace: &str) -> Vec<Workload> {
        let inner = self.inner.lock().unwrap();
        let current = inner
            .position
            .and_then(|at| inner.snapshots.get(at))
            .or_else(|| inner.snapshots.first());
        current
            .into_iter()
            .flatten()
            .filter(|w| w.kind == kind && w.namespace == namespace)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WorkloadSource for MockWorkloadSource {
    async fn list(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<WorkloadPage, ClusterError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.operations.push(MockOperation::List {
                kind,
                namespace: namespace.to_string(),
                limit,
                continue_token: continue_token.map(String::from),
            });
            if let Some(FailOn::List(err)) = &inner.fail_on {
                return Err(err.clone());
            }
        }

        if continue_token.is_none() {
            self.observe();
        }

        let all = self.snapshot(kind, namespace);
        let offset = match continue_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ClusterError::Api {
                    status: 410,
                    message: format!("invalid continue token '{}'", token),
                })?,
            None => 0,
        };
        let limit = limit.max(1) as usize;
        let end = (offset + limit).min(all.len());
        let items = all.get(offset..end).map(|s| s.to_vec()).unwrap_or_default();
        let continue_token = (end < all.len()).then(|| end.to_string());

        Ok(WorkloadPage {
            items,
            continue_token,
        })
    }

    async fn get(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<Workload, ClusterError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.operations.push(MockOperation::Get {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
            if let Some(FailOn::Get(err)) = &inner.fail_on {
                return Err(err.clone());
            }
        }

        self.observe();

        self.snapshot(kind, namespace)
            .into_iter()
            .find(|w| w.name == name)
            .ok_or_else(|| ClusterError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pages_by_limit() {
        let source = MockWorkloadSource::with_workloads(vec![
            Workload::pod("ns", "a", "Running", &[]),
            Workload::pod("ns", "b", "Running", &[]),
            Workload::pod("ns", "c", "Running", &[]),
        ]);

        let first = source.list(WorkloadKind::Pod, "ns", 2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let token = first.continue_token.clone().unwrap();

        let second = source
            .list(WorkloadKind::Pod, "ns", 2, Some(&token))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name, "c");
        assert!(second.continue_token.is_none());
    }

    #[tokio::test]
    async fn snapshots_advance_per_observation() {
        let source = MockWorkloadSource::new()
            .then(vec![])
            .then(vec![Workload::pod("ns", "web", "Pending", &[])])
            .then(vec![Workload::pod("ns", "web", "Running", &[])]);

        assert!(source.get(WorkloadKind::Pod, "ns", "web").await.unwrap_err().is_not_found());
        let pending = source.get(WorkloadKind::Pod, "ns", "web").await.unwrap();
        assert!(!pending.is_running());
        let running = source.get(WorkloadKind::Pod, "ns", "web").await.unwrap();
        assert!(running.is_running());
        // last snapshot sticks
        assert!(source.get(WorkloadKind::Pod, "ns", "web").await.unwrap().is_running());
    }

    #[tokio::test]
    async fn filters_by_kind_and_namespace() {
        let source = MockWorkloadSource::with_workloads(vec![
            Workload::pod("ns", "web", "Running", &[]),
            Workload::cron_job("ns", "web-backup", &[]),
            Workload::pod("other", "web", "Running", &[]),
        ]);
        let page = source.list(WorkloadKind::CronJob, "ns", 10, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "web-backup");
    }

    #[tokio::test]
    async fn fail_on_list() {
        let source = MockWorkloadSource::new().fail_on(FailOn::List(ClusterError::Api {
            status: 403,
            message: "forbidden".into(),
        }));
        let err = source.list(WorkloadKind::Pod, "ns", 10, None).await.unwrap_err();
        assert!(matches!(err, ClusterError::Api { status: 403, .. }));
        assert_eq!(source.list_calls(), 1);
    }
}
