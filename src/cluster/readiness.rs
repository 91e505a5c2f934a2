//! cluster::readiness
//!
//! Waits composed from [`ResourceLocator`] and [`ConditionPoller`].
//!
//! A lookup that finds nothing, or that the API answers with not-found, is
//! a retry signal. Any other cluster error aborts the wait.

use super::locator::ResourceLocator;
use super::traits::{ClusterError, Workload, WorkloadKind};
use crate::poll::{ConditionPoller, PollError, PollOutcome, WaitTarget};

/// Satisfied once the workload exists and is `Running`.
pub fn running(found: Option<&Workload>) -> PollOutcome<ClusterError> {
    match found {
        Some(w) if w.is_running() => PollOutcome::Satisfied,
        _ => PollOutcome::NotYet,
    }
}

/// Satisfied once the workload is gone or `Terminated`.
pub fn absent(found: Option<&Workload>) -> PollOutcome<ClusterError> {
    match found {
        None => PollOutcome::Satisfied,
        Some(w) if w.is_terminated() => PollOutcome::Satisfied,
        Some(_) => PollOutcome::NotYet,
    }
}

/// Satisfied once the workload exists.
pub fn present(found: Option<&Workload>) -> PollOutcome<ClusterError> {
    match found {
        Some(_) => PollOutcome::Satisfied,
        None => PollOutcome::NotYet,
    }
}

/// Treat not-found as "nothing there", everything else as fatal.
fn evaluate(
    lookup: Result<Option<Workload>, ClusterError>,
    check: fn(Option<&Workload>) -> PollOutcome<ClusterError>,
) -> PollOutcome<ClusterError> {
    match lookup {
        Ok(found) => check(found.as_ref()),
        Err(e) if e.is_not_found() => check(None),
        Err(e) => PollOutcome::Fatal(e),
    }
}

/// Readiness waits over one locator and one poller.
#[derive(Debug, Clone)]
pub struct ReadinessChecks {
    locator: ResourceLocator,
    poller: ConditionPoller,
}

impl ReadinessChecks {
    pub fn new(locator: ResourceLocator, poller: ConditionPoller) -> Self {
        Self { locator, poller }
    }

    pub fn poller(&self) -> &ConditionPoller {
        &self.poller
    }

    /// Wait for the pod named exactly `name` to be `Running`.
    pub async fn wait_for_pod(&self, namespace: &str, name: &str) -> Result<(), PollError> {
        let target = WaitTarget::new(WorkloadKind::Pod.as_str(), namespace, name);
        let locator = &self.locator;
        self.poller
            .wait_until(&target, move || async move {
                let lookup = locator.get(WorkloadKind::Pod, namespace, name).await.map(Some);
                evaluate(lookup, running)
            })
            .await?;
        tracing::info!(%target, "pod is available");
        Ok(())
    }

    /// Wait for a pod named `prefix*` to be `Running`.
    pub async fn wait_for_pod_running(&self, namespace: &str, prefix: &str) -> Result<(), PollError> {
        let target = WaitTarget::new(WorkloadKind::Pod.as_str(), namespace, prefix);
        let locator = &self.locator;
        self.poller
            .wait_until(&target, move || async move {
                evaluate(locator.find_pod(namespace, prefix, None).await, running)
            })
            .await?;
        tracing::info!(%target, "pod is available");
        Ok(())
    }

    /// Wait for a pod named `prefix*` running an image containing `image`.
    ///
    /// On timeout the pods present in the namespace are logged with their
    /// images before the error is returned.
    pub async fn wait_for_pod_with_image(
        &self,
        namespace: &str,
        prefix: &str,
        image: &str,
    ) -> Result<(), PollError> {
        let target = WaitTarget::new(WorkloadKind::Pod.as_str(), namespace, prefix)
            .with_detail(format!("image {}", image));
        let locator = &self.locator;
        let result = self
            .poller
            .wait_until(&target, move || async move {
                evaluate(locator.find_pod(namespace, prefix, Some(image)).await, running)
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(%target, "pod is available");
                Ok(())
            }
            Err(err) => {
                if matches!(err, PollError::Timeout { .. }) {
                    self.log_pods_seen(namespace).await;
                }
                Err(err)
            }
        }
    }

    /// Wait until no pod named `prefix*` (optionally with `image`) exists,
    /// or the one found is `Terminated`.
    pub async fn wait_for_pod_absence(
        &self,
        namespace: &str,
        prefix: &str,
        image: Option<&str>,
    ) -> Result<(), PollError> {
        let mut target = WaitTarget::new(WorkloadKind::Pod.as_str(), namespace, prefix);
        if let Some(image) = image {
            target = target.with_detail(format!("image {}", image));
        }
        let locator = &self.locator;
        self.poller
            .wait_until(&target, move || async move {
                evaluate(locator.find_pod(namespace, prefix, image).await, absent)
            })
            .await?;
        tracing::info!(%target, "pod is absent");
        Ok(())
    }

    /// Wait for a CronJob named `prefix*` to exist.
    pub async fn wait_for_cron_job(&self, namespace: &str, prefix: &str) -> Result<(), PollError> {
        let target = WaitTarget::new(WorkloadKind::CronJob.as_str(), namespace, prefix);
        let locator = &self.locator;
        self.poller
            .wait_until(&target, move || async move {
                evaluate(locator.find_cron_job(namespace, prefix).await, present)
            })
            .await?;
        tracing::info!(%target, "cronjob exists");
        Ok(())
    }

    async fn log_pods_seen(&self, namespace: &str) {
        match self.locator.list_all(WorkloadKind::Pod, namespace).await {
            Ok(pods) => {
                let seen: Vec<String> = pods
                    .iter()
                    .map(|p| format!("\"{}\" ({})", p.name, p.images.join(" ")))
                    .collect();
                tracing::warn!(namespace, pods = %seen.join(", "), "pods found at timeout");
            }
            Err(e) => {
                tracing::debug!(namespace, error = %e, "could not list pods for diagnostics");
            }
        }
    }
}
