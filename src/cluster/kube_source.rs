//! cluster::kube_source
//!
//! `WorkloadSource` backed by the Kubernetes API: Pods from `core/v1`,
//! CronJobs from `batch/v1`.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use kube::api::{ListParams, ObjectList};
use kube::{Api, Client, ResourceExt};

use super::traits::{ClusterError, Workload, WorkloadKind, WorkloadPage, WorkloadSource};

/// Reads workloads through a `kube::Client`.
#[derive(Clone)]
pub struct KubeWorkloadSource {
    client: Client,
}

impl std::fmt::Debug for KubeWorkloadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeWorkloadSource").finish_non_exhaustive()
    }
}

impl KubeWorkloadSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient kubeconfig or in-cluster environment.
    pub async fn try_default() -> Result<Self, ClusterError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Client(e.to_string()))?;
        Ok(Self::new(client))
    }
}

fn map_kube_error(kind: WorkloadKind, namespace: &str, name: &str, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => ClusterError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(resp) => ClusterError::Api {
            status: resp.code,
            message: resp.message,
        },
        other => ClusterError::Client(other.to_string()),
    }
}

fn container_images(spec: Option<&PodSpec>) -> Vec<String> {
    spec.map(|s| {
        s.containers
            .iter()
            .map(|c| c.image.clone().unwrap_or_default())
            .collect()
    })
    .unwrap_or_default()
}

fn pod_to_workload(pod: Pod, namespace: &str) -> Workload {
    Workload {
        kind: WorkloadKind::Pod,
        namespace: pod.namespace().unwrap_or_else(|| namespace.to_string()),
        name: pod.name_any(),
        phase: pod.status.as_ref().and_then(|s| s.phase.clone()),
        images: container_images(pod.spec.as_ref()),
    }
}

fn cron_job_to_workload(cron_job: CronJob, namespace: &str) -> Workload {
    let pod_spec = cron_job
        .spec
        .as_ref()
        .and_then(|s| s.job_template.spec.as_ref())
        .and_then(|j| j.template.spec.as_ref());
    Workload {
        kind: WorkloadKind::CronJob,
        namespace: cron_job.namespace().unwrap_or_else(|| namespace.to_string()),
        name: cron_job.name_any(),
        phase: None,
        images: container_images(pod_spec),
    }
}

fn into_page<K>(list: ObjectList<K>, convert: impl Fn(K) -> Workload) -> WorkloadPage
where
    K: Clone,
{
    let continue_token = list.metadata.continue_.clone().filter(|t| !t.is_empty());
    WorkloadPage {
        items: list.items.into_iter().map(convert).collect(),
        continue_token,
    }
}

#[async_trait]
impl WorkloadSource for KubeWorkloadSource {
    async fn list(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<WorkloadPage, ClusterError> {
        let mut params = ListParams::default().limit(limit);
        if let Some(token) = continue_token {
            params = params.continue_token(token);
        }
        tracing::debug!(%kind, namespace, limit, paged = continue_token.is_some(), "listing workloads");

        match kind {
            WorkloadKind::Pod => {
                let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
                let list = api
                    .list(&params)
                    .await
                    .map_err(|e| map_kube_error(kind, namespace, "", e))?;
                Ok(into_page(list, |p| pod_to_workload(p, namespace)))
            }
            WorkloadKind::CronJob => {
                let api: Api<CronJob> = Api::namespaced(self.client.clone(), namespace);
                let list = api
                    .list(&params)
                    .await
                    .map_err(|e| map_kube_error(kind, namespace, "", e))?;
                Ok(into_page(list, |c| cron_job_to_workload(c, namespace)))
            }
        }
    }

    async fn get(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<Workload, ClusterError> {
        match kind {
            WorkloadKind::Pod => {
                let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
                let pod = api
                    .get(name)
                    .await
                    .map_err(|e| map_kube_error(kind, namespace, name, e))?;
                Ok(pod_to_workload(pod, namespace))
            }
            WorkloadKind::CronJob => {
                let api: Api<CronJob> = Api::namespaced(self.client.clone(), namespace);
                let cron_job = api
                    .get(name)
                    .await
                    .map_err(|e| map_kube_error(kind, namespace, name, e))?;
                Ok(cron_job_to_workload(cron_job, namespace))
            }
        }
    }
}
