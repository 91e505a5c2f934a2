//! cluster::locator
//!
//! Find workloads by name prefix and a caller-supplied matcher.

use std::sync::Arc;

use tracing::Instrument;

use super::traits::{ClusterError, Workload, WorkloadKind, WorkloadSource};
use crate::core::config::{Config, DEFAULT_PAGE_SIZE};

/// Looks up Pods and CronJobs through a [`WorkloadSource`].
///
/// Listings are paged with a continue token until a match is found or the
/// listing is exhausted. Order within a page is whatever the API returns.
#[derive(Clone)]
pub struct ResourceLocator {
    source: Arc<dyn WorkloadSource>,
    page_size: u32,
    span: tracing::Span,
}

impl std::fmt::Debug for ResourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLocator")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl ResourceLocator {
    pub fn new(source: Arc<dyn WorkloadSource>) -> Self {
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
            span: tracing::info_span!("locate"),
        }
    }

    /// Page size from `[cluster]` config.
    pub fn from_config(source: Arc<dyn WorkloadSource>, config: &Config) -> Self {
        Self::new(source).with_page_size(config.page_size())
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// First workload of `kind` whose name starts with `prefix` and for
    /// which `matcher` holds.
    ///
    /// Returns `Ok(None)` when nothing matches.
    pub async fn find<M>(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        prefix: &str,
        matcher: M,
    ) -> Result<Option<Workload>, ClusterError>
    where
        M: Fn(&Workload) -> bool + Send,
    {
        async {
            let mut continue_token: Option<String> = None;
            loop {
                let page = self
                    .source
                    .list(kind, namespace, self.page_size, continue_token.as_deref())
                    .await?;

                let found = page
                    .items
                    .into_iter()
                    .find(|w| w.name.starts_with(prefix) && matcher(w));
                if let Some(workload) = found {
                    tracing::debug!(%kind, namespace, name = %workload.name, "found workload");
                    return Ok(Some(workload));
                }

                match page.continue_token {
                    Some(token) => continue_token = Some(token),
                    None => return Ok(None),
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// First pod named `prefix*` with a container image containing `image`.
    ///
    /// With `image = None` any pod with the prefix matches.
    pub async fn find_pod(
        &self,
        namespace: &str,
        prefix: &str,
        image: Option<&str>,
    ) -> Result<Option<Workload>, ClusterError> {
        self.find(WorkloadKind::Pod, namespace, prefix, |w| {
            image.map_or(true, |needle| w.has_image_containing(needle))
        })
        .await
    }

    /// First CronJob named `prefix*`.
    pub async fn find_cron_job(
        &self,
        namespace: &str,
        prefix: &str,
    ) -> Result<Option<Workload>, ClusterError> {
        self.find(WorkloadKind::CronJob, namespace, prefix, |_| true)
            .await
    }

    /// Workload with exactly `name`.
    pub async fn get(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<Workload, ClusterError> {
        self.source
            .get(kind, namespace, name)
            .instrument(self.span.clone())
            .await
    }

    /// Every workload of `kind` in `namespace`, across all pages.
    pub async fn list_all(
        &self,
        kind: WorkloadKind,
        namespace: &str,
    ) -> Result<Vec<Workload>, ClusterError> {
        let mut all = Vec::new();
        let mut continue_token: Option<String> = None;
        loop {
            let page = self
                .source
                .list(kind, namespace, self.page_size, continue_token.as_deref())
                .await?;
            all.extend(page.items);
            match page.continue_token {
                Some(token) => continue_token = Some(token),
                None => return Ok(all),
            }
        }
    }
}
