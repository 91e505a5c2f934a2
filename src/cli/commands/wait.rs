//! wait command - Block until a workload reaches a state
//!
//! Ctrl-C cancels the wait.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};

use crate::cli::args::{WaitCondition, WaitTiming};
use crate::cluster::{KubeWorkloadSource, ReadinessChecks, ResourceLocator};
use crate::core::config::Config;
use crate::poll::{CancellationToken, ConditionPoller};

fn seconds(flag: &str, value: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(value) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => bail!("--{} must be a positive number of seconds, got {}", flag, value),
    }
}

/// Poller from config, with command-line overrides applied.
pub(crate) fn poller_for(config: &Config, timing: &WaitTiming) -> Result<ConditionPoller> {
    let interval = match timing.interval {
        Some(v) => seconds("interval", v)?,
        None => config.poll_interval(),
    };
    let timeout = match timing.timeout {
        Some(v) => seconds("timeout", v)?,
        None => config.poll_timeout(),
    };
    if interval > timeout {
        bail!("interval ({:?}) is longer than timeout ({:?})", interval, timeout);
    }
    Ok(ConditionPoller::new(interval, timeout))
}

/// Run the wait command.
pub fn wait(config: &Config, condition: WaitCondition) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(wait_async(config, condition))
}

async fn wait_async(config: &Config, condition: WaitCondition) -> Result<()> {
    let timing = condition.timing();
    let namespace = timing.namespace.clone();

    let cancel = CancellationToken::new();
    let poller = poller_for(config, timing)?
        .with_cancellation(cancel.clone())
        .with_span(tracing::info_span!("wait", namespace = %namespace));

    let source = KubeWorkloadSource::try_default()
        .await
        .context("cannot reach the cluster")?;
    let locator = ResourceLocator::from_config(Arc::new(source), config);
    let checks = ReadinessChecks::new(locator, poller);

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match &condition {
        WaitCondition::Pod { name, .. } => checks.wait_for_pod(&namespace, name).await?,
        WaitCondition::PodImage { prefix, image, .. } => {
            checks.wait_for_pod_with_image(&namespace, prefix, image).await?
        }
        WaitCondition::PodAbsent { prefix, image, .. } => {
            checks
                .wait_for_pod_absence(&namespace, prefix, image.as_deref())
                .await?
        }
        WaitCondition::Cronjob { prefix, .. } => checks.wait_for_cron_job(&namespace, prefix).await?,
    }

    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(interval: Option<f64>, timeout: Option<f64>) -> WaitTiming {
        WaitTiming {
            namespace: "default".into(),
            interval,
            timeout,
        }
    }

    #[test]
    fn config_defaults_apply() {
        let config = Config::default();
        let poller = poller_for(&config, &timing(None, None)).unwrap();
        assert_eq!(poller.interval(), config.poll_interval());
        assert_eq!(poller.timeout(), config.poll_timeout());
    }

    #[test]
    fn flags_override_config() {
        let poller = poller_for(&Config::default(), &timing(Some(0.5), Some(10.0))).unwrap();
        assert_eq!(poller.interval(), Duration::from_millis(500));
        assert_eq!(poller.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(poller_for(&Config::default(), &timing(Some(0.0), None)).is_err());
        assert!(poller_for(&Config::default(), &timing(Some(-1.0), None)).is_err());
        assert!(poller_for(&Config::default(), &timing(Some(5.0), Some(1.0))).is_err());
    }
}
