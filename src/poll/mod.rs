//! poll
//!
//! Bounded waits on caller-defined conditions.
//!
//! # Design
//!
//! [`ConditionPoller::wait_until`] evaluates a predicate immediately, then
//! once per interval, until one of:
//!
//! - the predicate reports [`PollOutcome::Satisfied`] (success)
//! - the predicate reports [`PollOutcome::Fatal`] (abort, no further ticks)
//! - the deadline measured from the first evaluation passes ([`PollError::Timeout`])
//! - the [`CancellationToken`] fires ([`PollError::Cancelled`])
//!
//! "Not there yet" is not an error: predicates return
//! [`PollOutcome::NotYet`] for a resource that does not exist yet, and
//! the loop keeps going. The last sleep is clipped to the remaining budget,
//! so a timeout is reported no later than `timeout + interval`.
//!
//! # Example
//!
//! ```ignore
//! let poller = ConditionPoller::new(Duration::from_secs(1), Duration::from_secs(60));
//! let target = WaitTarget::new("pod", "team-a", "web-0");
//! poller
//!     .wait_until(&target, || async { PollOutcome::<ClusterError>::Satisfied })
//!     .await?;
//! ```

mod cancel;

pub use cancel::CancellationToken;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::Instrument;

use crate::core::config::Config;

/// Result of one predicate evaluation.
#[derive(Debug)]
pub enum PollOutcome<E> {
    /// The condition holds; stop with success.
    Satisfied,
    /// Not yet; evaluate again after the interval.
    NotYet,
    /// Unrecoverable; stop immediately with this error.
    Fatal(E),
}

impl<E> PollOutcome<E> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, PollOutcome::Satisfied)
    }
}

/// `Ok(true)` is satisfied, `Ok(false)` retries, `Err` aborts.
impl<E> From<Result<bool, E>> for PollOutcome<E> {
    fn from(result: Result<bool, E>) -> Self {
        match result {
            Ok(true) => PollOutcome::Satisfied,
            Ok(false) => PollOutcome::NotYet,
            Err(e) => PollOutcome::Fatal(e),
        }
    }
}

/// What a wait is waiting for. Used in logs and error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitTarget {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    /// Extra qualifier, e.g. the image a pod must run.
    pub detail: Option<String>,
}

impl WaitTarget {
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} \"{}\" in namespace \"{}\"", self.kind, self.name, self.namespace)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Broad category of a [`PollError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollErrorKind {
    Timeout,
    Fatal,
    Cancelled,
}

/// Errors from [`ConditionPoller::wait_until`].
#[derive(Debug, Error)]
pub enum PollError {
    #[error("timed out after {elapsed:?} waiting for {target}")]
    Timeout { target: WaitTarget, elapsed: Duration },

    #[error("failed waiting for {target}: {source}")]
    Fatal {
        target: WaitTarget,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("wait for {target} was cancelled")]
    Cancelled { target: WaitTarget },
}

impl PollError {
    pub fn kind(&self) -> PollErrorKind {
        match self {
            PollError::Timeout { .. } => PollErrorKind::Timeout,
            PollError::Fatal { .. } => PollErrorKind::Fatal,
            PollError::Cancelled { .. } => PollErrorKind::Cancelled,
        }
    }

    pub fn target(&self) -> &WaitTarget {
        match self {
            PollError::Timeout { target, .. }
            | PollError::Fatal { target, .. }
            | PollError::Cancelled { target } => target,
        }
    }
}

/// Shortest pause between evaluations.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Repeatedly evaluates a predicate until it holds or the budget runs out.
#[derive(Debug, Clone)]
pub struct ConditionPoller {
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
    span: tracing::Span,
}

impl ConditionPoller {
    /// `interval` is raised to [`MIN_INTERVAL`] if shorter.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            timeout,
            cancel: CancellationToken::new(),
            span: tracing::info_span!("poll"),
        }
    }

    /// Interval and timeout from `[poll]` config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.poll_interval(), config.poll_timeout())
    }

    /// Observe `token` between ticks.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run every wait inside `span`.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Evaluate `predicate` until it is satisfied.
    ///
    /// The first evaluation happens immediately. The deadline is measured
    /// from the start of the call, not per tick.
    ///
    /// # Errors
    ///
    /// - `PollError::Fatal` as soon as the predicate returns `Fatal`
    /// - `PollError::Timeout` once `timeout` has elapsed without success
    /// - `PollError::Cancelled` when the token fires
    pub async fn wait_until<F, Fut, E>(
        &self,
        target: &WaitTarget,
        predicate: F,
    ) -> Result<(), PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PollOutcome<E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.run(target, predicate)
            .instrument(self.span.clone())
            .await
    }

    async fn run<F, Fut, E>(&self, target: &WaitTarget, mut predicate: F) -> Result<(), PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PollOutcome<E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(%target, attempts, "wait cancelled");
                return Err(PollError::Cancelled {
                    target: target.clone(),
                });
            }

            attempts += 1;
            match predicate().await {
                PollOutcome::Satisfied => {
                    tracing::debug!(%target, attempts, elapsed = ?started.elapsed(), "condition met");
                    return Ok(());
                }
                PollOutcome::Fatal(err) => {
                    tracing::warn!(%target, attempts, error = %err, "wait aborted");
                    return Err(PollError::Fatal {
                        target: target.clone(),
                        source: Box::new(err),
                    });
                }
                PollOutcome::NotYet => {
                    tracing::trace!(%target, attempts, "condition not met yet");
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                tracing::warn!(%target, attempts, ?elapsed, "wait timed out");
                return Err(PollError::Timeout {
                    target: target.clone(),
                    elapsed,
                });
            }

            let nap = self.interval.min(self.timeout - elapsed);
            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = self.cancel.cancelled() => {
                    tracing::debug!(%target, attempts, "wait cancelled");
                    return Err(PollError::Cancelled {
                        target: target.clone(),
                    });
                }
            }
        }
    }
}
