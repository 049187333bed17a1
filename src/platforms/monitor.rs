//! Fixed-interval status polling after a deploy has been triggered.

use super::DeploymentStatus;
use crate::error::{PlatformError, PlatformResult};
use std::time::Duration;

/// Polling cadence and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between two status checks
    pub interval: Duration,
    /// Number of status checks before giving up
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 30)
    }
}

/// How a monitoring run ended.
#[derive(Debug)]
pub enum PollOutcome {
    /// A terminal state (ready or error) was observed.
    Finished(DeploymentStatus),
    /// The ceiling was reached; carries the last status seen, if any.
    TimedOut(Option<DeploymentStatus>),
    /// A status check failed and polling stopped.
    Interrupted(PlatformError),
}

/// Anything that can report the status of a project's latest deployment.
#[allow(async_fn_in_trait)]
pub trait StatusSource {
    async fn status(&self, project_id: &str) -> PlatformResult<DeploymentStatus>;
}

/// Poll `source` until the deployment reaches a terminal state, a check
/// fails, or the policy's attempt ceiling is reached. `on_tick` sees every
/// status along with its 1-based attempt number.
pub async fn monitor_deployment<S, F>(
    source: &S,
    project_id: &str,
    policy: PollPolicy,
    mut on_tick: F,
) -> PollOutcome
where
    S: StatusSource,
    F: FnMut(u32, &DeploymentStatus),
{
    let mut last = None;

    for attempt in 1..=policy.max_attempts {
        let status = match source.status(project_id).await {
            Ok(status) => status,
            Err(e) => {
                log::debug!("Status check {} failed: {}", attempt, e);
                return PollOutcome::Interrupted(e);
            }
        };

        log::debug!(
            "Status check {}/{}: {} ({})",
            attempt,
            policy.max_attempts,
            status.native,
            status.state
        );
        on_tick(attempt, &status);

        if status.state.is_terminal() {
            return PollOutcome::Finished(status);
        }
        last = Some(status);

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    PollOutcome::TimedOut(last)
}
