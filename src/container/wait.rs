// SPDX-License-Identifier: GPL-3.0-only
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::container::traits::ContainerProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WaitError {
    #[error("Container '{0}' not available")]
    TimedOut(String),

    #[error("Wait for container '{0}' cancelled")]
    Cancelled(String),
}

/// Poll the probe at a fixed interval until the container shows up, the
/// timeout elapses, or the token is cancelled. The first poll happens
/// immediately.
pub async fn wait_for_container(
    probe: &dyn ContainerProbe,
    container_id: &str,
    policy: WaitPolicy,
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    let polling = async {
        let mut interval = tokio::time::interval(policy.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if probe.is_available(container_id).await {
                return;
            }
            debug!(container_id = %container_id, "Container not mounted yet");
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WaitError::Cancelled(container_id.to_string())),
        result = tokio::time::timeout(policy.timeout, polling) => {
            result.map_err(|_| WaitError::TimedOut(container_id.to_string()))
        }
    }
}
