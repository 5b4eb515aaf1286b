/*!

The completion watcher. A run's workload pod is polled at a fixed interval until it reaches a
terminal phase; the wait is modeled as a small state machine driven by each observed phase, with
an overall deadline and an explicit cancellation token so an external abort stops the polling
promptly instead of waiting out the clock.

!*/

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use log::{debug, warn};
use snafu::Snafu;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::constants::{DEFAULT_RUN_TIMEOUT_SECS, POLL_INTERVAL_SECS};

pub type Result<T> = std::result::Result<T, Error>;

/// Consecutive poll failures tolerated before the wait gives up.
const MAX_POLL_FAILURES: u32 = 3;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "The pod did not succeed within {:?} (elapsed {:?})",
        timeout,
        elapsed
    ))]
    TimedOut { timeout: Duration, elapsed: Duration },

    #[snafu(display("The pod reached the terminal '{}' phase", phase))]
    PodFailed { phase: PodPhase },

    #[snafu(display(
        "Unable to poll the pod phase ({} consecutive failures): {}",
        attempts,
        message
    ))]
    PollFailed { attempts: u32, message: String },

    #[snafu(display("The wait was cancelled"))]
    Cancelled,
}

/// The coarse lifecycle phase of a pod as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Parse the cluster-native phase string. Anything unrecognized maps to `Unknown`.
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where each poll's phase comes from. The live implementation reads the cluster; tests script
/// phase sequences.
#[async_trait]
pub trait PhaseSource {
    type E: std::error::Error + Send + Sync + 'static;

    async fn phase(&mut self) -> std::result::Result<PodPhase, Self::E>;
}

/// Polls a pod's `status.phase` through the API server.
pub struct PodPhaseSource {
    api: Api<Pod>,
    name: String,
}

impl PodPhaseSource {
    pub fn new(client: Client, namespace: &str, name: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl PhaseSource for PodPhaseSource {
    type E = kube::Error;

    async fn phase(&mut self) -> std::result::Result<PodPhase, kube::Error> {
        let pod = self.api.get(&self.name).await?;
        Ok(pod
            .status
            .and_then(|status| status.phase)
            .map(|phase| PodPhase::parse(&phase))
            .unwrap_or(PodPhase::Unknown))
    }
}

/// Settings for one completion wait.
#[derive(Debug, Clone)]
pub struct WaitSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Stop as soon as the pod reports `Failed` instead of polling out the rest of the budget.
    /// Turning this off tolerates a transient `Failed` before an eventual `Succeeded`.
    pub fail_fast: bool,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            fail_fast: true,
        }
    }
}

/// The wait's state after one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    Waiting,
    Succeeded,
    Failed,
    TimedOut,
}

/// One transition of the wait state machine. Success wins over the deadline: a `Succeeded`
/// observed on the last poll is still a pass.
fn observe(phase: PodPhase, fail_fast: bool, deadline_passed: bool) -> WaitState {
    match phase {
        PodPhase::Succeeded => WaitState::Succeeded,
        PodPhase::Failed if fail_fast => WaitState::Failed,
        _ if deadline_passed => WaitState::TimedOut,
        _ => WaitState::Waiting,
    }
}

/// Poll `source` until the pod succeeds. Returns as soon as `Succeeded` is observed and never
/// polls again afterward. Transient poll errors are retried up to [`MAX_POLL_FAILURES`]
/// consecutive times before the wait fails.
pub async fn wait_for_success<S>(
    source: &mut S,
    settings: &WaitSettings,
    cancel: &CancellationToken,
) -> Result<()>
where
    S: PhaseSource + Send,
{
    let started = Instant::now();
    let mut failures: u32 = 0;
    loop {
        let phase = match source.phase().await {
            Ok(phase) => {
                failures = 0;
                debug!("Observed pod phase {}", phase);
                phase
            }
            Err(err) => {
                failures += 1;
                if failures >= MAX_POLL_FAILURES {
                    return PollFailedSnafu {
                        attempts: failures,
                        message: err.to_string(),
                    }
                    .fail();
                }
                warn!(
                    "Poll failed ({}/{}), retrying: {}",
                    failures, MAX_POLL_FAILURES, err
                );
                PodPhase::Unknown
            }
        };

        let deadline_passed = started.elapsed() >= settings.timeout;
        match observe(phase, settings.fail_fast, deadline_passed) {
            WaitState::Succeeded => return Ok(()),
            WaitState::Failed => return PodFailedSnafu { phase }.fail(),
            WaitState::TimedOut => {
                return TimedOutSnafu {
                    timeout: settings.timeout,
                    elapsed: started.elapsed(),
                }
                .fail()
            }
            WaitState::Waiting => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => return CancelledSnafu.fail(),
            _ = tokio::time::sleep(settings.poll_interval) => {}
        }
    }
}
