use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::cluster::ClusterApi;

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const PHASE_RUNNING: &str = "Running";
const TERMINAL_PHASES: [&str; 2] = ["Failed", "Succeeded"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Running,
    TimedOut,
    /// The pod reached a phase it will never leave.
    Terminated {
        phase: String,
    },
}

/// Polls a pod until it reports the `Running` phase or the deadline passes.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessWaiter {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ReadinessWaiter {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ReadinessWaiter {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Fetch errors count as "not running yet" so a transient API hiccup
    /// does not abort the wait.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(ns = %ns, pod = %name)
    )]
    pub async fn wait_running(
        &self,
        api: &dyn ClusterApi,
        name: &str,
        ns: &str,
    ) -> WaitOutcome {
        let start = Instant::now();
        loop {
            if start.elapsed() > self.timeout {
                debug!(elapsed = ?start.elapsed(), "readiness wait timed out");
                return WaitOutcome::TimedOut;
            }
            match api.get_pod(name, ns).await {
                Ok(pod) => {
                    let phase = pod.status.and_then(|s| s.phase);
                    match phase.as_deref() {
                        Some(PHASE_RUNNING) => return WaitOutcome::Running,
                        Some(p) if TERMINAL_PHASES.contains(&p) => {
                            return WaitOutcome::Terminated {
                                phase: p.to_string(),
                            };
                        }
                        other => trace!(phase = ?other, "pod not running yet"),
                    }
                }
                Err(e) => trace!(error = %e, "pod fetch failed; retrying"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
