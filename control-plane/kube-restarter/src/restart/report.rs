use std::fmt;

use super::RestartLedger;
use crate::error::RestartError;

/// A restart failure for a single pod.
#[derive(Debug)]
pub struct PodError {
    pub pod: String,
    pub error: RestartError,
}

/// Run summary: per-pod failures plus what was restarted.
#[derive(Debug, Default)]
pub struct RunReport {
    pub errors: Vec<PodError>,
    pub restarted: Vec<String>,
    /// Replacement pods that never became ready; originals still running.
    pub timed_out: Vec<String>,
    /// ReplicaSets skipped because no Deployment owns them.
    pub without_deployment: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(
        &mut self,
        pod: impl Into<String>,
        error: RestartError,
    ) {
        self.errors.push(PodError {
            pod: pod.into(),
            error,
        });
    }

    pub fn record_timed_out(&mut self, replacement: String) {
        self.timed_out.push(replacement);
    }

    /// Pods sharing a ReplicaSet report it once.
    pub fn record_no_owner(&mut self, replica_set: String) {
        if !self.without_deployment.contains(&replica_set) {
            self.without_deployment.push(replica_set);
        }
    }

    /// Copy the ledger's identities, in restart order, into the report.
    pub fn finish(mut self, ledger: &RestartLedger) -> Self {
        self.restarted = ledger.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.errors.is_empty() {
            writeln!(f, "{} pod(s) failed to restart:", self.errors.len())?;
            for e in &self.errors {
                writeln!(f, "  {}: {}", e.pod, e.error)?;
            }
        }
        if !self.without_deployment.is_empty() {
            writeln!(
                f,
                "replicaset(s) without a deployment owner, \
                 nothing restarted: [{}]",
                self.without_deployment.join(", ")
            )?;
        }
        if !self.timed_out.is_empty() {
            writeln!(
                f,
                "replacement pod(s) not ready in time, originals kept: [{}]",
                self.timed_out.join(", ")
            )?;
        }
        write!(
            f,
            "finished restarting {} resources: [{}]",
            self.restarted.len(),
            self.restarted.join(", ")
        )
    }
}
