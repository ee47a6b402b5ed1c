use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::{info, instrument};

use super::{
    LedgerKey, ResourceKind, RestartDispatcher, RestartLedger, RestartOutcome,
    RunReport,
};
use crate::error::RestartError;

/// Walks a pod's owner references and restarts each supported owner once.
#[derive(Clone)]
pub struct OwnershipResolver {
    dispatcher: RestartDispatcher,
}

impl OwnershipResolver {
    pub fn new(dispatcher: RestartDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Restart whatever owns `pod`, or the pod itself when it has no owner.
    ///
    /// Ledger keys are checked before any mutating call and recorded only
    /// after it succeeds. The first failing owner aborts the pod.
    #[instrument(
        skip_all,
        fields(ns = %pod.namespace().unwrap_or_default(), pod = %pod.name_any())
    )]
    pub async fn resolve_and_restart(
        &self,
        pod: &Pod,
        ledger: &mut RestartLedger,
        report: &mut RunReport,
    ) -> Result<(), RestartError> {
        let pod_name = pod.name_any();
        let ns = pod.namespace().unwrap_or_else(|| "default".to_string());
        let owners = pod.owner_references();

        if owners.is_empty() {
            let key = LedgerKey::pod(&pod_name);
            if ledger.contains(&key) {
                info!(%key, "skipping already replaced pod");
                return Ok(());
            }
            let outcome = self
                .dispatcher
                .restart(ResourceKind::Pod, &pod_name, pod, ledger)
                .await?;
            Self::settle(outcome, &ns, Some(key), ledger, report);
            return Ok(());
        }

        for owner in owners {
            let kind = ResourceKind::classify(Some(owner.kind.as_str()));
            match kind {
                ResourceKind::Unsupported => {
                    info!(
                        owner_kind = %owner.kind,
                        owner = %owner.name,
                        "skipping restart of unsupported resource type"
                    );
                    continue;
                }
                ResourceKind::Pod => continue,
                // Never recorded; escalate_replica_set checks the
                // Deployment key instead.
                ResourceKind::ReplicaSet => {}
                _ => {
                    let key = LedgerKey::controller(&owner.name, kind, &ns);
                    if ledger.contains(&key) {
                        info!(%key, "skipping already restarted resource");
                        continue;
                    }
                }
            }
            let outcome = self
                .dispatcher
                .restart(kind, &owner.name, pod, ledger)
                .await?;
            Self::settle(outcome, &ns, None, ledger, report);
        }
        Ok(())
    }

    /// Record the identity actually mutated by a successful restart.
    fn settle(
        outcome: RestartOutcome,
        ns: &str,
        pod_key: Option<LedgerKey>,
        ledger: &mut RestartLedger,
        report: &mut RunReport,
    ) {
        match outcome {
            RestartOutcome::RolloutTriggered { kind, name } => {
                ledger.record(LedgerKey::controller(&name, kind, ns));
            }
            RestartOutcome::Replaced { .. } => {
                if let Some(key) = pod_key {
                    ledger.record(key);
                }
            }
            RestartOutcome::ReplacementTimedOut { replacement } => {
                if let Some(key) = pod_key {
                    ledger.record(key);
                }
                report.record_timed_out(format!("{}/{}", ns, replacement));
            }
            RestartOutcome::NoDeploymentOwner { replica_set } => {
                report.record_no_owner(format!("{}/{}", ns, replica_set));
            }
            RestartOutcome::AlreadyRestarted { .. }
            | RestartOutcome::Skipped => {}
        }
    }
}
