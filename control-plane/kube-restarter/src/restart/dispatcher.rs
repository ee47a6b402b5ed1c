use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Pod, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, info, instrument, warn};

use super::names::replacement_name;
use super::waiter::{ReadinessWaiter, WaitOutcome};
use super::{LedgerKey, ResourceKind, RestartLedger};
use crate::cluster::ClusterApi;
use crate::error::RestartError;

/// Same annotation `kubectl rollout restart` sets on the pod template.
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// What a successful restart call actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// The template annotation was written; the platform performs the rollout.
    RolloutTriggered { kind: ResourceKind, name: String },
    /// ReplicaSet with no Deployment owner: nothing to restart.
    NoDeploymentOwner { replica_set: String },
    /// Escalation reached a controller already restarted in this run.
    AlreadyRestarted { key: LedgerKey },
    /// Replacement is running and the original pod was deleted.
    Replaced { replacement: String },
    /// Replacement never became ready; both pods are left in place.
    ReplacementTimedOut { replacement: String },
    Skipped,
}

/// Controllers restarted by touching their pod template.
trait PodTemplateOwner {
    fn pod_template_mut(&mut self) -> &mut PodTemplateSpec;
}

impl PodTemplateOwner for Deployment {
    fn pod_template_mut(&mut self) -> &mut PodTemplateSpec {
        &mut self.spec.get_or_insert_with(Default::default).template
    }
}

impl PodTemplateOwner for DaemonSet {
    fn pod_template_mut(&mut self) -> &mut PodTemplateSpec {
        &mut self.spec.get_or_insert_with(Default::default).template
    }
}

impl PodTemplateOwner for StatefulSet {
    fn pod_template_mut(&mut self) -> &mut PodTemplateSpec {
        &mut self.spec.get_or_insert_with(Default::default).template
    }
}

fn stamp_restarted_at<K: PodTemplateOwner>(obj: &mut K, at: &str) {
    obj.pod_template_mut()
        .metadata
        .get_or_insert_with(Default::default)
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(RESTARTED_AT_ANNOTATION.to_string(), at.to_string());
}

fn restart_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Performs the kind-specific restart action.
#[derive(Clone)]
pub struct RestartDispatcher {
    api: Arc<dyn ClusterApi>,
    waiter: ReadinessWaiter,
    name_max_len: usize,
}

impl RestartDispatcher {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        waiter: ReadinessWaiter,
        name_max_len: usize,
    ) -> Self {
        Self {
            api,
            waiter,
            name_max_len,
        }
    }

    /// Restart `name` of the given kind in the namespace of `pod`. For
    /// [`ResourceKind::Pod`] the pod itself is replaced and `name` is ignored.
    ///
    /// The ledger is only read, to stop an escalation from restarting a
    /// Deployment twice; recording is the caller's job.
    #[instrument(
        skip(self, pod, ledger),
        fields(pod = %pod.metadata.name.as_deref().unwrap_or_default())
    )]
    pub async fn restart(
        &self,
        kind: ResourceKind,
        name: &str,
        pod: &Pod,
        ledger: &RestartLedger,
    ) -> Result<RestartOutcome, RestartError> {
        let ns = pod.metadata.namespace.as_deref().unwrap_or("default");
        match kind {
            ResourceKind::Deployment => self.restart_deployment(name, ns).await,
            ResourceKind::DaemonSet => self.restart_daemon_set(name, ns).await,
            ResourceKind::StatefulSet => {
                self.restart_stateful_set(name, ns).await
            }
            ResourceKind::ReplicaSet => {
                self.escalate_replica_set(name, ns, ledger).await
            }
            ResourceKind::Pod => self.replace_pod(pod, ns).await,
            ResourceKind::Unsupported => Ok(RestartOutcome::Skipped),
        }
    }

    async fn restart_deployment(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<RestartOutcome, RestartError> {
        let kind = ResourceKind::Deployment;
        let mut dep = self
            .api
            .get_deployment(name, ns)
            .await
            .map_err(|e| RestartError::fetch(kind, name, ns, e))?;
        stamp_restarted_at(&mut dep, &restart_timestamp());
        self.api
            .replace_deployment(ns, &dep)
            .await
            .map_err(|e| RestartError::from_update(kind, name, ns, e))?;
        info!(%ns, %name, %kind, "rollout restart triggered");
        Ok(RestartOutcome::RolloutTriggered {
            kind,
            name: name.to_string(),
        })
    }

    async fn restart_daemon_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<RestartOutcome, RestartError> {
        let kind = ResourceKind::DaemonSet;
        let mut ds = self
            .api
            .get_daemon_set(name, ns)
            .await
            .map_err(|e| RestartError::fetch(kind, name, ns, e))?;
        stamp_restarted_at(&mut ds, &restart_timestamp());
        self.api
            .replace_daemon_set(ns, &ds)
            .await
            .map_err(|e| RestartError::from_update(kind, name, ns, e))?;
        info!(%ns, %name, %kind, "rollout restart triggered");
        Ok(RestartOutcome::RolloutTriggered {
            kind,
            name: name.to_string(),
        })
    }

    async fn restart_stateful_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<RestartOutcome, RestartError> {
        let kind = ResourceKind::StatefulSet;
        let mut sts = self
            .api
            .get_stateful_set(name, ns)
            .await
            .map_err(|e| RestartError::fetch(kind, name, ns, e))?;
        stamp_restarted_at(&mut sts, &restart_timestamp());
        self.api
            .replace_stateful_set(ns, &sts)
            .await
            .map_err(|e| RestartError::from_update(kind, name, ns, e))?;
        info!(%ns, %name, %kind, "rollout restart triggered");
        Ok(RestartOutcome::RolloutTriggered {
            kind,
            name: name.to_string(),
        })
    }

    /// A ReplicaSet does not own its template; restart its Deployment instead.
    /// Only one hop is followed.
    async fn escalate_replica_set(
        &self,
        name: &str,
        ns: &str,
        ledger: &RestartLedger,
    ) -> Result<RestartOutcome, RestartError> {
        let rs = self
            .api
            .get_replica_set(name, ns)
            .await
            .map_err(|e| {
                RestartError::fetch(ResourceKind::ReplicaSet, name, ns, e)
            })?;
        let parent = rs
            .metadata
            .owner_references
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|o| {
                ResourceKind::classify(Some(o.kind.as_str()))
                    == ResourceKind::Deployment
            });
        match parent {
            Some(owner) => {
                let key = LedgerKey::controller(
                    &owner.name,
                    ResourceKind::Deployment,
                    ns,
                );
                if ledger.contains(&key) {
                    info!(
                        %key,
                        replica_set = %name,
                        "skipping already restarted resource"
                    );
                    return Ok(RestartOutcome::AlreadyRestarted { key });
                }
                debug!(
                    %ns,
                    replica_set = %name,
                    deployment = %owner.name,
                    "escalating to owning deployment"
                );
                self.restart_deployment(&owner.name, ns).await
            }
            None => {
                info!(
                    %ns,
                    replica_set = %name,
                    "replicaset has no deployment owner; nothing to restart"
                );
                Ok(RestartOutcome::NoDeploymentOwner {
                    replica_set: name.to_string(),
                })
            }
        }
    }

    /// Clone the pod under a new name, wait for it to run, then delete the
    /// original. The original is kept unless the replacement is running.
    async fn replace_pod(
        &self,
        pod: &Pod,
        ns: &str,
    ) -> Result<RestartOutcome, RestartError> {
        let original = pod.metadata.name.clone().unwrap_or_default();
        let new_name = replacement_name(&original, self.name_max_len);
        let replacement = Pod {
            metadata: ObjectMeta {
                name: Some(new_name.clone()),
                namespace: Some(ns.to_string()),
                labels: pod.metadata.labels.clone(),
                ..Default::default()
            },
            spec: pod.spec.clone(),
            ..Default::default()
        };

        let created = self
            .api
            .create_pod(ns, &replacement)
            .await
            .map_err(|e| RestartError::Create {
                name: new_name.clone(),
                namespace: ns.to_string(),
                source: e,
            })?;
        let created_name = created.metadata.name.unwrap_or(new_name);

        let waited = self
            .waiter
            .wait_running(self.api.as_ref(), &created_name, ns)
            .await;
        match waited {
            WaitOutcome::Running => {
                info!(
                    %ns,
                    pod = %original,
                    replacement = %created_name,
                    "replacing pod"
                );
                self.api.delete_pod(&original, ns).await.map_err(|e| {
                    RestartError::Delete {
                        name: original.clone(),
                        namespace: ns.to_string(),
                        source: e,
                    }
                })?;
                Ok(RestartOutcome::Replaced {
                    replacement: created_name,
                })
            }
            WaitOutcome::TimedOut => {
                warn!(
                    %ns,
                    pod = %original,
                    replacement = %created_name,
                    timeout = ?self.waiter.timeout,
                    "timed out waiting for replacement pod; original kept"
                );
                Ok(RestartOutcome::ReplacementTimedOut {
                    replacement: created_name,
                })
            }
            WaitOutcome::Terminated { phase } => {
                Err(RestartError::ReplacementFailed {
                    original,
                    replacement: created_name,
                    namespace: ns.to_string(),
                    phase,
                })
            }
        }
    }
}
