#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{
    DaemonSet, Deployment, ReplicaSet, StatefulSet,
};
use k8s_openapi::api::core::v1::Pod;
use kube::core::ErrorResponse;
use kube_restarter::cluster::ClusterApi;
use kube_restarter::restart::RESTARTED_AT_ANNOTATION;
use serde_json::json;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: format!("fake {reason}"),
        reason: reason.into(),
        code,
    })
}

fn not_found() -> kube::Error {
    api_error(404, "NotFound")
}

// ---- fixtures -------------------------------------------------------------

/// Pod fixture; `owners` are `(kind, name)` pairs in owner-reference order.
pub fn pod(name: &str, ns: &str, owners: &[(&str, &str)]) -> Pod {
    let refs: Vec<_> = owners
        .iter()
        .map(|(kind, owner)| {
            json!({
                "apiVersion": "apps/v1",
                "kind": kind,
                "name": owner,
                "uid": format!("uid-{owner}"),
            })
        })
        .collect();
    let mut metadata = json!({
        "name": name,
        "namespace": ns,
        "labels": { "app": name },
    });
    if !refs.is_empty() {
        metadata["ownerReferences"] = json!(refs);
    }
    serde_json::from_value(json!({
        "metadata": metadata,
        "spec": { "containers": [{ "name": "main", "image": "postgres:16" }] },
        "status": { "phase": "Running" },
    }))
    .expect("pod fixture")
}

fn template_owner(kind: &str, name: &str, ns: &str) -> serde_json::Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": kind,
        "metadata": { "name": name, "namespace": ns },
        "spec": {
            "selector": { "matchLabels": { "app": name } },
            "template": {
                "metadata": { "labels": { "app": name } },
                "spec": {
                    "containers": [{ "name": "main", "image": "postgres:16" }]
                }
            }
        }
    })
}

pub fn deployment(name: &str, ns: &str) -> Deployment {
    serde_json::from_value(template_owner("Deployment", name, ns))
        .expect("deployment fixture")
}

pub fn daemon_set(name: &str, ns: &str) -> DaemonSet {
    serde_json::from_value(template_owner("DaemonSet", name, ns))
        .expect("daemonset fixture")
}

pub fn stateful_set(name: &str, ns: &str) -> StatefulSet {
    let mut v = template_owner("StatefulSet", name, ns);
    v["spec"]["serviceName"] = json!(name);
    serde_json::from_value(v).expect("statefulset fixture")
}

/// ReplicaSet fixture, optionally owned by `(kind, name)`.
pub fn replica_set(
    name: &str,
    ns: &str,
    owner: Option<(&str, &str)>,
) -> ReplicaSet {
    let mut v = template_owner("ReplicaSet", name, ns);
    if let Some((kind, owner)) = owner {
        v["metadata"]["ownerReferences"] = json!([{
            "apiVersion": "apps/v1",
            "kind": kind,
            "name": owner,
            "uid": format!("uid-{owner}"),
        }]);
    }
    serde_json::from_value(v).expect("replicaset fixture")
}

/// Read the restart annotation off a controller's pod template.
pub trait AsTemplateAnnotations {
    fn restarted_at(&self) -> Option<String>;
}

macro_rules! template_annotations {
    ($ty:ty) => {
        impl AsTemplateAnnotations for $ty {
            fn restarted_at(&self) -> Option<String> {
                self.spec
                    .as_ref()
                    .and_then(|s| s.template.metadata.as_ref())
                    .and_then(|m| m.annotations.as_ref())
                    .and_then(|a| a.get(RESTARTED_AT_ANNOTATION).cloned())
            }
        }
    };
}

template_annotations!(Deployment);
template_annotations!(DaemonSet);
template_annotations!(StatefulSet);

// ---- fake cluster ---------------------------------------------------------

/// A call made against the fake, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ReplaceDeployment(String),
    ReplaceDaemonSet(String),
    ReplaceStatefulSet(String),
    GetReplicaSet(String),
    CreatePod(String),
    DeletePod(String),
    GetPod(String),
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Call::GetReplicaSet(_) | Call::GetPod(_))
    }
}

/// How pods created by the restarter behave when polled.
#[derive(Debug, Clone)]
pub enum ReplacementPlan {
    /// Fail this many fetches, report Pending for `pending` more polls,
    /// then Running.
    RunningAfter { fetch_errors: usize, pending: usize },
    /// Stay Pending forever.
    NeverRunning,
    /// Report the given phase on every poll.
    Phase(String),
}

#[derive(Default)]
struct State {
    pods: Vec<Pod>,
    deployments: HashMap<(String, String), Deployment>,
    daemon_sets: HashMap<(String, String), DaemonSet>,
    stateful_sets: HashMap<(String, String), StatefulSet>,
    replica_sets: HashMap<(String, String), ReplicaSet>,
    created: HashSet<String>,
    polls: HashMap<String, usize>,
    calls: Vec<Call>,
    /// `"op:name"` -> number of upcoming calls that fail
    failures: HashMap<String, (usize, u16)>,
    list_error: bool,
}

/// In-memory cluster recording every call made through [`ClusterApi`].
pub struct FakeCluster {
    state: Mutex<State>,
    plan: ReplacementPlan,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}

fn key(name: &str, ns: &str) -> (String, String) {
    (ns.to_string(), name.to_string())
}

fn name_of<K: kube::Resource>(obj: &K) -> String {
    obj.meta().name.clone().unwrap_or_default()
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            plan: ReplacementPlan::RunningAfter {
                fetch_errors: 0,
                pending: 0,
            },
        }
    }

    pub fn with_plan(mut self, plan: ReplacementPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_pod(self, pod: Pod) -> Self {
        self.state.lock().unwrap().pods.push(pod);
        self
    }

    pub fn with_deployment(self, dep: Deployment) -> Self {
        let k = key(&name_of(&dep), dep.metadata.namespace.as_deref().unwrap());
        self.state.lock().unwrap().deployments.insert(k, dep);
        self
    }

    pub fn with_daemon_set(self, ds: DaemonSet) -> Self {
        let k = key(&name_of(&ds), ds.metadata.namespace.as_deref().unwrap());
        self.state.lock().unwrap().daemon_sets.insert(k, ds);
        self
    }

    pub fn with_stateful_set(self, sts: StatefulSet) -> Self {
        let k = key(&name_of(&sts), sts.metadata.namespace.as_deref().unwrap());
        self.state.lock().unwrap().stateful_sets.insert(k, sts);
        self
    }

    pub fn with_replica_set(self, rs: ReplicaSet) -> Self {
        let k = key(&name_of(&rs), rs.metadata.namespace.as_deref().unwrap());
        self.state.lock().unwrap().replica_sets.insert(k, rs);
        self
    }

    /// Make the next `times` calls of `op` (e.g. `"replace_deployment"`)
    /// against `name` fail with the given HTTP status.
    pub fn fail(self, op: &str, name: &str, times: usize, code: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(format!("{op}:{name}"), (times, code));
        self
    }

    pub fn fail_list(self) -> Self {
        self.state.lock().unwrap().list_error = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn created_pods(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreatePod(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn pod_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .pods
            .iter()
            .map(name_of)
            .collect()
    }

    pub fn deployment(&self, name: &str, ns: &str) -> Option<Deployment> {
        self.state.lock().unwrap().deployments.get(&key(name, ns)).cloned()
    }

    pub fn daemon_set(&self, name: &str, ns: &str) -> Option<DaemonSet> {
        self.state.lock().unwrap().daemon_sets.get(&key(name, ns)).cloned()
    }

    pub fn stateful_set(&self, name: &str, ns: &str) -> Option<StatefulSet> {
        self.state
            .lock()
            .unwrap()
            .stateful_sets
            .get(&key(name, ns))
            .cloned()
    }

    fn injected(
        state: &mut State,
        op: &str,
        name: &str,
    ) -> Result<(), kube::Error> {
        if let Some((remaining, code)) =
            state.failures.get_mut(&format!("{op}:{name}"))
        {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(api_error(*code, "Injected"));
            }
        }
        Ok(())
    }

    fn poll_created(
        &self,
        state: &mut State,
        name: &str,
        ns: &str,
    ) -> Result<Pod, kube::Error> {
        let polls = state.polls.entry(name.to_string()).or_insert(0);
        *polls += 1;
        let n = *polls;
        let phase = match &self.plan {
            ReplacementPlan::RunningAfter {
                fetch_errors,
                pending,
            } => {
                if n <= *fetch_errors {
                    return Err(api_error(503, "ServiceUnavailable"));
                }
                if n <= fetch_errors + pending {
                    "Pending".to_string()
                } else {
                    "Running".to_string()
                }
            }
            ReplacementPlan::NeverRunning => "Pending".to_string(),
            ReplacementPlan::Phase(p) => p.clone(),
        };
        let mut pod = state
            .pods
            .iter()
            .find(|p| is_pod(p, name, ns))
            .cloned()
            .ok_or_else(not_found)?;
        pod.status.get_or_insert_with(Default::default).phase = Some(phase);
        Ok(pod)
    }
}

fn is_pod(pod: &Pod, name: &str, ns: &str) -> bool {
    name_of(pod) == name && pod.metadata.namespace.as_deref() == Some(ns)
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_pods(&self) -> Result<Vec<Pod>, kube::Error> {
        let st = self.state.lock().unwrap();
        if st.list_error {
            return Err(api_error(403, "Forbidden"));
        }
        Ok(st.pods.clone())
    }

    async fn get_pod(&self, name: &str, ns: &str) -> Result<Pod, kube::Error> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::GetPod(name.to_string()));
        Self::injected(&mut st, "get_pod", name)?;
        if st.created.contains(name) {
            return self.poll_created(&mut st, name, ns);
        }
        st.pods
            .iter()
            .find(|p| is_pod(p, name, ns))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create_pod(
        &self,
        ns: &str,
        pod: &Pod,
    ) -> Result<Pod, kube::Error> {
        let mut st = self.state.lock().unwrap();
        let name = name_of(pod);
        st.calls.push(Call::CreatePod(name.clone()));
        Self::injected(&mut st, "create_pod", "*")?;
        if st.pods.iter().any(|p| is_pod(p, &name, ns)) {
            return Err(api_error(409, "AlreadyExists"));
        }
        let mut created = pod.clone();
        created.metadata.namespace = Some(ns.to_string());
        created.status = None;
        st.pods.push(created.clone());
        st.created.insert(name);
        Ok(created)
    }

    async fn delete_pod(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<(), kube::Error> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::DeletePod(name.to_string()));
        Self::injected(&mut st, "delete_pod", name)?;
        let before = st.pods.len();
        st.pods.retain(|p| !is_pod(p, name, ns));
        if st.pods.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn get_deployment(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<Deployment, kube::Error> {
        let mut st = self.state.lock().unwrap();
        Self::injected(&mut st, "get_deployment", name)?;
        st.deployments
            .get(&key(name, ns))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn replace_deployment(
        &self,
        ns: &str,
        dep: &Deployment,
    ) -> Result<Deployment, kube::Error> {
        let mut st = self.state.lock().unwrap();
        let name = name_of(dep);
        st.calls.push(Call::ReplaceDeployment(name.clone()));
        Self::injected(&mut st, "replace_deployment", &name)?;
        st.deployments.insert(key(&name, ns), dep.clone());
        Ok(dep.clone())
    }

    async fn get_daemon_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<DaemonSet, kube::Error> {
        let mut st = self.state.lock().unwrap();
        Self::injected(&mut st, "get_daemon_set", name)?;
        st.daemon_sets
            .get(&key(name, ns))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn replace_daemon_set(
        &self,
        ns: &str,
        ds: &DaemonSet,
    ) -> Result<DaemonSet, kube::Error> {
        let mut st = self.state.lock().unwrap();
        let name = name_of(ds);
        st.calls.push(Call::ReplaceDaemonSet(name.clone()));
        Self::injected(&mut st, "replace_daemon_set", &name)?;
        st.daemon_sets.insert(key(&name, ns), ds.clone());
        Ok(ds.clone())
    }

    async fn get_stateful_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<StatefulSet, kube::Error> {
        let mut st = self.state.lock().unwrap();
        Self::injected(&mut st, "get_stateful_set", name)?;
        st.stateful_sets
            .get(&key(name, ns))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn replace_stateful_set(
        &self,
        ns: &str,
        sts: &StatefulSet,
    ) -> Result<StatefulSet, kube::Error> {
        let mut st = self.state.lock().unwrap();
        let name = name_of(sts);
        st.calls.push(Call::ReplaceStatefulSet(name.clone()));
        Self::injected(&mut st, "replace_stateful_set", &name)?;
        st.stateful_sets.insert(key(&name, ns), sts.clone());
        Ok(sts.clone())
    }

    async fn get_replica_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<ReplicaSet, kube::Error> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::GetReplicaSet(name.to_string()));
        Self::injected(&mut st, "get_replica_set", name)?;
        st.replica_sets
            .get(&key(name, ns))
            .cloned()
            .ok_or_else(not_found)
    }
}
