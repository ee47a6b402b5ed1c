use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{
    DaemonSet, Deployment, ReplicaSet, StatefulSet,
};
use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, PostParams};

/// Operations the restart engine needs from the cluster.
///
/// Every lookup is by `(name, namespace)`. Pods are listed across all
/// namespaces since there is no label to select on.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_pods(&self) -> Result<Vec<Pod>, kube::Error>;

    async fn get_pod(&self, name: &str, ns: &str) -> Result<Pod, kube::Error>;
    async fn create_pod(&self, ns: &str, pod: &Pod)
    -> Result<Pod, kube::Error>;
    async fn delete_pod(&self, name: &str, ns: &str)
    -> Result<(), kube::Error>;

    async fn get_deployment(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<Deployment, kube::Error>;
    async fn replace_deployment(
        &self,
        ns: &str,
        dep: &Deployment,
    ) -> Result<Deployment, kube::Error>;

    async fn get_daemon_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<DaemonSet, kube::Error>;
    async fn replace_daemon_set(
        &self,
        ns: &str,
        ds: &DaemonSet,
    ) -> Result<DaemonSet, kube::Error>;

    async fn get_stateful_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<StatefulSet, kube::Error>;
    async fn replace_stateful_set(
        &self,
        ns: &str,
        sts: &StatefulSet,
    ) -> Result<StatefulSet, kube::Error>;

    async fn get_replica_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<ReplicaSet, kube::Error>;
}

/// [`ClusterApi`] backed by a live kube client.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced<K>(&self, ns: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), ns)
    }
}

fn resource_name<K: kube::Resource>(obj: &K) -> &str {
    obj.meta().name.as_deref().unwrap_or_default()
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_pods(&self) -> Result<Vec<Pod>, kube::Error> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn get_pod(&self, name: &str, ns: &str) -> Result<Pod, kube::Error> {
        self.namespaced::<Pod>(ns).get(name).await
    }

    async fn create_pod(
        &self,
        ns: &str,
        pod: &Pod,
    ) -> Result<Pod, kube::Error> {
        self.namespaced::<Pod>(ns)
            .create(&PostParams::default(), pod)
            .await
    }

    async fn delete_pod(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<(), kube::Error> {
        self.namespaced::<Pod>(ns)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }

    async fn get_deployment(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<Deployment, kube::Error> {
        self.namespaced::<Deployment>(ns).get(name).await
    }

    async fn replace_deployment(
        &self,
        ns: &str,
        dep: &Deployment,
    ) -> Result<Deployment, kube::Error> {
        self.namespaced::<Deployment>(ns)
            .replace(resource_name(dep), &PostParams::default(), dep)
            .await
    }

    async fn get_daemon_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<DaemonSet, kube::Error> {
        self.namespaced::<DaemonSet>(ns).get(name).await
    }

    async fn replace_daemon_set(
        &self,
        ns: &str,
        ds: &DaemonSet,
    ) -> Result<DaemonSet, kube::Error> {
        self.namespaced::<DaemonSet>(ns)
            .replace(resource_name(ds), &PostParams::default(), ds)
            .await
    }

    async fn get_stateful_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<StatefulSet, kube::Error> {
        self.namespaced::<StatefulSet>(ns).get(name).await
    }

    async fn replace_stateful_set(
        &self,
        ns: &str,
        sts: &StatefulSet,
    ) -> Result<StatefulSet, kube::Error> {
        self.namespaced::<StatefulSet>(ns)
            .replace(resource_name(sts), &PostParams::default(), sts)
            .await
    }

    async fn get_replica_set(
        &self,
        name: &str,
        ns: &str,
    ) -> Result<ReplicaSet, kube::Error> {
        self.namespaced::<ReplicaSet>(ns).get(name).await
    }
}
