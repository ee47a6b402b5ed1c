use thiserror::Error;

use crate::restart::ResourceKind;

#[derive(Error, Debug)]
pub enum RestartError {
    #[error("failed to get {kind} {namespace}/{name}: {source}")]
    Fetch {
        kind: ResourceKind,
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("conflict updating {kind} {namespace}/{name}: {source}")]
    UpdateConflict {
        kind: ResourceKind,
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to update {kind} {namespace}/{name}: {source}")]
    Write {
        kind: ResourceKind,
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to create replacement pod {namespace}/{name}: {source}")]
    Create {
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to delete pod {namespace}/{name}: {source}")]
    Delete {
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error(
        "replacement pod {namespace}/{replacement} for {original} \
         ended in phase {phase}"
    )]
    ReplacementFailed {
        original: String,
        replacement: String,
        namespace: String,
        phase: String,
    },

    #[error("failed to list pods: {0}")]
    List(#[source] kube::Error),

    #[error("kubeconfig error: {0}")]
    Kubeconfig(String),

    #[error("client error: {0}")]
    Client(#[source] kube::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RestartError {
    /// Classify a failed replace call; HTTP 409 is reported as a conflict.
    pub fn from_update(
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        source: kube::Error,
    ) -> Self {
        let name = name.to_string();
        let namespace = namespace.to_string();
        match &source {
            kube::Error::Api(resp) if resp.code == 409 => {
                RestartError::UpdateConflict {
                    kind,
                    name,
                    namespace,
                    source,
                }
            }
            _ => RestartError::Write {
                kind,
                name,
                namespace,
                source,
            },
        }
    }

    pub fn fetch(
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        source: kube::Error,
    ) -> Self {
        RestartError::Fetch {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
            source,
        }
    }
}
