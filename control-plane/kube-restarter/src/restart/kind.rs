/// Resource kinds the restarter knows how to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    ReplicaSet,
    Deployment,
    StatefulSet,
    DaemonSet,
    Unsupported,
}

impl ResourceKind {
    /// Map an owner-reference kind to a supported kind. A missing or empty
    /// kind means the pod is its own restart unit.
    pub fn classify(kind: Option<&str>) -> Self {
        match kind.unwrap_or_default() {
            "" => ResourceKind::Pod,
            "ReplicaSet" => ResourceKind::ReplicaSet,
            "Deployment" => ResourceKind::Deployment,
            "StatefulSet" => ResourceKind::StatefulSet,
            "DaemonSet" => ResourceKind::DaemonSet,
            _ => ResourceKind::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
