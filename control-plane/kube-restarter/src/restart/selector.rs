use k8s_openapi::api::core::v1::Pod;

/// Keep the pods whose name contains `pattern`, in listing order.
pub fn select_targets(pods: Vec<Pod>, pattern: &str) -> Vec<Pod> {
    pods.into_iter()
        .filter(|p| {
            p.metadata
                .name
                .as_deref()
                .is_some_and(|name| name.contains(pattern))
        })
        .collect()
}
