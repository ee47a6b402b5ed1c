use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};
use tracing::{error, info};

use crate::cluster::{ClusterApi, KubeClusterApi};
use crate::config::{Cli, ClientConfig, RestarterConfig};
use crate::error::RestartError;
use crate::restart::{
    OwnershipResolver, ReadinessWaiter, RestartDispatcher, RestartLedger,
    RunReport, select_targets,
};

/// Build a kube client from an explicit kubeconfig, or infer one
/// (`KUBECONFIG`, in-cluster) when no path is given.
pub async fn create_client(
    kubeconfig: Option<&Path>,
    timeouts: &ClientConfig,
) -> Result<Client, RestartError> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kc = Kubeconfig::read_from(path).map_err(|e| {
                RestartError::Kubeconfig(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    RestartError::Kubeconfig(format!(
                        "failed to load {}: {}",
                        path.display(),
                        e
                    ))
                })?
        }
        None => Config::infer().await.map_err(|e| {
            RestartError::Kubeconfig(format!("failed to infer config: {}", e))
        })?,
    };
    config.connect_timeout =
        Some(Duration::from_secs(timeouts.connect_timeout_secs));
    config.read_timeout = Some(Duration::from_secs(timeouts.read_timeout_secs));
    Client::try_from(config).map_err(RestartError::Client)
}

/// Restart every pod matching the configured pattern, one at a time.
///
/// Only the initial listing can fail the run; per-pod failures end up in
/// the returned report.
pub async fn run_restarts(
    api: Arc<dyn ClusterApi>,
    cfg: &RestarterConfig,
) -> Result<RunReport, RestartError> {
    // No label is guaranteed on the target pods and the match is a name
    // substring, so the whole cluster has to be listed.
    let pods = api.list_pods().await.map_err(RestartError::List)?;
    let total = pods.len();
    let targets = select_targets(pods, &cfg.match_pattern);
    info!(
        total,
        matched = targets.len(),
        pattern = %cfg.match_pattern,
        "selected restart candidates"
    );

    let waiter = ReadinessWaiter::new(cfg.wait_timeout(), cfg.poll_interval());
    let resolver = OwnershipResolver::new(RestartDispatcher::new(
        api,
        waiter,
        cfg.name_max_len,
    ));

    let mut ledger = RestartLedger::new();
    let mut report = RunReport::new();
    for pod in &targets {
        let name = pod.name_any();
        info!(
            ns = %pod.namespace().unwrap_or_default(),
            pod = %name,
            "executing graceful restart"
        );
        if let Err(e) = resolver
            .resolve_and_restart(pod, &mut ledger, &mut report)
            .await
        {
            error!(pod = %name, error = %e, "restart failed");
            report.record_error(name, e);
        }
    }

    Ok(report.finish(&ledger))
}

/// Connect using the command line, then run the restart scan.
pub async fn run_all(
    cli: Cli,
    cfg: RestarterConfig,
) -> anyhow::Result<RunReport> {
    let kubeconfig = cli.kubeconfig_path();
    let client = create_client(kubeconfig.as_deref(), &cfg.client).await?;
    let api: Arc<dyn ClusterApi> = Arc::new(KubeClusterApi::new(client));
    Ok(run_restarts(api, &cfg).await?)
}
