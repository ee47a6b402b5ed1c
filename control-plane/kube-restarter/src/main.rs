use clap::Parser;
use envconfig::Envconfig;
use kube_restarter::{
    config::{Cli, RestarterConfig},
    init_tracing, runtime,
};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let cli = Cli::parse();
    let cfg = RestarterConfig::init_from_env()?.validate()?;
    info!(?cli, ?cfg, "Starting restarter");

    let report = runtime::run_all(cli, cfg).await?;
    println!("{}", report);
    Ok(())
}
