use std::path::PathBuf;
use std::time::Duration;

use envconfig::Envconfig;

use crate::error::RestartError;
use crate::restart::names::SUFFIX_LEN;

#[derive(Envconfig, Clone, Debug)]
pub struct RestarterConfig {
    /// Substring a pod name must contain to be restarted (case-sensitive).
    /// Env: RESTARTER_MATCH
    #[envconfig(from = "RESTARTER_MATCH", default = "database")]
    pub match_pattern: String,

    /// How long to wait for a replacement pod to reach Running.
    /// Env: RESTARTER_WAIT_TIMEOUT_SECS
    #[envconfig(from = "RESTARTER_WAIT_TIMEOUT_SECS", default = "300")]
    pub wait_timeout_secs: u64,

    /// Env: RESTARTER_POLL_INTERVAL_SECS
    #[envconfig(from = "RESTARTER_POLL_INTERVAL_SECS", default = "2")]
    pub poll_interval_secs: u64,

    /// Longest name a replacement pod may get.
    /// Env: RESTARTER_NAME_MAX_LEN
    #[envconfig(from = "RESTARTER_NAME_MAX_LEN", default = "255")]
    pub name_max_len: usize,

    #[envconfig(nested)]
    pub client: ClientConfig,
}

/// Timeouts applied to the kube client.
#[derive(Envconfig, Clone, Debug)]
pub struct ClientConfig {
    #[envconfig(from = "RESTARTER_CONNECT_TIMEOUT_SECS", default = "5")]
    pub connect_timeout_secs: u64,
    #[envconfig(from = "RESTARTER_READ_TIMEOUT_SECS", default = "30")]
    pub read_timeout_secs: u64,
}

impl RestarterConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(self) -> Result<Self, RestartError> {
        if self.poll_interval_secs == 0 {
            return Err(RestartError::Config(
                "RESTARTER_POLL_INTERVAL_SECS must be greater than 0".into(),
            ));
        }
        if self.name_max_len <= SUFFIX_LEN {
            return Err(RestartError::Config(format!(
                "RESTARTER_NAME_MAX_LEN must be greater than {}",
                SUFFIX_LEN
            )));
        }
        Ok(self)
    }
}

/// Command line for the restarter binary.
#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Absolute path to the kubeconfig file. Defaults to ~/.kube/config when
    /// that file exists.
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,
}

impl Cli {
    /// The kubeconfig to load, or `None` to let kube infer one. The default
    /// path is only used when the file exists.
    pub fn kubeconfig_path(&self) -> Option<PathBuf> {
        self.kubeconfig
            .clone()
            .or_else(|| default_kubeconfig().filter(|p| p.exists()))
    }
}

pub fn default_kubeconfig() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}
