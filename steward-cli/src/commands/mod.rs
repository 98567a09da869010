//! Subcommands and the flags they share.

pub mod inspect;
pub mod run;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use steward_core::{FileSource, HostingClient, LocalTree, RepoBranch, WatchedBranch};
use steward_daemon::{read_token, WatchConfig};
use steward_gitee::{GiteeClient, DEFAULT_ENDPOINT};

/// Where the desired state lives and how to reach the hosting API.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Repository holding the desired state, as org/repo/branch.
    #[arg(long, required_unless_present = "local_tree")]
    pub watching_repo: Option<String>,

    /// Repository catalog, e.g. repository/openeuler.yaml.
    #[arg(long, default_value = "")]
    pub repo_file_path: String,

    /// SIG catalog, e.g. sig/sigs.yaml.
    #[arg(long, default_value = "")]
    pub sig_file_path: String,

    /// Directory holding one OWNERS file per SIG, e.g. sig.
    #[arg(long, default_value = "")]
    pub sig_dir: String,

    /// Read the desired state from a local checkout instead.
    #[arg(long)]
    pub local_tree: Option<PathBuf>,

    /// Base URL of the hosting API.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// File holding the API token. Defaults to <config dir>/steward/token.
    #[arg(long)]
    pub token_path: Option<PathBuf>,
}

/// Resolved location of the desired-state files.
#[derive(Debug, Clone)]
pub enum Desired {
    Local(PathBuf),
    Watched(RepoBranch),
}

impl Desired {
    pub fn open(self, client: &Arc<dyn HostingClient>) -> Arc<dyn FileSource> {
        match self {
            Desired::Local(dir) => Arc::new(LocalTree::new(dir)),
            Desired::Watched(target) => Arc::new(WatchedBranch::new(client.clone(), target)),
        }
    }
}

impl SourceArgs {
    pub fn config(
        &self,
        concurrent_size: usize,
        interval_minutes: u64,
        wait_for_worker: bool,
    ) -> WatchConfig {
        WatchConfig {
            watching_repo: self.watching_repo.clone().unwrap_or_default(),
            repo_file: self.repo_file_path.clone(),
            sig_file: self.sig_file_path.clone(),
            sig_dir: self.sig_dir.clone(),
            concurrent_size,
            interval_minutes,
            wait_for_worker,
        }
    }

    /// Validates `config` and picks the desired-state location.
    pub fn resolve(&self, config: &WatchConfig) -> Result<Desired> {
        match &self.local_tree {
            Some(dir) => {
                config.validate_local().context("invalid configuration")?;
                Ok(Desired::Local(dir.clone()))
            }
            None => {
                let target = config.validate().context("invalid configuration")?;
                Ok(Desired::Watched(target))
            }
        }
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.token_path {
            Some(path) => Ok(path.clone()),
            None => {
                let config = dirs::config_dir().context("could not determine config directory")?;
                Ok(config.join("steward").join("token"))
            }
        }
    }

    pub fn client(&self) -> Result<Arc<dyn HostingClient>> {
        let path = self.token_path()?;
        let token = read_token(&path).context("failed to load API token")?;
        Ok(Arc::new(GiteeClient::new(self.endpoint.clone(), token)))
    }
}
