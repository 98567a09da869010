//! `steward run` and `steward check`.

use anyhow::{Context, Result};
use clap::Args;

use steward_daemon::{start_blocking, Mode, StartOptions, DEFAULT_CONCURRENT_SIZE};

use super::SourceArgs;

/// Arguments for `steward run` and `steward check`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Maximum number of repositories reconciled at once.
    #[arg(long, default_value_t = DEFAULT_CONCURRENT_SIZE)]
    pub concurrent_size: usize,

    /// Minutes between cycle starts; 0 runs cycles back to back.
    #[arg(long, default_value_t = 0)]
    pub interval: u64,

    /// Wait for a free worker instead of dropping a repository for this
    /// cycle when every worker is busy.
    #[arg(long)]
    pub wait_for_worker: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl RunArgs {
    pub fn run(self, mode: Mode) -> Result<()> {
        let config = self
            .source
            .config(self.concurrent_size, self.interval, self.wait_for_worker);
        let desired = self.source.resolve(&config)?;
        let client = self.source.client()?;
        let source = desired.open(&client);

        start_blocking(StartOptions {
            config,
            client,
            source,
            mode,
            log_json: self.log_json,
        })
        .context("controller exited with error")
    }
}
