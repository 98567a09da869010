//! Process startup, the paced control loop and tracing setup.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use steward_core::{FileSource, HostingClient};

use crate::config::WatchConfig;
use crate::controller::{join_error, Controller, CycleSummary};
use crate::error::DaemonError;
use crate::pool::WorkerPool;

/// Whether to keep watching or stop after one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Watch,
    Once,
}

/// Everything the controller needs to start.
pub struct StartOptions {
    pub config: WatchConfig,
    pub client: Arc<dyn HostingClient>,
    pub source: Arc<dyn FileSource>,
    pub mode: Mode,
    pub log_json: bool,
}

/// Start the controller and block the current thread until it exits.
pub fn start_blocking(options: StartOptions) -> Result<(), DaemonError> {
    init_tracing(options.log_json);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(DaemonError::Runtime)?;
    runtime.block_on(start(options))
}

async fn start(options: StartOptions) -> Result<(), DaemonError> {
    let StartOptions {
        config,
        client,
        source,
        mode,
        ..
    } = options;

    let cancel = CancellationToken::new();
    let signal_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => Ok::<(), DaemonError>(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, finishing in-flight work");
                            cancel.cancel();
                            Ok(())
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "ctrl-c handler failed");
                            Ok(())
                        }
                    }
                }
            }
        })
    };

    let pool = WorkerPool::new(config.concurrent_size, config.wait_for_worker);
    let result = async {
        let controller = Arc::new(Controller::bootstrap(source, client, config.paths(), pool).await?);
        controller.preload().await;
        match mode {
            Mode::Watch => {
                let cycles = run(controller, config.interval(), cancel.clone()).await?;
                tracing::info!(cycles, "controller stopped");
            }
            Mode::Once => {
                run_once(&controller, &cancel).await?;
            }
        }
        Ok::<(), DaemonError>(())
    }
    .await;

    cancel.cancel();
    handle_join("signal_handler", signal_handle.await)?;
    result
}

/// The control loop. Returns the number of cycles run.
///
/// Cycles run back to back when `interval` is zero; otherwise each cycle
/// starts `interval` after the previous one started, or immediately if the
/// previous one overran. Cancellation is checked before every cycle and
/// cuts the pause short. On exit the pool is closed and drained.
pub async fn run(
    controller: Arc<Controller>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<u64, DaemonError> {
    let mut cycles = 0u64;
    let outcome = loop {
        if cancel.is_cancelled() {
            break Ok(());
        }

        let started = Instant::now();
        if let Err(err) = controller.run_cycle(&cancel).await {
            break Err(err);
        }
        cycles += 1;

        if interval.is_zero() {
            continue;
        }
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(pause(interval, started.elapsed())) => {}
        }
    };

    controller.shutdown().await;
    outcome.map(|()| cycles)
}

/// One cycle, then drain.
pub async fn run_once(
    controller: &Controller,
    cancel: &CancellationToken,
) -> Result<CycleSummary, DaemonError> {
    let summary = controller.run_cycle(cancel).await;
    controller.shutdown().await;
    summary
}

/// Time left in the interval; zero once it has elapsed.
pub fn pause(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(join_error(task, err)),
    }
}

/// Installs the global subscriber, writing to stderr. `RUST_LOG` overrides
/// the `info` default.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
