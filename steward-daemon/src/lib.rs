//! Controller runtime: worker pool, check cycle, control loop.

pub mod config;
mod controller;
mod error;
pub mod pool;
mod runtime;

pub use config::{parse_watching_repo, read_token, WatchConfig, DEFAULT_CONCURRENT_SIZE};
pub use controller::{Controller, CycleSummary};
pub use error::{ConfigError, DaemonError};
pub use pool::{Rejected, WorkerPool};
pub use runtime::{init_tracing, pause, run, run_once, start_blocking, Mode, StartOptions};
