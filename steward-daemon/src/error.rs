use std::path::PathBuf;

use thiserror::Error;

/// Invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--{flag} must not be empty")]
    Empty { flag: &'static str },

    #[error("invalid watching repo '{value}': expected org/repo/branch")]
    WatchingRepo { value: String },

    #[error("--concurrent-size must be bigger than 0")]
    Concurrency,

    #[error("failed to read token file {path}: {source}")]
    Token {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token file {path} is empty")]
    EmptyToken { path: PathBuf },
}

/// Error surface of the controller runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("desired state error: {0}")]
    Store(#[from] steward_core::StoreError),

    #[error("failed to build tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },
}
