//! Controller settings and their validation.

use std::path::Path;
use std::time::Duration;

use steward_core::{DesiredPaths, RepoBranch};

use crate::error::ConfigError;

pub const DEFAULT_CONCURRENT_SIZE: usize = 500;

/// What to watch and how hard to work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// `org/repo/branch` holding the desired-state files.
    pub watching_repo: String,
    pub repo_file: String,
    pub sig_file: String,
    pub sig_dir: String,
    pub concurrent_size: usize,
    /// Minutes between cycle starts; 0 runs cycles back to back.
    pub interval_minutes: u64,
    /// Wait for a free worker instead of dropping the job when every worker
    /// is busy.
    pub wait_for_worker: bool,
}

impl WatchConfig {
    /// Checks every setting and returns the parsed watched branch.
    pub fn validate(&self) -> Result<RepoBranch, ConfigError> {
        self.validate_local()?;
        parse_watching_repo(&self.watching_repo)
    }

    /// Checks everything except the watched branch, for desired state read
    /// from a local checkout.
    pub fn validate_local(&self) -> Result<(), ConfigError> {
        for (flag, value) in [
            ("repo-file-path", &self.repo_file),
            ("sig-file-path", &self.sig_file),
            ("sig-dir", &self.sig_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty { flag });
            }
        }
        if self.concurrent_size == 0 {
            return Err(ConfigError::Concurrency);
        }
        Ok(())
    }

    pub fn paths(&self) -> DesiredPaths {
        DesiredPaths {
            repo_file: self.repo_file.trim().to_string(),
            sig_file: self.sig_file.trim().to_string(),
            sig_dir: self.sig_dir.trim().to_string(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

/// Parses `org/repo/branch`.
pub fn parse_watching_repo(value: &str) -> Result<RepoBranch, ConfigError> {
    let invalid = || ConfigError::WatchingRepo {
        value: value.to_string(),
    };
    let parts: Vec<&str> = value.trim().split('/').map(str::trim).collect();
    match parts.as_slice() {
        [org, repo, branch] if !org.is_empty() && !repo.is_empty() && !branch.is_empty() => {
            Ok(RepoBranch {
                org: org.to_string(),
                repo: repo.to_string(),
                branch: branch.to_string(),
            })
        }
        _ => Err(invalid()),
    }
}

/// Reads the API token; surrounding whitespace is dropped.
pub fn read_token(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Token {
        path: path.to_path_buf(),
        source,
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(ConfigError::EmptyToken {
            path: path.to_path_buf(),
        });
    }
    Ok(token.to_string())
}
