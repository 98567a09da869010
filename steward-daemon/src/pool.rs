//! Fixed-size pool of blocking workers.
//!
//! Each job holds one semaphore permit for as long as it runs, so at most
//! `size` jobs run at once. Jobs run on tokio's blocking threads because the
//! hosting client is blocking. A submission that finds every worker busy is
//! rejected unless the pool was built to wait.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Semaphore, TryAcquireError};
use tokio_util::task::TaskTracker;

/// Why a job was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("worker pool is closed")]
    Closed,
    #[error("all workers are busy")]
    Saturated,
    #[error("cancelled while waiting for a worker")]
    Cancelled,
}

pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    size: usize,
    wait_for_worker: bool,
}

impl WorkerPool {
    /// `size` must be non-zero. With `wait_for_worker` set,
    /// [`submit`](Self::submit) waits for a free worker instead of rejecting.
    pub fn new(size: usize, wait_for_worker: bool) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tracker: TaskTracker::new(),
            size,
            wait_for_worker,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs currently holding a worker.
    pub fn running(&self) -> usize {
        self.size.saturating_sub(self.permits.available_permits())
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Hands `job` to a worker.
    pub async fn submit<F>(&self, job: F) -> Result<(), Rejected>
    where
        F: FnOnce() + Send + 'static,
    {
        let permit = if self.wait_for_worker {
            self.permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Rejected::Closed)?
        } else {
            self.permits
                .clone()
                .try_acquire_owned()
                .map_err(|err| match err {
                    TryAcquireError::Closed => Rejected::Closed,
                    TryAcquireError::NoPermits => Rejected::Saturated,
                })?
        };

        self.tracker.spawn_blocking(move || {
            let _permit = permit;
            job();
        });
        Ok(())
    }

    /// Stops accepting jobs and waits for every accepted one to finish.
    pub async fn close_and_drain(&self) {
        self.permits.close();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
