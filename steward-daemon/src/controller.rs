//! One check cycle: desired-state pass, registry lookup, job submission.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use steward_core::client::RepoInfo;
use steward_core::types::normalize_members;
use steward_core::{
    ActualRepoState, ActualStateRegistry, DesiredPaths, DesiredState, FileSource, HostingClient,
    RepoHandle, RepoProperties, RepositorySpec, UpdateOutcome,
};
use steward_sync::Reconciler;

use crate::error::DaemonError;
use crate::pool::{Rejected, WorkerPool};

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub sigs: usize,
    pub visited: usize,
    pub unclaimed: usize,
    pub unknown: usize,
    pub submitted: usize,
    pub rejected: usize,
    pub listing_failed: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
}

/// Long-lived controller state shared by every cycle.
pub struct Controller {
    desired: Arc<Mutex<DesiredState>>,
    registry: Arc<ActualStateRegistry>,
    reconciler: Arc<Reconciler>,
    client: Arc<dyn HostingClient>,
    pool: Arc<WorkerPool>,
    cycles: AtomicU64,
}

impl Controller {
    pub fn new(desired: DesiredState, client: Arc<dyn HostingClient>, pool: WorkerPool) -> Self {
        let reconciler = Reconciler::new(client.clone(), desired.org());
        Self {
            desired: Arc::new(Mutex::new(desired)),
            registry: Arc::new(ActualStateRegistry::new()),
            reconciler: Arc::new(reconciler),
            client,
            pool: Arc::new(pool),
            cycles: AtomicU64::new(0),
        }
    }

    /// Loads the repository catalog and builds the controller. A catalog
    /// that cannot be loaded is fatal.
    pub async fn bootstrap(
        source: Arc<dyn FileSource>,
        client: Arc<dyn HostingClient>,
        paths: DesiredPaths,
        pool: WorkerPool,
    ) -> Result<Self, DaemonError> {
        let desired = tokio::task::spawn_blocking(move || DesiredState::init(source, &paths))
            .await
            .map_err(|e| join_error("init", e))??;
        tracing::info!(org = %desired.org(), "loaded repository catalog");
        Ok(Self::new(desired, client, pool))
    }

    pub fn org(&self) -> &str {
        self.reconciler.org()
    }

    pub fn registry(&self) -> &ActualStateRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Seeds the registry from the organization's repository list. A
    /// listing failure is logged; the registry then fills lazily.
    pub async fn preload(&self) -> usize {
        let client = self.client.clone();
        let registry = self.registry.clone();
        let org = self.org().to_string();
        let listed = tokio::task::spawn_blocking(move || {
            client
                .list_repos(&org)
                .map(|repos| registry.preload(repos.into_iter().map(preloaded_state)))
        })
        .await;

        match listed {
            Ok(Ok(added)) => {
                tracing::info!(org = %self.org(), repositories = added, "preloaded actual state");
                added
            }
            Ok(Err(err)) => {
                tracing::warn!(org = %self.org(), error = %err, "failed to list organization repositories; actual state will be filled lazily");
                0
            }
            Err(err) => {
                tracing::error!(error = %err, "preload task failed");
                0
            }
        }
    }

    /// Runs one desired-state pass and submits a reconciliation job for
    /// every visited repository. Returns once every job is submitted or
    /// dropped; jobs may still be running.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleSummary, DaemonError> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        let desired = self.desired.clone();
        let registry = self.registry.clone();
        let reconciler = self.reconciler.clone();
        let pool = self.pool.clone();
        let cancel = cancel.clone();
        let runtime = Handle::current();

        let (report, submitted, rejected) = tokio::task::spawn_blocking(move || {
            let mut desired = desired.lock().unwrap_or_else(PoisonError::into_inner);
            let mut submitted = 0usize;
            let mut rejected = 0usize;

            let report = desired.check(
                || cancel.is_cancelled(),
                |spec, owners| {
                    let job = reconcile_job(
                        registry.get_or_create(&spec.name),
                        reconciler.clone(),
                        spec.clone(),
                        owners.map(<[String]>::to_vec),
                    );
                    let accepted = runtime.block_on(async {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => Err(Rejected::Cancelled),
                            accepted = pool.submit(job) => accepted,
                        }
                    });
                    match accepted {
                        Ok(()) => submitted += 1,
                        Err(reason) => {
                            rejected += 1;
                            tracing::warn!(repo = %spec.name, reason = %reason, "reconciliation job dropped");
                        }
                    }
                },
            );
            (report, submitted, rejected)
        })
        .await
        .map_err(|e| join_error("check", e))?;

        let summary = CycleSummary {
            cycle,
            sigs: report.sigs,
            visited: report.visited(),
            unclaimed: report.unclaimed,
            unknown: report.unknown,
            submitted,
            rejected,
            listing_failed: report.listing_failed,
            cancelled: report.cancelled,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            cycle = summary.cycle,
            sigs = summary.sigs,
            visited = summary.visited,
            submitted = summary.submitted,
            rejected = summary.rejected,
            cancelled = summary.cancelled,
            duration_ms = summary.duration_ms,
            "check cycle finished"
        );
        Ok(summary)
    }

    /// Stops accepting jobs and waits for in-flight ones.
    pub async fn shutdown(&self) {
        let running = self.pool.running();
        if running > 0 {
            tracing::info!(running, "waiting for in-flight reconciliation jobs");
        }
        self.pool.close_and_drain().await;
    }
}

fn reconcile_job(
    handle: Arc<RepoHandle>,
    reconciler: Arc<Reconciler>,
    spec: RepositorySpec,
    owners: Option<Vec<String>>,
) -> impl FnOnce() + Send + 'static {
    move || {
        let outcome = handle.update(|before| reconciler.reconcile(&spec, owners.as_deref(), before));
        if outcome == UpdateOutcome::Skipped {
            tracing::debug!(repo = %handle.name(), "update already in flight; skipped");
        }
    }
}

fn preloaded_state(info: RepoInfo) -> (String, ActualRepoState) {
    let owner = info.owner.trim().to_lowercase();
    let state = ActualRepoState {
        available: true,
        branches: Vec::new(),
        members: normalize_members(&info.members),
        owner: (!owner.is_empty()).then_some(owner),
        properties: RepoProperties {
            private: info.private,
            commentable: info.commentable,
        },
    };
    (info.path, state)
}

pub(crate) fn join_error(task: &'static str, err: tokio::task::JoinError) -> DaemonError {
    DaemonError::Join {
        task,
        message: err.to_string(),
    }
}
