//! Desired-state store.
//!
//! # Tracked files
//!
//! ```text
//! <repo_file>            repository catalog (org + repositories)
//! <sig_file>             SIG catalog (SIG → repository names)
//! <sig_dir>/<sig>/OWNERS one per SIG, created on first reference
//! ```
//!
//! Every file is a [`TrackedFile`]: one tree listing per pass yields the
//! current fingerprints, and only files whose fingerprint moved are
//! re-fetched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::error::StoreError;
use crate::source::FileSource;
use crate::tracked::TrackedFile;
use crate::types::{RepoCatalog, RepoOwners, RepositorySpec, SigCatalog};

/// Fingerprint used to force the first load of the repository catalog.
const FORCE_LOAD: &str = "init";

/// Locations of the desired-state files inside the watched tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredPaths {
    pub repo_file: String,
    pub sig_file: String,
    pub sig_dir: String,
}

impl DesiredPaths {
    /// `<sig_dir>/<sig>/OWNERS`
    pub fn owners_path(&self, sig: &str) -> String {
        owners_path(&self.sig_dir, sig)
    }
}

fn fingerprint_of<'a>(fingerprints: &'a HashMap<String, String>, path: &str) -> &'a str {
    fingerprints.get(path).map(String::as_str).unwrap_or("")
}

fn owners_path(sig_dir: &str, sig: &str) -> String {
    let dir = sig_dir.trim_end_matches('/');
    if dir.is_empty() {
        format!("{sig}/OWNERS")
    } else {
        format!("{dir}/{sig}/OWNERS")
    }
}

/// What one [`DesiredState::check`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub sigs: usize,
    /// Repositories visited with a SIG's owner list.
    pub claimed: usize,
    /// Repositories visited without owners.
    pub unclaimed: usize,
    /// Names a SIG claims that the repository catalog does not declare.
    pub unknown: usize,
    pub listing_failed: bool,
    pub cancelled: bool,
}

impl CheckReport {
    pub fn visited(&self) -> usize {
        self.claimed + self.unclaimed
    }
}

/// The desired state: repository catalog, SIG catalog and per-SIG owners.
pub struct DesiredState {
    source: Arc<dyn FileSource>,
    sig_dir: String,
    org: String,
    repos: TrackedFile<RepoCatalog>,
    sigs: TrackedFile<SigCatalog>,
    owners: HashMap<String, TrackedFile<RepoOwners>>,
}

impl DesiredState {
    /// Loads the repository catalog unconditionally.
    ///
    /// Fails if the catalog cannot be loaded or names no organization. The
    /// SIG catalog is only loaded by the first [`check`](Self::check).
    pub fn init(source: Arc<dyn FileSource>, paths: &DesiredPaths) -> Result<Self, StoreError> {
        let mut repos = TrackedFile::<RepoCatalog>::new(paths.repo_file.clone());
        repos.refresh(FORCE_LOAD, source.as_ref())?;

        let org = repos
            .get()
            .map(|catalog| catalog.org().to_string())
            .unwrap_or_default();
        if org.is_empty() {
            return Err(StoreError::MissingOrg {
                path: paths.repo_file.clone(),
            });
        }

        Ok(Self {
            source,
            sig_dir: paths.sig_dir.clone(),
            org,
            repos,
            sigs: TrackedFile::new(paths.sig_file.clone()),
            owners: HashMap::new(),
        })
    }

    /// Organization named by the catalog at startup.
    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn catalog(&self) -> Option<&RepoCatalog> {
        self.repos.get()
    }

    pub fn sig_catalog(&self) -> Option<&SigCatalog> {
        self.sigs.get()
    }

    /// The loaded OWNERS document of `sig`, if any.
    pub fn owners_of(&self, sig: &str) -> Option<&RepoOwners> {
        self.owners.get(sig).and_then(TrackedFile::get)
    }

    /// Repositories claimed by more than one SIG, with their claim count.
    pub fn multi_sig_repositories(&self) -> BTreeMap<String, usize> {
        self.sigs
            .get()
            .map(SigCatalog::multi_claimed)
            .unwrap_or_default()
    }

    /// One reconciliation pass over the desired state.
    ///
    /// Refreshes every tracked file whose fingerprint moved, then calls
    /// `visit(spec, Some(owners))` for each repository claimed by a SIG and
    /// `visit(spec, None)` for the rest. A repository is visited at most
    /// once. A SIG whose OWNERS file never loaded visits its repositories
    /// with `None`.
    ///
    /// `is_cancelled` is polled before every repository and after every SIG;
    /// once it returns true the pass stops and reports `cancelled`.
    pub fn check<C, V>(&mut self, is_cancelled: C, mut visit: V) -> CheckReport
    where
        C: Fn() -> bool,
        V: FnMut(&RepositorySpec, Option<&[String]>),
    {
        let mut report = CheckReport::default();

        let fingerprints = match self.source.list_fingerprints() {
            Ok(map) => map,
            Err(err) => {
                tracing::error!(error = %err, "failed to list desired-state files; re-using cached state");
                report.listing_failed = true;
                HashMap::new()
            }
        };

        let source = self.source.as_ref();
        self.repos
            .refresh_logged(fingerprint_of(&fingerprints, self.repos.path()), source);
        if self
            .sigs
            .refresh_logged(fingerprint_of(&fingerprints, self.sigs.path()), source)
        {
            let multi = self.multi_sig_repositories();
            if !multi.is_empty() {
                tracing::warn!(repositories = ?multi, "repositories claimed by more than one sig");
            }
        }

        let Some(catalog) = self.repos.get() else {
            tracing::warn!(path = %self.repos.path(), "repository catalog not loaded; nothing to check");
            return report;
        };
        let mut remaining = catalog.by_name();
        let sigs = self.sigs.get().map(|s| s.sigs.as_slice()).unwrap_or(&[]);

        'sigs: for sig in sigs {
            report.sigs += 1;
            let sig_dir = &self.sig_dir;
            let owners_file = self
                .owners
                .entry(sig.name.clone())
                .or_insert_with(|| TrackedFile::new(owners_path(sig_dir, &sig.name)));
            owners_file.refresh_logged(fingerprint_of(&fingerprints, owners_file.path()), source);
            let owners = owners_file.get().map(RepoOwners::owners);

            for repo_name in &sig.repositories {
                if is_cancelled() {
                    report.cancelled = true;
                    break 'sigs;
                }
                match remaining.remove(repo_name.as_str()) {
                    Some(spec) => {
                        visit(spec, owners.as_deref());
                        report.claimed += 1;
                    }
                    None => {
                        if !catalog.repositories.iter().any(|r| r.name == *repo_name) {
                            tracing::debug!(sig = %sig.name, repo = %repo_name, "sig claims a repository the catalog does not declare");
                            report.unknown += 1;
                        }
                    }
                }
            }

            if is_cancelled() {
                report.cancelled = true;
                break;
            }
        }

        if !report.cancelled {
            for spec in remaining.into_values() {
                if is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                visit(spec, None);
                report.unclaimed += 1;
            }
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
