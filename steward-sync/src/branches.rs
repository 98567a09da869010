//! Branch sync.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use steward_core::{BranchKind, BranchSpec, RepositorySpec};

use crate::engine::{branch_record, Reconciler};

impl Reconciler {
    /// Converges the branches of `spec`'s repository.
    ///
    /// An empty `actual` means the branches were never listed; they are
    /// listed first, and a listing failure returns the empty list again.
    /// Branches that exist but are not declared are kept as they are.
    pub fn sync_branches(&self, spec: &RepositorySpec, actual: &[BranchSpec]) -> Vec<BranchSpec> {
        let repo = spec.name.as_str();
        let actual: Cow<'_, [BranchSpec]> = if actual.is_empty() {
            match self.client.list_branches(&self.org, repo) {
                Ok(list) => Cow::Owned(list.into_iter().map(branch_record).collect()),
                Err(err) => {
                    tracing::error!(org = %self.org, repo = %repo, error = %err, "failed to list branches");
                    return Vec::new();
                }
            }
        } else {
            Cow::Borrowed(actual)
        };

        let desired: HashMap<&str, &BranchSpec> =
            spec.branches.iter().map(|b| (b.name.as_str(), b)).collect();
        let mut out = Vec::with_capacity(actual.len().max(desired.len()));

        for current in actual.iter() {
            let Some(wanted) = desired.get(current.name.as_str()) else {
                out.push(current.clone());
                continue;
            };
            if wanted.kind == current.kind {
                out.push(current.clone());
                continue;
            }
            match self.set_protection(repo, &current.name, wanted.kind) {
                Ok(()) => {
                    tracing::info!(repo = %repo, branch = %current.name, kind = %wanted.kind, "updated branch protection");
                    out.push((*wanted).clone());
                }
                Err(err) => {
                    tracing::error!(repo = %repo, branch = %current.name, kind = %wanted.kind, error = %err, "failed to update branch protection");
                    out.push(current.clone());
                }
            }
        }

        let existing: HashSet<&str> = actual.iter().map(|b| b.name.as_str()).collect();
        let mut handled = HashSet::new();
        for wanted in &spec.branches {
            if existing.contains(wanted.name.as_str()) || !handled.insert(wanted.name.as_str()) {
                continue;
            }
            // Later duplicates win, matching the lookup above.
            let wanted = desired[wanted.name.as_str()];
            if let Some(created) = self.create_branch(repo, wanted) {
                out.push(created);
            }
        }

        out
    }

    /// Creates `branch` and applies its protection.
    ///
    /// A branch that already exists counts as created. When protecting a
    /// freshly created branch fails, it is recorded unprotected.
    pub(crate) fn create_branch(&self, repo: &str, branch: &BranchSpec) -> Option<BranchSpec> {
        let from = branch.source();
        match self.client.create_branch(&self.org, repo, &branch.name, from) {
            Ok(()) => {
                tracing::info!(repo = %repo, branch = %branch.name, from = %from, "created branch");
            }
            Err(err) if err.is_already_exists() => {
                tracing::debug!(repo = %repo, branch = %branch.name, "branch already exists");
            }
            Err(err) => {
                tracing::error!(repo = %repo, branch = %branch.name, from = %from, error = %err, "failed to create branch");
                return None;
            }
        }

        if branch.kind.is_protected() {
            if let Err(err) = self.set_protection(repo, &branch.name, BranchKind::Protected) {
                tracing::error!(repo = %repo, branch = %branch.name, error = %err, "failed to protect new branch");
                return Some(BranchSpec {
                    kind: BranchKind::Normal,
                    ..branch.clone()
                });
            }
        }
        Some(branch.clone())
    }

    fn set_protection(
        &self,
        repo: &str,
        branch: &str,
        kind: BranchKind,
    ) -> Result<(), steward_core::ClientError> {
        match kind {
            BranchKind::Protected => self.client.set_branch_protection(&self.org, repo, branch),
            BranchKind::Normal => self.client.cancel_branch_protection(&self.org, repo, branch),
        }
    }
}
