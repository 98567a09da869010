//! Bringing an absent repository into existence.

use std::collections::BTreeSet;

use steward_core::client::{CreateRepo, RepoPatch, ReviewerConfig, MEMBER_PERMISSION};
use steward_core::{ActualRepoState, BranchKind, BranchSpec, RepositorySpec, DEFAULT_BRANCH};

use crate::engine::Reconciler;

impl Reconciler {
    /// Creates `spec`'s repository, or renames it from `rename_from`.
    ///
    /// Returns the absent state when the repository could neither be
    /// created nor found.
    pub fn create_or_rename(
        &self,
        spec: &RepositorySpec,
        owners: Option<&[String]>,
    ) -> ActualRepoState {
        if let Some(from) = spec.rename_source() {
            return self.rename(spec, from);
        }

        let params = CreateRepo {
            name: spec.name.clone(),
            description: spec.description.clone(),
            private: spec.is_private(),
            commentable: spec.commentable,
            auto_init: true,
        };
        if let Err(err) = self.client.create_repo(&self.org, &params) {
            return match self.fetch_state(&spec.name) {
                Ok(state) => {
                    tracing::info!(org = %self.org, repo = %spec.name, error = %err, "create failed but repository exists; adopting it");
                    state
                }
                Err(fetch_err) => {
                    tracing::error!(org = %self.org, repo = %spec.name, error = %err, fetch_error = %fetch_err, "failed to create repository");
                    ActualRepoState::absent()
                }
            };
        }
        tracing::info!(org = %self.org, repo = %spec.name, private = params.private, "created repository");

        if let Err(err) =
            self.client
                .set_repo_reviewer(&self.org, &spec.name, &ReviewerConfig::empty())
        {
            tracing::error!(repo = %spec.name, error = %err, "failed to initialize reviewers of new repository");
        }

        let mut branches = vec![self.settle_default_branch(spec)];
        for branch in spec.branches.iter().filter(|b| b.name != DEFAULT_BRANCH) {
            if let Some(created) = self.create_branch(&spec.name, branch) {
                branches.push(created);
            }
        }

        let mut members = BTreeSet::new();
        for login in owners.unwrap_or_default() {
            match self
                .client
                .add_member(&self.org, &spec.name, login, MEMBER_PERMISSION)
            {
                Ok(()) => {
                    members.insert(login.to_lowercase());
                }
                Err(err) if err.is_already_exists() => {
                    members.insert(login.to_lowercase());
                }
                Err(err) => {
                    tracing::error!(repo = %spec.name, member = %login, error = %err, "failed to add member to new repository");
                }
            }
        }

        ActualRepoState {
            available: true,
            branches,
            members,
            owner: None,
            properties: spec.properties(),
        }
    }

    fn rename(&self, spec: &RepositorySpec, from: &str) -> ActualRepoState {
        let patch = RepoPatch {
            name: spec.name.clone(),
            path: Some(spec.name.clone()),
            ..RepoPatch::default()
        };
        let renamed = self.client.update_repo(&self.org, from, &patch);

        // Fetch even after a failed rename: the repository may already carry
        // the new name.
        match (self.fetch_state(&spec.name), renamed) {
            (Ok(state), Ok(())) => {
                tracing::info!(org = %self.org, from = %from, repo = %spec.name, "renamed repository");
                state
            }
            (Ok(state), Err(err)) => {
                tracing::info!(org = %self.org, from = %from, repo = %spec.name, error = %err, "rename failed but repository exists under the new name");
                state
            }
            (Err(fetch_err), Ok(())) => {
                tracing::warn!(org = %self.org, from = %from, repo = %spec.name, error = %fetch_err, "renamed repository but could not fetch it; state will be filled lazily");
                ActualRepoState {
                    available: true,
                    ..ActualRepoState::absent()
                }
            }
            (Err(fetch_err), Err(err)) => {
                tracing::error!(org = %self.org, from = %from, repo = %spec.name, error = %err, fetch_error = %fetch_err, "failed to rename repository");
                ActualRepoState::absent()
            }
        }
    }

    /// Record of the auto-initialized default branch, protected now if the
    /// desired state asks for it.
    fn settle_default_branch(&self, spec: &RepositorySpec) -> BranchSpec {
        let wanted = spec
            .branches
            .iter()
            .find(|b| b.name == DEFAULT_BRANCH)
            .map(|b| b.kind)
            .unwrap_or_default();

        if wanted.is_protected() {
            match self
                .client
                .set_branch_protection(&self.org, &spec.name, DEFAULT_BRANCH)
            {
                Ok(()) => return BranchSpec::new(DEFAULT_BRANCH, BranchKind::Protected),
                Err(err) => {
                    tracing::error!(repo = %spec.name, branch = DEFAULT_BRANCH, error = %err, "failed to protect default branch of new repository");
                }
            }
        }
        BranchSpec::new(DEFAULT_BRANCH, BranchKind::Normal)
    }
}
