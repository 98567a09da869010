//! [`Reconciler`] and the absent/present dispatch.

use std::sync::Arc;

use steward_core::client::BranchInfo;
use steward_core::types::normalize_members;
use steward_core::{
    ActualRepoState, BranchKind, BranchSpec, ClientError, HostingClient, RepoProperties,
    RepositorySpec,
};

/// Applies desired repository configuration to one organization.
#[derive(Clone)]
pub struct Reconciler {
    pub(crate) client: Arc<dyn HostingClient>,
    pub(crate) org: String,
}

impl Reconciler {
    pub fn new(client: Arc<dyn HostingClient>, org: impl Into<String>) -> Self {
        Self {
            client,
            org: org.into(),
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    /// One reconciliation step for `spec`.
    ///
    /// An absent repository is created (or renamed into place). A present
    /// one has its branches, members and properties synced independently.
    /// `owners` is `None` for repositories no SIG claims; they keep only
    /// their registered owner as a member.
    pub fn reconcile(
        &self,
        spec: &RepositorySpec,
        owners: Option<&[String]>,
        before: ActualRepoState,
    ) -> ActualRepoState {
        if !before.available {
            return self.create_or_rename(spec, owners);
        }

        let branches = self.sync_branches(spec, &before.branches);
        let properties = self.sync_properties(spec, before.properties);
        let (members, owner) = self.sync_members(&spec.name, owners.unwrap_or_default(), &before);

        ActualRepoState {
            available: true,
            branches,
            members,
            owner,
            properties,
        }
    }

    /// Current state of `repo` as reported by the hosting service.
    ///
    /// A branch listing failure is logged and leaves `branches` empty so it
    /// is listed again on the next sync.
    pub fn fetch_state(&self, repo: &str) -> Result<ActualRepoState, ClientError> {
        let info = self.client.get_repo(&self.org, repo)?;

        let branches = match self.client.list_branches(&self.org, repo) {
            Ok(list) => list.into_iter().map(branch_record).collect(),
            Err(err) => {
                tracing::warn!(org = %self.org, repo = %repo, error = %err, "failed to list branches");
                Vec::new()
            }
        };

        Ok(ActualRepoState {
            available: true,
            branches,
            members: normalize_members(&info.members),
            owner: owner_login(&info.owner),
            properties: RepoProperties {
                private: info.private,
                commentable: info.commentable,
            },
        })
    }
}

pub(crate) fn branch_record(info: BranchInfo) -> BranchSpec {
    BranchSpec::new(info.name, BranchKind::from(info.protected))
}

pub(crate) fn owner_login(login: &str) -> Option<String> {
    let login = login.trim().to_lowercase();
    (!login.is_empty()).then_some(login)
}
