//! Member sync.

use std::collections::BTreeSet;

use steward_core::client::MEMBER_PERMISSION;
use steward_core::types::normalize_members;
use steward_core::ActualRepoState;

use crate::engine::{owner_login, Reconciler};

impl Reconciler {
    /// Converges the members of `repo` to `owners`.
    ///
    /// Returns the new member set and the registered owner login. When the
    /// owner is not yet known, the repository metadata is fetched first; if
    /// that fails the recorded members are returned unchanged. The registered
    /// owner is never removed.
    pub fn sync_members(
        &self,
        repo: &str,
        owners: &[String],
        actual: &ActualRepoState,
    ) -> (BTreeSet<String>, Option<String>) {
        let (current, owner) = match &actual.owner {
            Some(owner) => (actual.members.clone(), owner.clone()),
            None => match self.client.get_repo(&self.org, repo) {
                Ok(info) => match owner_login(&info.owner) {
                    Some(owner) => (normalize_members(&info.members), owner),
                    None => {
                        tracing::error!(repo = %repo, "repository metadata names no owner; skipping member sync");
                        return (actual.members.clone(), None);
                    }
                },
                Err(err) => {
                    tracing::error!(org = %self.org, repo = %repo, error = %err, "failed to fetch repository members");
                    return (actual.members.clone(), None);
                }
            },
        };

        let desired = normalize_members(owners);
        let mut out: BTreeSet<String> = desired.intersection(&current).cloned().collect();

        for login in desired.difference(&current) {
            match self
                .client
                .add_member(&self.org, repo, login, MEMBER_PERMISSION)
            {
                Ok(()) => {
                    tracing::info!(repo = %repo, member = %login, "added member");
                    out.insert(login.clone());
                }
                Err(err) if err.is_already_exists() => {
                    out.insert(login.clone());
                }
                Err(err) => {
                    tracing::error!(repo = %repo, member = %login, error = %err, "failed to add member");
                }
            }
        }

        for login in current.difference(&desired) {
            if *login == owner {
                out.insert(login.clone());
                continue;
            }
            match self.client.remove_member(&self.org, repo, login) {
                Ok(()) => {
                    tracing::info!(repo = %repo, member = %login, "removed member");
                }
                Err(err) if err.is_not_found() => {
                    tracing::debug!(repo = %repo, member = %login, "member already gone");
                }
                Err(err) => {
                    tracing::error!(repo = %repo, member = %login, error = %err, "failed to remove member");
                    out.insert(login.clone());
                }
            }
        }

        (out, Some(owner))
    }
}
